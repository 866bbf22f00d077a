//! The recipient's own entity, sent uncompressed in every packet.

use bitstream::{BitReader, BitWriter};
use glam::{Quat, Vec3};

use crate::error::{CodecError, CodecResult};

/// Encoded size of [`SelfState`]: seventeen little-endian `f32` values.
pub const SELF_STATE_SIZE: usize = 17 * 4;

/// Authoritative state of the entity a client controls.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelfState {
    pub health: f32,
    pub shield: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub cruise_accel_pct: f32,
    pub cruise_charge_pct: f32,
}

impl SelfState {
    fn to_array(self) -> [f32; 17] {
        let p = self.position;
        let o = self.orientation;
        let l = self.linear_velocity;
        let a = self.angular_velocity;
        [
            self.health,
            self.shield,
            p.x,
            p.y,
            p.z,
            o.x,
            o.y,
            o.z,
            o.w,
            l.x,
            l.y,
            l.z,
            a.x,
            a.y,
            a.z,
            self.cruise_accel_pct,
            self.cruise_charge_pct,
        ]
    }

    fn from_array(v: [f32; 17]) -> Self {
        Self {
            health: v[0],
            shield: v[1],
            position: Vec3::new(v[2], v[3], v[4]),
            orientation: Quat::from_xyzw(v[5], v[6], v[7], v[8]),
            linear_velocity: Vec3::new(v[9], v[10], v[11]),
            angular_velocity: Vec3::new(v[12], v[13], v[14]),
            cruise_accel_pct: v[15],
            cruise_charge_pct: v[16],
        }
    }

    /// Writes the fixed-size block.
    pub fn encode(&self, writer: &mut BitWriter) {
        for value in self.to_array() {
            writer.write_f32(value);
        }
    }

    /// Encodes into a standalone block.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::with_capacity(SELF_STATE_SIZE);
        self.encode(&mut writer);
        writer.finish()
    }

    /// Decodes a block of exactly [`SELF_STATE_SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() != SELF_STATE_SIZE {
            return Err(CodecError::SelfStateSize {
                expected: SELF_STATE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut reader = BitReader::new(bytes);
        let mut values = [0.0f32; 17];
        for value in &mut values {
            *value = reader.read_f32()?;
        }
        Ok(Self::from_array(values))
    }

    /// Compares every field by its stored bits.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}
