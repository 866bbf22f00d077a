//! Full-fidelity per-entity update records.
//!
//! Every lossy step (orientation packing, velocity and throttle quantization,
//! position grid snapping) happens when the record is built, so encoding a
//! record and decoding it again reproduces it exactly.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use glam::{Quat, Vec3};

use crate::types::{CruisePhase, NetId, RepAttitude};

/// Positions are snapped to multiples of `1 / POSITION_GRID` at assembly.
pub const POSITION_GRID: f32 = 1024.0;

/// Speed mapped onto the full 24-bit linear velocity range, in units per second.
pub const LINEAR_VELOCITY_RANGE: f32 = 2048.0;

/// Rate mapped onto the full 24-bit angular velocity range, in radians per second.
pub const ANGULAR_VELOCITY_RANGE: f32 = 32.0;

/// Largest magnitude of a quantized throttle.
pub const THROTTLE_STEPS: i8 = 63;

const VELOCITY_MAX: i32 = (1 << 23) - 1;
const QUAT_COMPONENT_MAX: f32 = 1023.0;

/// Snaps a position onto the replication grid.
#[must_use]
pub fn quantize_position(position: Vec3) -> Vec3 {
    (position * POSITION_GRID).round() / POSITION_GRID
}

/// Maps a throttle in `[-1, 1]` to a signed 7-bit step.
#[must_use]
pub fn quantize_throttle(throttle: f32) -> i8 {
    let clamped = if throttle.is_nan() {
        0.0
    } else {
        throttle.clamp(-1.0, 1.0)
    };
    (clamped * f32::from(THROTTLE_STEPS)).round() as i8
}

/// Inverse of [`quantize_throttle`].
#[must_use]
pub fn throttle_to_f32(step: i8) -> f32 {
    f32::from(step) / f32::from(THROTTLE_STEPS)
}

/// Smallest-three quaternion with 10 bits per stored component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedQuat {
    /// Index (x, y, z, w) of the dropped largest component.
    pub largest: u8,
    /// The three remaining components, each in `0..=1023`.
    pub components: [u16; 3],
}

impl PackedQuat {
    pub const IDENTITY: Self = Self {
        largest: 3,
        components: [512; 3],
    };

    /// Packs a rotation.
    #[must_use]
    pub fn from_quat(rotation: Quat) -> Self {
        let q = rotation.normalize();
        let mut values = q.to_array();
        if !values.iter().all(|v| v.is_finite()) {
            return Self::IDENTITY;
        }

        let mut largest = 0;
        for (i, v) in values.iter().enumerate() {
            if v.abs() > values[largest].abs() {
                largest = i;
            }
        }
        if values[largest] < 0.0 {
            for v in &mut values {
                *v = -*v;
            }
        }

        let mut components = [0u16; 3];
        let mut slot = 0;
        for (i, v) in values.iter().enumerate() {
            if i == largest {
                continue;
            }
            let unit = (v / FRAC_1_SQRT_2).clamp(-1.0, 1.0) * 0.5 + 0.5;
            components[slot] = (unit * QUAT_COMPONENT_MAX).round() as u16;
            slot += 1;
        }
        Self {
            largest: largest as u8,
            components,
        }
    }

    /// Unpacks to a normalized rotation.
    #[must_use]
    pub fn to_quat(self) -> Quat {
        let largest = usize::from(self.largest & 0b11);
        let mut values = [0.0f32; 4];
        let mut sum = 0.0;
        let mut slot = 0;
        for (i, value) in values.iter_mut().enumerate() {
            if i == largest {
                continue;
            }
            let unit = f32::from(self.components[slot]) / QUAT_COMPONENT_MAX;
            *value = (unit * 2.0 - 1.0) * FRAC_1_SQRT_2;
            sum += *value * *value;
            slot += 1;
        }
        values[largest] = (1.0 - sum).max(0.0).sqrt();
        Quat::from_array(values).normalize()
    }
}

impl Default for PackedQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A vector quantized to signed 24-bit steps over a fixed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuantizedVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl QuantizedVec3 {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Quantizes `value`, clamping each axis to `[-range, range]`.
    #[must_use]
    pub fn from_vec3(value: Vec3, range: f32) -> Self {
        let quantize = |v: f32| {
            if v.is_nan() {
                0
            } else {
                ((v / range).clamp(-1.0, 1.0) * VELOCITY_MAX as f32).round() as i32
            }
        };
        Self {
            x: quantize(value.x),
            y: quantize(value.y),
            z: quantize(value.z),
        }
    }

    /// Expands back to a vector in `[-range, range]`.
    #[must_use]
    pub fn to_vec3(self, range: f32) -> Vec3 {
        let scale = range / VELOCITY_MAX as f32;
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) * scale
    }

    pub(crate) const fn axes(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub(crate) const fn from_axes(axes: [i32; 3]) -> Self {
        Self {
            x: axes[0],
            y: axes[1],
            z: axes[2],
        }
    }
}

/// Linear and angular velocity of a physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Velocity {
    pub linear: QuantizedVec3,
    pub angular: QuantizedVec3,
}

impl Velocity {
    /// Quantizes raw linear and angular velocity.
    #[must_use]
    pub fn from_vectors(linear: Vec3, angular: Vec3) -> Self {
        Self {
            linear: QuantizedVec3::from_vec3(linear, LINEAR_VELOCITY_RANGE),
            angular: QuantizedVec3::from_vec3(angular, ANGULAR_VELOCITY_RANGE),
        }
    }
}

/// Orientation of one gun hardpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GunOrient {
    pub hardpoint: u32,
    pub pitch: u16,
    pub rot: u16,
}

impl GunOrient {
    /// Quantizes pitch and rotation angles (radians, wrapped to `[-pi, pi]`).
    #[must_use]
    pub fn from_angles(hardpoint: u32, pitch: f32, rot: f32) -> Self {
        Self {
            hardpoint,
            pitch: quantize_angle(pitch),
            rot: quantize_angle(rot),
        }
    }

    #[must_use]
    pub fn pitch_radians(self) -> f32 {
        angle_from_u16(self.pitch)
    }

    #[must_use]
    pub fn rot_radians(self) -> f32 {
        angle_from_u16(self.rot)
    }
}

fn quantize_angle(angle: f32) -> u16 {
    if !angle.is_finite() {
        return 0;
    }
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) / (2.0 * PI);
    (wrapped * f32::from(u16::MAX)).round() as u16
}

fn angle_from_u16(value: u16) -> f32 {
    f32::from(value) / f32::from(u16::MAX) * 2.0 * PI - PI
}

/// Replicated state of one entity at one tick.
///
/// Built once per tick by the assembler and never mutated afterwards; the
/// reputation field is the only part rewritten per recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpdate {
    pub id: NetId,
    pub position: Vec3,
    pub orientation: PackedQuat,
    /// `None` when the entity has no physics body.
    pub velocity: Option<Velocity>,
    pub throttle: i8,
    pub cruise: CruisePhase,
    pub engine_kill: bool,
    pub tradelane: bool,
    pub hull: Option<f32>,
    pub shield: Option<f32>,
    pub guns: Vec<GunOrient>,
    pub rep: RepAttitude,
}

impl ObjectUpdate {
    /// The implicit baseline of a keyframe.
    #[must_use]
    pub fn blank(id: NetId) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            orientation: PackedQuat::IDENTITY,
            velocity: None,
            throttle: 0,
            cruise: CruisePhase::Off,
            engine_kill: false,
            tradelane: false,
            hull: None,
            shield: None,
            guns: Vec::new(),
            rep: RepAttitude::Neutral,
        }
    }

    /// Compares every field by its stored bits.
    ///
    /// Unlike `==` this distinguishes `-0.0` from `0.0` and treats equal NaN
    /// payloads as equal.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && vec3_bits(self.position) == vec3_bits(other.position)
            && self.orientation == other.orientation
            && self.velocity == other.velocity
            && self.throttle == other.throttle
            && self.cruise == other.cruise
            && self.engine_kill == other.engine_kill
            && self.tradelane == other.tradelane
            && self.hull.map(f32::to_bits) == other.hull.map(f32::to_bits)
            && self.shield.map(f32::to_bits) == other.shield.map(f32::to_bits)
            && self.guns == other.guns
            && self.rep == other.rep
    }
}

pub(crate) fn vec3_bits(v: Vec3) -> [u32; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_packs_to_constant() {
        assert_eq!(PackedQuat::from_quat(Quat::IDENTITY), PackedQuat::IDENTITY);
        let q = PackedQuat::IDENTITY.to_quat();
        assert!(q.angle_between(Quat::IDENTITY) < 0.01);
    }

    #[test]
    fn packed_quat_is_close() {
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, 1.2, -0.4, 2.9);
        let packed = PackedQuat::from_quat(rotation);
        assert!(packed.to_quat().angle_between(rotation) < 0.01);
    }

    #[test]
    fn packed_quat_handles_negated_largest() {
        let rotation = Quat::from_xyzw(0.0, 0.0, 0.0, -1.0);
        assert_eq!(PackedQuat::from_quat(rotation), PackedQuat::IDENTITY);
    }

    #[test]
    fn velocity_quantization_clamps() {
        let q = QuantizedVec3::from_vec3(Vec3::new(1e9, -1e9, 0.0), LINEAR_VELOCITY_RANGE);
        assert_eq!(q.x, VELOCITY_MAX);
        assert_eq!(q.y, -VELOCITY_MAX);
        assert_eq!(q.z, 0);
        let back = q.to_vec3(LINEAR_VELOCITY_RANGE);
        assert!((back.x - LINEAR_VELOCITY_RANGE).abs() < 1e-3);
    }

    #[test]
    fn throttle_quantization() {
        assert_eq!(quantize_throttle(1.0), THROTTLE_STEPS);
        assert_eq!(quantize_throttle(-5.0), -THROTTLE_STEPS);
        assert_eq!(quantize_throttle(f32::NAN), 0);
        assert!((throttle_to_f32(quantize_throttle(0.5)) - 0.5).abs() < 0.01);
    }

    #[test]
    fn position_snaps_to_grid() {
        let p = quantize_position(Vec3::new(1.000_1, -2.5, 100.123_456));
        assert_eq!(p.y, -2.5);
        assert_eq!((p.x * POSITION_GRID).fract(), 0.0);
        assert_eq!((p.z * POSITION_GRID).fract(), 0.0);
    }

    #[test]
    fn gun_angles_roundtrip_approximately() {
        let gun = GunOrient::from_angles(4, 0.75, -2.0);
        assert!((gun.pitch_radians() - 0.75).abs() < 1e-3);
        assert!((gun.rot_radians() + 2.0).abs() < 1e-3);
    }

    #[test]
    fn bit_eq_distinguishes_signed_zero() {
        let a = ObjectUpdate::blank(NetId::new(1));
        let mut b = a.clone();
        b.position.x = -0.0;
        assert_eq!(a, b);
        assert!(!a.bit_eq(&b));
    }
}
