//! Per-entity delta encoding.
//!
//! A [`DeltaCodec`] writes one entity's update relative to the baseline the
//! recipient acknowledged and reads it back given access to the recipient's
//! history. Each encoded entity is byte-aligned so packets can concatenate
//! them without re-packing bits.
//!
//! [`FieldDeltaCodec`] is the default layout:
//!
//! | field | encoding |
//! |---|---|
//! | baseline age | varint, `0` for a keyframe |
//! | position | 2-bit kind: unchanged, 20-bit grid delta per axis, or full `f32` bits |
//! | orientation | changed bit, then 7-bit component deltas or full smallest-three |
//! | velocity | presence bit, then linear and angular as 2-bit kind + 14/24-bit axes |
//! | flags | tradelane, engine kill, 2-bit cruise phase, 2-bit reputation |
//! | throttle | changed bit, 7-bit signed step |
//! | hull, shield | presence bit, changed bit, `f32` bits |
//! | guns | changed bit, varint count, varint hardpoint + 16-bit pitch + 16-bit rot |

use bitstream::{BitReader, BitWriter};
use glam::Vec3;

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::types::{CruisePhase, NetId, RepAttitude, SnapshotTick};
use crate::update::{
    vec3_bits, GunOrient, ObjectUpdate, PackedQuat, QuantizedVec3, Velocity, POSITION_GRID,
};

/// Source of previously received entity states on the decoding side.
pub trait BaselineLookup {
    /// Returns the state of `id` as received at `tick`.
    fn baseline(&self, id: NetId, tick: SnapshotTick) -> Option<&ObjectUpdate>;
}

/// Encodes entity updates relative to a per-recipient baseline.
pub trait DeltaCodec {
    /// Writes `current` relative to `baseline` (a keyframe when `None`).
    ///
    /// The writer is byte-aligned on return.
    fn write_delta(
        &self,
        current: &ObjectUpdate,
        baseline: Option<(SnapshotTick, &ObjectUpdate)>,
        tick: SnapshotTick,
        writer: &mut BitWriter,
    ) -> CodecResult<()>;

    /// Reads an update for `id` written at `tick`, resolving its baseline
    /// through `baselines`.
    ///
    /// The reader is byte-aligned on return.
    fn read_delta(
        &self,
        id: NetId,
        tick: SnapshotTick,
        baselines: &dyn BaselineLookup,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<ObjectUpdate>;
}

const POSITION_UNCHANGED: u64 = 0;
const POSITION_GRID_DELTA: u64 = 1;
const POSITION_FULL: u64 = 3;
const POSITION_DELTA_BITS: u8 = 20;

const QUAT_COMPONENT_BITS: u8 = 10;
const QUAT_DELTA_BITS: u8 = 7;

const VECTOR_UNCHANGED: u64 = 0;
const VECTOR_DELTA: u64 = 1;
const VECTOR_FULL: u64 = 3;
const VECTOR_DELTA_BITS: u8 = 14;
const VECTOR_FULL_BITS: u8 = 24;

const THROTTLE_BITS: u8 = 7;

/// Field-by-field delta layout for [`ObjectUpdate`].
#[derive(Debug, Clone, Default)]
pub struct FieldDeltaCodec {
    limits: CodecLimits,
}

impl FieldDeltaCodec {
    #[must_use]
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }
}

impl DeltaCodec for FieldDeltaCodec {
    fn write_delta(
        &self,
        current: &ObjectUpdate,
        baseline: Option<(SnapshotTick, &ObjectUpdate)>,
        tick: SnapshotTick,
        writer: &mut BitWriter,
    ) -> CodecResult<()> {
        let blank;
        let base = match baseline {
            Some((baseline_tick, base)) => {
                let age = baseline_age(tick, baseline_tick)?;
                writer.write_varu32(age);
                base
            }
            None => {
                writer.write_varu32(0);
                blank = ObjectUpdate::blank(current.id);
                &blank
            }
        };

        if current.guns.len() > self.limits.max_guns {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::GunCount,
                limit: self.limits.max_guns,
                actual: current.guns.len(),
            });
        }

        write_position(writer, current.position, base.position)?;
        write_orientation(writer, current.orientation, base.orientation)?;

        writer.write_bool(current.velocity.is_some());
        if let Some(velocity) = current.velocity {
            let base_velocity = base.velocity.unwrap_or_default();
            write_vector(writer, velocity.linear, base_velocity.linear)?;
            write_vector(writer, velocity.angular, base_velocity.angular)?;
        }

        writer.write_bool(current.tradelane);
        writer.write_bool(current.engine_kill);
        writer.write_bits(current.cruise as u64, 2)?;
        writer.write_bits(current.rep as u64, 2)?;

        let throttle_changed = current.throttle != base.throttle;
        writer.write_bool(throttle_changed);
        if throttle_changed {
            write_signed(writer, i32::from(current.throttle), THROTTLE_BITS, "throttle")?;
        }

        write_optional_f32(writer, current.hull, base.hull)?;
        write_optional_f32(writer, current.shield, base.shield)?;

        let guns_changed = current.guns != base.guns;
        writer.write_bool(guns_changed);
        if guns_changed {
            writer.write_varu32(current.guns.len() as u32);
            for gun in &current.guns {
                writer.write_varu32(gun.hardpoint);
                writer.write_bits(u64::from(gun.pitch), 16)?;
                writer.write_bits(u64::from(gun.rot), 16)?;
            }
        }

        writer.align_to_byte();
        Ok(())
    }

    fn read_delta(
        &self,
        id: NetId,
        tick: SnapshotTick,
        baselines: &dyn BaselineLookup,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<ObjectUpdate> {
        let age = reader.read_varu32()?;
        let blank;
        let base = if age == 0 {
            blank = ObjectUpdate::blank(id);
            &blank
        } else {
            if age > self.limits.max_baseline_age {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::BaselineAge,
                    limit: self.limits.max_baseline_age as usize,
                    actual: age as usize,
                });
            }
            let baseline_tick = SnapshotTick::new(tick.raw().saturating_sub(age));
            baselines
                .baseline(id, baseline_tick)
                .ok_or(CodecError::BaselineNotFound {
                    id,
                    tick: baseline_tick,
                })?
        };

        let position = read_position(reader, base.position)?;
        let orientation = read_orientation(reader, base.orientation)?;

        let velocity = if reader.read_bool()? {
            let base_velocity = base.velocity.unwrap_or_default();
            Some(Velocity {
                linear: read_vector(reader, base_velocity.linear)?,
                angular: read_vector(reader, base_velocity.angular)?,
            })
        } else {
            None
        };

        let tradelane = reader.read_bool()?;
        let engine_kill = reader.read_bool()?;
        let cruise = CruisePhase::from_bits(reader.read_bits(2)? as u8);
        let rep_bits = reader.read_bits(2)?;
        let rep = RepAttitude::from_bits(rep_bits as u8).ok_or(CodecError::InvalidValue {
            field: "rep",
            value: rep_bits,
        })?;

        let throttle = if reader.read_bool()? {
            read_signed(reader, THROTTLE_BITS)? as i8
        } else {
            base.throttle
        };

        let hull = read_optional_f32(reader, base.hull)?;
        let shield = read_optional_f32(reader, base.shield)?;

        let guns = if reader.read_bool()? {
            let count = reader.read_varu32()? as usize;
            if count > self.limits.max_guns {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::GunCount,
                    limit: self.limits.max_guns,
                    actual: count,
                });
            }
            let mut guns = Vec::with_capacity(count);
            for _ in 0..count {
                guns.push(GunOrient {
                    hardpoint: reader.read_varu32()?,
                    pitch: reader.read_bits(16)? as u16,
                    rot: reader.read_bits(16)? as u16,
                });
            }
            guns
        } else {
            base.guns.clone()
        };

        reader.align_to_byte();
        Ok(ObjectUpdate {
            id,
            position,
            orientation,
            velocity,
            throttle,
            cruise,
            engine_kill,
            tradelane,
            hull,
            shield,
            guns,
            rep,
        })
    }
}

fn baseline_age(tick: SnapshotTick, baseline: SnapshotTick) -> CodecResult<u32> {
    match tick.ticks_since(baseline) {
        Some(age) if age > 0 => Ok(age),
        _ => Err(CodecError::BaselineNotOlder { tick, baseline }),
    }
}

fn fits_signed(value: i64, bits: u8) -> bool {
    let limit = 1i64 << (bits - 1);
    (-limit..limit).contains(&value)
}

fn write_signed(
    writer: &mut BitWriter,
    value: i32,
    bits: u8,
    field: &'static str,
) -> CodecResult<()> {
    if !fits_signed(i64::from(value), bits) {
        return Err(CodecError::OutOfRange {
            field,
            value: i64::from(value),
            bits,
        });
    }
    let mask = (1u64 << bits) - 1;
    writer.write_bits(i64::from(value) as u64 & mask, bits)?;
    Ok(())
}

fn read_signed(reader: &mut BitReader<'_>, bits: u8) -> CodecResult<i32> {
    let raw = reader.read_bits(bits)?;
    let shift = 64 - u32::from(bits);
    Ok(((raw << shift) as i64 >> shift) as i32)
}

fn grid_axis(base: f32, step: i32) -> f32 {
    base + step as f32 / POSITION_GRID
}

/// Grid steps from `base` to `current`, if they reconstruct `current` exactly.
fn grid_steps(current: Vec3, base: Vec3) -> Option<[i32; 3]> {
    let mut steps = [0i32; 3];
    for (axis, step) in steps.iter_mut().enumerate() {
        let delta = (current[axis] - base[axis]) * POSITION_GRID;
        if !delta.is_finite() {
            return None;
        }
        let rounded = delta.round();
        if !fits_signed(rounded as i64, POSITION_DELTA_BITS) {
            return None;
        }
        *step = rounded as i32;
        if grid_axis(base[axis], *step).to_bits() != current[axis].to_bits() {
            return None;
        }
    }
    Some(steps)
}

fn write_position(writer: &mut BitWriter, current: Vec3, base: Vec3) -> CodecResult<()> {
    if vec3_bits(current) == vec3_bits(base) {
        writer.write_bits(POSITION_UNCHANGED, 2)?;
    } else if let Some(steps) = grid_steps(current, base) {
        writer.write_bits(POSITION_GRID_DELTA, 2)?;
        for step in steps {
            write_signed(writer, step, POSITION_DELTA_BITS, "position")?;
        }
    } else {
        writer.write_bits(POSITION_FULL, 2)?;
        for bits in vec3_bits(current) {
            writer.write_bits(u64::from(bits), 32)?;
        }
    }
    Ok(())
}

fn read_position(reader: &mut BitReader<'_>, base: Vec3) -> CodecResult<Vec3> {
    match reader.read_bits(2)? {
        POSITION_UNCHANGED => Ok(base),
        POSITION_GRID_DELTA => {
            let mut out = base;
            for axis in 0..3 {
                out[axis] = grid_axis(base[axis], read_signed(reader, POSITION_DELTA_BITS)?);
            }
            Ok(out)
        }
        POSITION_FULL => {
            let mut out = Vec3::ZERO;
            for axis in 0..3 {
                out[axis] = f32::from_bits(reader.read_bits(32)? as u32);
            }
            Ok(out)
        }
        kind => Err(CodecError::InvalidValue {
            field: "position kind",
            value: kind,
        }),
    }
}

fn write_orientation(
    writer: &mut BitWriter,
    current: PackedQuat,
    base: PackedQuat,
) -> CodecResult<()> {
    if current.largest > 3 {
        return Err(CodecError::InvalidValue {
            field: "orientation largest",
            value: u64::from(current.largest),
        });
    }
    if let Some(c) = current
        .components
        .iter()
        .find(|c| u32::from(**c) >= 1 << QUAT_COMPONENT_BITS)
    {
        return Err(CodecError::OutOfRange {
            field: "orientation",
            value: i64::from(*c),
            bits: QUAT_COMPONENT_BITS,
        });
    }

    let changed = current != base;
    writer.write_bool(changed);
    if !changed {
        return Ok(());
    }

    let deltas = current
        .components
        .iter()
        .zip(base.components)
        .map(|(c, b)| i32::from(*c) - i32::from(b));
    let small = current.largest == base.largest
        && deltas
            .clone()
            .all(|d| fits_signed(i64::from(d), QUAT_DELTA_BITS));
    writer.write_bool(small);
    if small {
        for d in deltas {
            write_signed(writer, d, QUAT_DELTA_BITS, "orientation")?;
        }
    } else {
        writer.write_bits(u64::from(current.largest), 2)?;
        for c in current.components {
            writer.write_bits(u64::from(c), QUAT_COMPONENT_BITS)?;
        }
    }
    Ok(())
}

fn read_orientation(reader: &mut BitReader<'_>, base: PackedQuat) -> CodecResult<PackedQuat> {
    if !reader.read_bool()? {
        return Ok(base);
    }
    if reader.read_bool()? {
        let mut components = base.components;
        for c in &mut components {
            let value = i32::from(*c) + read_signed(reader, QUAT_DELTA_BITS)?;
            *c = u16::try_from(value).map_err(|_| CodecError::InvalidValue {
                field: "orientation",
                value: value as u64,
            })?;
        }
        Ok(PackedQuat {
            largest: base.largest,
            components,
        })
    } else {
        let largest = reader.read_bits(2)? as u8;
        let mut components = [0u16; 3];
        for c in &mut components {
            *c = reader.read_bits(QUAT_COMPONENT_BITS)? as u16;
        }
        Ok(PackedQuat {
            largest,
            components,
        })
    }
}

fn write_vector(
    writer: &mut BitWriter,
    current: QuantizedVec3,
    base: QuantizedVec3,
) -> CodecResult<()> {
    if current == base {
        writer.write_bits(VECTOR_UNCHANGED, 2)?;
        return Ok(());
    }
    let deltas: Vec<i64> = current
        .axes()
        .iter()
        .zip(base.axes())
        .map(|(c, b)| i64::from(*c) - i64::from(b))
        .collect();
    if deltas.iter().all(|d| fits_signed(*d, VECTOR_DELTA_BITS)) {
        writer.write_bits(VECTOR_DELTA, 2)?;
        for d in deltas {
            write_signed(writer, d as i32, VECTOR_DELTA_BITS, "velocity")?;
        }
    } else {
        writer.write_bits(VECTOR_FULL, 2)?;
        for axis in current.axes() {
            write_signed(writer, axis, VECTOR_FULL_BITS, "velocity")?;
        }
    }
    Ok(())
}

fn read_vector(reader: &mut BitReader<'_>, base: QuantizedVec3) -> CodecResult<QuantizedVec3> {
    match reader.read_bits(2)? {
        VECTOR_UNCHANGED => Ok(base),
        VECTOR_DELTA => {
            let mut axes = base.axes();
            for axis in &mut axes {
                *axis = axis.wrapping_add(read_signed(reader, VECTOR_DELTA_BITS)?);
            }
            Ok(QuantizedVec3::from_axes(axes))
        }
        VECTOR_FULL => {
            let mut axes = [0i32; 3];
            for axis in &mut axes {
                *axis = read_signed(reader, VECTOR_FULL_BITS)?;
            }
            Ok(QuantizedVec3::from_axes(axes))
        }
        kind => Err(CodecError::InvalidValue {
            field: "vector kind",
            value: kind,
        }),
    }
}

fn write_optional_f32(
    writer: &mut BitWriter,
    current: Option<f32>,
    base: Option<f32>,
) -> CodecResult<()> {
    writer.write_bool(current.is_some());
    if let Some(value) = current {
        let changed = base.map(f32::to_bits) != Some(value.to_bits());
        writer.write_bool(changed);
        if changed {
            writer.write_bits(u64::from(value.to_bits()), 32)?;
        }
    }
    Ok(())
}

fn read_optional_f32(reader: &mut BitReader<'_>, base: Option<f32>) -> CodecResult<Option<f32>> {
    if !reader.read_bool()? {
        return Ok(None);
    }
    if reader.read_bool()? {
        return Ok(Some(f32::from_bits(reader.read_bits(32)? as u32)));
    }
    base.map(Some).ok_or(CodecError::InvalidValue {
        field: "unchanged optional without baseline",
        value: 0,
    })
}
