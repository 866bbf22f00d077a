use bitstream::{BitReader, BitWriter};
use codec::{
    BaselineLookup, CodecError, CruisePhase, DeltaCodec, FieldDeltaCodec, GunOrient, NetId, ObjectUpdate,
    PackedQuat, QuantizedVec3, RepAttitude, SnapshotTick, Velocity,
};
use glam::Vec3;
use proptest::prelude::*;

struct One(ObjectUpdate, SnapshotTick);

impl BaselineLookup for One {
    fn baseline(&self, id: NetId, tick: SnapshotTick) -> Option<&ObjectUpdate> {
        (self.0.id == id && self.1 == tick).then_some(&self.0)
    }
}

fn vec3() -> impl Strategy<Value = Vec3> {
    prop_oneof![
        (-5000i32..5000, -5000i32..5000, -5000i32..5000)
            .prop_map(|(x, y, z)| Vec3::new(x as f32, y as f32, z as f32) / 8.0),
        any::<[u32; 3]>().prop_map(|b| Vec3::new(
            f32::from_bits(b[0]),
            f32::from_bits(b[1]),
            f32::from_bits(b[2])
        )),
    ]
}

fn qvec() -> impl Strategy<Value = QuantizedVec3> {
    let axis = -(1i32 << 23) + 1..(1i32 << 23);
    (axis.clone(), axis.clone(), axis).prop_map(|(x, y, z)| QuantizedVec3 { x, y, z })
}

fn update(id: i32) -> impl Strategy<Value = ObjectUpdate> {
    (
        vec3(),
        (0u8..4, proptest::array::uniform3(0u16..1024)),
        proptest::option::of((qvec(), qvec())),
        -63i8..=63,
        0u8..4,
        any::<(bool, bool)>(),
        proptest::option::of(any::<u32>()),
        proptest::option::of(any::<u32>()),
        prop::collection::vec((any::<u32>(), any::<u16>(), any::<u16>()), 0..4),
        0u8..3,
    )
        .prop_map(
            move |(position, (largest, components), velocity, throttle, cruise, flags, hull, shield, guns, rep)| {
                ObjectUpdate {
                    id: NetId::new(id),
                    position,
                    orientation: PackedQuat {
                        largest,
                        components,
                    },
                    velocity: velocity.map(|(linear, angular)| Velocity { linear, angular }),
                    throttle,
                    cruise: CruisePhase::from_bits(cruise),
                    engine_kill: flags.0,
                    tradelane: flags.1,
                    hull: hull.map(f32::from_bits),
                    shield: shield.map(f32::from_bits),
                    guns: guns
                        .into_iter()
                        .map(|(hardpoint, pitch, rot)| GunOrient {
                            hardpoint,
                            pitch,
                            rot,
                        })
                        .collect(),
                    rep: RepAttitude::from_bits(rep).unwrap_or_default(),
                }
            },
        )
}

proptest! {
    #[test]
    fn prop_delta_is_bit_exact(base in update(-9), current in update(-9), age in 1u32..128) {
        let codec = FieldDeltaCodec::default();
        let tick = SnapshotTick::new(1000);
        let baseline_tick = SnapshotTick::new(1000 - age);

        let mut writer = BitWriter::new();
        codec.write_delta(&current, Some((baseline_tick, &base)), tick, &mut writer).unwrap();
        let bytes = writer.finish();

        let lookup = One(base, baseline_tick);
        let mut reader = BitReader::new(&bytes);
        let decoded = codec.read_delta(NetId::new(-9), tick, &lookup, &mut reader).unwrap();
        prop_assert!(decoded.bit_eq(&current), "{decoded:?} != {current:?}");
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn prop_throttle_is_exact_or_rejected(base in update(4), throttle in any::<i8>()) {
        let codec = FieldDeltaCodec::default();
        let mut current = base.clone();
        current.throttle = throttle;
        let baseline_tick = SnapshotTick::new(9);
        let tick = SnapshotTick::new(10);

        let mut writer = BitWriter::new();
        let written = codec.write_delta(&current, Some((baseline_tick, &base)), tick, &mut writer);
        if throttle == base.throttle || (-64..=63).contains(&throttle) {
            prop_assert!(written.is_ok());
            let bytes = writer.finish();
            let lookup = One(base, baseline_tick);
            let mut reader = BitReader::new(&bytes);
            let decoded = codec.read_delta(NetId::new(4), tick, &lookup, &mut reader).unwrap();
            prop_assert_eq!(decoded.throttle, throttle);
        } else {
            prop_assert_eq!(
                written,
                Err(CodecError::OutOfRange { field: "throttle", value: i64::from(throttle), bits: 7 })
            );
        }
    }

    #[test]
    fn prop_read_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let codec = FieldDeltaCodec::default();
        let lookup = One(ObjectUpdate::blank(NetId::new(1)), SnapshotTick::new(1));
        let mut reader = BitReader::new(&data);
        let _ = codec.read_delta(NetId::new(1), SnapshotTick::new(2), &lookup, &mut reader);
    }
}
