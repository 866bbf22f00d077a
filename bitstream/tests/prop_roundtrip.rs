use bitstream::{vars32_len, BitReader, BitWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bit(bool),
    Bits { bits: u8, value: u64 },
    Align,
    U8(u8),
    U16(u16),
    U32(u32),
    F32(u32),
    VarU32(u32),
    VarS32(i32),
}

fn mask_value(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        let mask = (1u64 << bits) - 1;
        value & mask
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bit),
        (1u8..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        Just(Op::Align),
        any::<u8>().prop_map(Op::U8),
        any::<u16>().prop_map(Op::U16),
        any::<u32>().prop_map(Op::U32),
        any::<u32>().prop_map(Op::F32),
        any::<u32>().prop_map(Op::VarU32),
        any::<i32>().prop_map(Op::VarS32),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = BitWriter::new();
        for op in &ops {
            match op {
                Op::Bit(b) => writer.write_bool(*b),
                Op::Bits { bits, value } => writer.write_bits(*value, *bits).unwrap(),
                Op::Align => writer.align_to_byte(),
                Op::U8(v) => writer.write_u8(*v),
                Op::U16(v) => writer.write_u16(*v),
                Op::U32(v) => writer.write_u32(*v),
                Op::F32(bits) => writer.write_f32(f32::from_bits(*bits)),
                Op::VarU32(v) => writer.write_varu32(*v),
                Op::VarS32(v) => writer.write_vars32(*v),
            }
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for op in &ops {
            match op {
                Op::Bit(b) => prop_assert_eq!(reader.read_bool().unwrap(), *b),
                Op::Bits { bits, value } => prop_assert_eq!(reader.read_bits(*bits).unwrap(), *value),
                Op::Align => reader.align_to_byte(),
                Op::U8(v) => prop_assert_eq!(reader.read_u8().unwrap(), *v),
                Op::U16(v) => prop_assert_eq!(reader.read_u16().unwrap(), *v),
                Op::U32(v) => prop_assert_eq!(reader.read_u32().unwrap(), *v),
                Op::F32(bits) => prop_assert_eq!(reader.read_f32().unwrap().to_bits(), *bits),
                Op::VarU32(v) => prop_assert_eq!(reader.read_varu32().unwrap(), *v),
                Op::VarS32(v) => prop_assert_eq!(reader.read_vars32().unwrap(), *v),
            }
        }
        prop_assert!(reader.bits_remaining() < 8);
    }

    #[test]
    fn prop_vars32_len_matches_encoding(value in any::<i32>()) {
        let mut writer = BitWriter::new();
        writer.write_vars32(value);
        prop_assert_eq!(writer.finish().len(), vars32_len(value));
    }

    #[test]
    fn prop_reader_never_panics(data in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut reader = BitReader::new(&data);
        let _ = reader.read_varu32();
        let _ = reader.read_bits(13);
        let _ = reader.read_vars32();
        reader.align_to_byte();
        let _ = reader.read_u32();
        let _ = reader.read_bool();
    }
}
