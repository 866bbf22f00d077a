//! Zigzag and varint sizing helpers.
//!
//! Varints use 7 payload bits per group with the high bit as continuation flag,
//! least significant group first. Signed values are zigzag mapped first so small
//! magnitudes of either sign stay short.

/// Maps a signed value onto the unsigned range so that small magnitudes stay small.
#[must_use]
pub const fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
#[must_use]
pub const fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Number of bytes a `u32` occupies as a varint (1..=5).
#[must_use]
pub const fn varu32_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x001F_FFFF => 3,
        0x0020_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Number of bytes an `i32` occupies as a zigzag varint.
#[must_use]
pub const fn vars32_len(value: i32) -> usize {
    varu32_len(zigzag_encode(value))
}
