//! Bit-level writer for encoding packed binary data.

use crate::error::{BitError, BitResult};
use crate::varint::zigzag_encode;

/// A bit-level writer for encoding packed binary data.
///
/// Bits are packed most significant first. Writes are accumulated in an
/// internal buffer; call [`finish`](Self::finish) to get the final bytes.
#[derive(Debug, Default)]
pub struct BitWriter {
    /// The accumulated bytes.
    bytes: Vec<u8>,
    /// Current byte being written (not yet pushed to bytes).
    current_byte: u8,
    /// Number of bits written to `current_byte` (0-7).
    bit_count: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }

    /// Returns the number of bytes the output will occupy once finished.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len() + usize::from(self.bit_count > 0)
    }

    /// Returns `true` if the next write starts on a byte boundary.
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(value);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.flush_byte();
        }
    }

    /// Writes up to 64 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::BitWidth`] if `bits > 64`.
    /// Returns [`BitError::Overflow`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::BitWidth { bits });
        }
        if bits == 0 {
            return Ok(());
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::Overflow { value, bits });
        }

        let mut remaining = bits;
        while remaining > 0 {
            let free = 8 - self.bit_count;
            let take = free.min(remaining);
            let shift = remaining - take;
            let chunk = ((value >> shift) & ((1u64 << take) - 1)) as u8;
            self.current_byte = if take == 8 {
                chunk
            } else {
                (self.current_byte << take) | chunk
            };
            self.bit_count += take;
            remaining -= take;
            if self.bit_count == 8 {
                self.flush_byte();
            }
        }
        Ok(())
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.flush_byte();
        }
    }

    /// Writes a `u8` (8 bits, no alignment required).
    pub fn write_u8(&mut self, value: u8) {
        if self.bit_count == 0 {
            self.bytes.push(value);
        } else {
            self.write_byte_unaligned(value);
        }
    }

    /// Writes a `u16` in little-endian byte order.
    pub fn write_u16(&mut self, value: u16) {
        for byte in value.to_le_bytes() {
            self.write_u8(byte);
        }
    }

    /// Writes a `u32` in little-endian byte order.
    pub fn write_u32(&mut self, value: u32) {
        for byte in value.to_le_bytes() {
            self.write_u8(byte);
        }
    }

    /// Writes the raw IEEE-754 bits of an `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Writes a varint `u32` (1 to 5 bytes).
    pub fn write_varu32(&mut self, mut value: u32) {
        loop {
            let group = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(group);
                return;
            }
            self.write_u8(group | 0x80);
        }
    }

    /// Writes a zigzag varint `i32`.
    pub fn write_vars32(&mut self, value: i32) {
        self.write_varu32(zigzag_encode(value));
    }

    /// Appends already-encoded bytes. The writer must be byte aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_count == 0 {
            self.bytes.extend_from_slice(bytes);
        } else {
            for byte in bytes {
                self.write_byte_unaligned(*byte);
            }
        }
    }

    /// Finishes writing and returns the byte buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        self.align_to_byte();
        buf.append(&mut self.bytes);
    }

    /// Clears the writer for reuse, keeping its allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.current_byte = 0;
        self.bit_count = 0;
    }

    /// Returns the completed bytes written so far (excluding a partial byte).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write_byte_unaligned(&mut self, value: u8) {
        let used = self.bit_count;
        let high = value >> used;
        let low = value & ((1u8 << used) - 1);
        self.current_byte = (self.current_byte << (8 - used)) | high;
        self.bytes.push(self.current_byte);
        self.current_byte = low;
    }

    fn flush_byte(&mut self) {
        self.bytes.push(self.current_byte);
        self.current_byte = 0;
        self.bit_count = 0;
    }
}
