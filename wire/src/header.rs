//! Packet header layout.

use bitstream::{BitReader, BitWriter};

use crate::error::{DecodeError, WireResult};

/// Header size in bytes: tick, old tick and input sequence, each a little-endian `u32`.
pub const HEADER_SIZE: usize = 4 + 4 + 4;

/// Update packet header.
///
/// `old_tick` names the tick the receiver last acknowledged (0 when it has
/// acknowledged nothing yet). `input_sequence` echoes the last client input
/// the server processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Simulation tick this packet represents.
    pub tick: u32,
    /// Acknowledged baseline tick, 0 for none.
    pub old_tick: u32,
    /// Last processed client input sequence.
    pub input_sequence: u32,
}

impl PacketHeader {
    /// Creates a new header.
    #[must_use]
    pub const fn new(tick: u32, old_tick: u32, input_sequence: u32) -> Self {
        Self {
            tick,
            old_tick,
            input_sequence,
        }
    }

    /// Returns `true` if the packet references an acknowledged baseline.
    #[must_use]
    pub const fn has_baseline(&self) -> bool {
        self.old_tick != 0
    }
}

/// Writes the header fields.
pub fn encode_header(header: &PacketHeader, writer: &mut BitWriter) {
    writer.write_u32(header.tick);
    writer.write_u32(header.old_tick);
    writer.write_u32(header.input_sequence);
}

/// Reads and validates the header fields.
pub fn decode_header(reader: &mut BitReader<'_>) -> WireResult<PacketHeader> {
    let tick = reader.read_u32()?;
    let old_tick = reader.read_u32()?;
    let input_sequence = reader.read_u32()?;
    if old_tick != 0 && old_tick >= tick {
        return Err(DecodeError::InvalidOldTick { tick, old_tick });
    }
    Ok(PacketHeader {
        tick,
        old_tick,
        input_sequence,
    })
}
