//! Entity id list framing.
//!
//! Ids are written in ascending order as a count, the first id as an
//! absolute zigzag varint, then the gap to each following id as a zigzag
//! varint. Gaps use wrapping arithmetic so any pair of `i32` ids encodes.

use bitstream::{vars32_len, varu32_len, BitReader, BitWriter};

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::limits::Limits;

/// Largest count the single-byte encoding can carry.
pub const MAX_SINGLE_BYTE_COUNT: usize = 127;

/// How the id count is written.
///
/// Counts up to [`MAX_SINGLE_BYTE_COUNT`] produce the same byte under both
/// encodings, so the decoder always reads a varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountEncoding {
    /// Unbounded varint count (all-fit path).
    Varint,
    /// One byte, at most 127 ids (degraded path).
    SingleByte,
}

/// Encoded size of the gap between `previous` and `id`.
///
/// With no previous id the id itself is written absolute.
#[must_use]
pub fn id_entry_len(previous: Option<i32>, id: i32) -> usize {
    match previous {
        Some(prev) => vars32_len(id.wrapping_sub(prev)),
        None => vars32_len(id),
    }
}

/// Size of the count prefix for `count` ids.
#[must_use]
pub fn count_len(count: usize, encoding: CountEncoding) -> usize {
    match encoding {
        CountEncoding::SingleByte => 1,
        CountEncoding::Varint => varu32_len(u32::try_from(count).unwrap_or(u32::MAX)),
    }
}

/// Exact encoded size of an ascending id list.
#[must_use]
pub fn id_list_len(ids: &[i32], encoding: CountEncoding) -> usize {
    let mut len = count_len(ids.len(), encoding);
    let mut previous = None;
    for &id in ids {
        len += id_entry_len(previous, id);
        previous = Some(id);
    }
    len
}

/// Writes an ascending id list.
pub fn encode_id_list(
    ids: &[i32],
    encoding: CountEncoding,
    writer: &mut BitWriter,
) -> Result<(), EncodeError> {
    let max = match encoding {
        CountEncoding::SingleByte => MAX_SINGLE_BYTE_COUNT,
        CountEncoding::Varint => u32::MAX as usize,
    };
    if ids.len() > max {
        return Err(EncodeError::CountOverflow {
            count: ids.len(),
            max,
        });
    }
    for pair in ids.windows(2) {
        if pair[1] <= pair[0] {
            return Err(EncodeError::UnsortedIds {
                previous: pair[0],
                current: pair[1],
            });
        }
    }

    match encoding {
        CountEncoding::SingleByte => writer.write_u8(ids.len() as u8),
        CountEncoding::Varint => writer.write_varu32(ids.len() as u32),
    }
    let mut previous = None;
    for &id in ids {
        match previous {
            Some(prev) => writer.write_vars32(id.wrapping_sub(prev)),
            None => writer.write_vars32(id),
        }
        previous = Some(id);
    }
    Ok(())
}

/// Reads an id list, enforcing ascending order and the entity limit.
pub fn decode_id_list(reader: &mut BitReader<'_>, limits: &Limits) -> WireResult<Vec<i32>> {
    let count = reader.read_varu32()? as usize;
    if count > limits.max_entities {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::EntityCount,
            limit: limits.max_entities,
            actual: count,
        });
    }
    // Every id takes at least one byte.
    if count > reader.bits_remaining() / 8 {
        return Err(DecodeError::PacketTooSmall {
            actual: reader.bits_remaining() / 8,
            required: count,
        });
    }

    let mut ids = Vec::with_capacity(count);
    let mut previous: Option<i32> = None;
    for _ in 0..count {
        let raw = reader.read_vars32()?;
        let id = match previous {
            Some(prev) => {
                let id = prev.wrapping_add(raw);
                if id <= prev {
                    return Err(DecodeError::NonAscendingIds {
                        previous: prev,
                        current: id,
                    });
                }
                id
            }
            None => raw,
        };
        ids.push(id);
        previous = Some(id);
    }
    Ok(ids)
}
