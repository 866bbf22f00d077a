//! Update packet framing.
//!
//! Layout: header, fixed-size self-state block, id list, then the
//! concatenated byte-aligned entity updates in id order.

use bitstream::{BitReader, BitWriter};

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{decode_header, encode_header, PacketHeader, HEADER_SIZE};
use crate::idlist::{decode_id_list, encode_id_list, id_list_len, CountEncoding};
use crate::limits::Limits;

/// A framed update packet borrowing its byte sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePacket<'a> {
    pub header: PacketHeader,
    pub self_state: &'a [u8],
    pub ids: Vec<i32>,
    pub updates: &'a [u8],
}

/// Exact encoded size of a packet with the given sections.
#[must_use]
pub fn packet_len(
    self_state_len: usize,
    ids: &[i32],
    encoding: CountEncoding,
    updates_len: usize,
) -> usize {
    HEADER_SIZE + self_state_len + id_list_len(ids, encoding) + updates_len
}

/// Encodes a packet, rejecting anything [`decode_packet`] would reject
/// under the same `limits`.
pub fn encode_packet(
    packet: &WirePacket<'_>,
    encoding: CountEncoding,
    limits: &Limits,
) -> Result<Vec<u8>, EncodeError> {
    if packet.ids.len() > limits.max_entities {
        return Err(EncodeError::TooManyEntities {
            count: packet.ids.len(),
            limit: limits.max_entities,
        });
    }
    let size = packet_len(
        packet.self_state.len(),
        &packet.ids,
        encoding,
        packet.updates.len(),
    );
    if size > limits.max_packet_bytes {
        return Err(EncodeError::PacketTooLarge {
            size,
            limit: limits.max_packet_bytes,
        });
    }

    let mut writer = BitWriter::with_capacity(size);
    encode_header(&packet.header, &mut writer);
    writer.write_bytes(packet.self_state);
    encode_id_list(&packet.ids, encoding, &mut writer)?;
    writer.write_bytes(packet.updates);
    Ok(writer.finish())
}

/// Splits a packet into header, self-state, ids and the update blob.
///
/// The update blob is returned undecoded; entity payloads are the codec's
/// concern.
pub fn decode_packet<'a>(
    buf: &'a [u8],
    self_state_len: usize,
    limits: &Limits,
) -> WireResult<WirePacket<'a>> {
    let required = HEADER_SIZE + self_state_len;
    if buf.len() < required {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: buf.len(),
        });
    }

    let mut reader = BitReader::new(buf);
    let header = decode_header(&mut reader)?;
    let self_state = &buf[HEADER_SIZE..required];

    let mut reader = BitReader::new(&buf[required..]);
    let ids = decode_id_list(&mut reader, limits)?;
    let updates = reader.remaining_bytes();

    Ok(WirePacket {
        header,
        self_state,
        ids,
        updates,
    })
}
