//! Wire framing for statecast update packets.
//!
//! This crate handles the binary layout of an update packet: the fixed
//! header, the self-state block, the ascending entity id list and the update
//! blob. It does not know what an entity update contains, only where it sits.
//!
//! # Design Principles
//!
//! - **Exact sizing** - Every framed section can be sized before it is written.
//! - **Bounded decoding** - Counts are validated against limits before iteration.
//! - **No domain knowledge** - This crate handles framing, not game logic.

mod error;
mod header;
mod idlist;
mod limits;
mod packet;

pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use header::{decode_header, encode_header, PacketHeader, HEADER_SIZE};
pub use idlist::{
    count_len, decode_id_list, encode_id_list, id_entry_len, id_list_len, CountEncoding,
    MAX_SINGLE_BYTE_COUNT,
};
pub use limits::Limits;
pub use packet::{decode_packet, encode_packet, packet_len, WirePacket};

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn header_size_constant_correct() {
        assert_eq!(
            HEADER_SIZE,
            size_of::<u32>() // tick
                + size_of::<u32>() // old_tick
                + size_of::<u32>() // input_sequence
        );
    }

    #[test]
    fn count_prefix_agrees_below_single_byte_cap() {
        for count in [0, 1, 64, MAX_SINGLE_BYTE_COUNT] {
            assert_eq!(
                count_len(count, CountEncoding::Varint),
                count_len(count, CountEncoding::SingleByte)
            );
        }
        assert_eq!(count_len(128, CountEncoding::Varint), 2);
    }
}
