//! Client-side packet decoding and received-state history.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use bitstream::BitReader;

use crate::baseline::BaselineStore;
use crate::delta::{BaselineLookup, DeltaCodec};
use crate::error::{CodecError, CodecResult};
use crate::self_state::{SelfState, SELF_STATE_SIZE};
use crate::tracker::{AckWindow, ACK_HISTORY_BITS};
use crate::types::{NetId, SnapshotTick};
use crate::update::ObjectUpdate;
use crate::HISTORY_CAPACITY;

/// A fully decoded update packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub tick: SnapshotTick,
    pub old_tick: SnapshotTick,
    pub input_sequence: u32,
    pub self_state: SelfState,
    /// Entity updates in ascending id order.
    pub updates: Vec<ObjectUpdate>,
}

/// Decodes an update packet, resolving per-entity baselines through `baselines`.
pub fn decode_update_packet<C: DeltaCodec + ?Sized>(
    bytes: &[u8],
    codec: &C,
    baselines: &dyn BaselineLookup,
    limits: &wire::Limits,
) -> CodecResult<DecodedPacket> {
    let packet = wire::decode_packet(bytes, SELF_STATE_SIZE, limits)?;
    let tick = SnapshotTick::new(packet.header.tick);
    let self_state = SelfState::decode(packet.self_state)?;

    let mut reader = BitReader::new(packet.updates);
    let mut updates = Vec::with_capacity(packet.ids.len());
    for raw in packet.ids {
        updates.push(codec.read_delta(NetId::new(raw), tick, baselines, &mut reader)?);
    }
    if !reader.is_empty() {
        return Err(CodecError::TrailingUpdateData {
            remaining: reader.bits_remaining() / 8,
        });
    }

    Ok(DecodedPacket {
        tick,
        old_tick: SnapshotTick::new(packet.header.old_tick),
        input_sequence: packet.header.input_sequence,
        self_state,
        updates,
    })
}

/// Entity states a client received over the last [`HISTORY_CAPACITY`] packets.
#[derive(Debug, Clone)]
pub struct ReplicaHistory {
    received: BaselineStore<HashMap<NetId, ObjectUpdate>>,
}

impl Default for ReplicaHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(NonZeroUsize::MIN.saturating_add(HISTORY_CAPACITY - 1))
    }

    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            received: BaselineStore::new(capacity),
        }
    }

    /// Decodes a packet against this history without recording it.
    pub fn decode<C: DeltaCodec + ?Sized>(
        &self,
        bytes: &[u8],
        codec: &C,
        limits: &wire::Limits,
    ) -> CodecResult<DecodedPacket> {
        decode_update_packet(bytes, codec, self, limits)
    }

    /// Records a decoded packet as received.
    pub fn apply(&mut self, packet: &DecodedPacket) -> CodecResult<()> {
        let states = packet
            .updates
            .iter()
            .map(|update| (update.id, update.clone()))
            .collect();
        self.received.insert(packet.tick, states)?;
        Ok(())
    }

    /// Decodes and records a packet.
    pub fn receive<C: DeltaCodec + ?Sized>(
        &mut self,
        bytes: &[u8],
        codec: &C,
        limits: &wire::Limits,
    ) -> CodecResult<DecodedPacket> {
        let packet = self.decode(bytes, codec, limits)?;
        self.apply(&packet)?;
        Ok(packet)
    }

    /// Newest received tick.
    #[must_use]
    pub fn latest_tick(&self) -> Option<SnapshotTick> {
        self.received.newest_tick()
    }

    /// Acknowledgement describing what has been received.
    #[must_use]
    pub fn ack_window(&self) -> Option<AckWindow> {
        let newest = self.received.newest_tick()?;
        let mut history = 0u64;
        for (tick, _) in self.received.iter() {
            if let Some(age) = newest.ticks_since(tick) {
                if (1..=ACK_HISTORY_BITS).contains(&age) {
                    history |= 1u64 << (age - 1);
                }
            }
        }
        Some(AckWindow::with_history(newest, history))
    }
}

impl BaselineLookup for ReplicaHistory {
    fn baseline(&self, id: NetId, tick: SnapshotTick) -> Option<&ObjectUpdate> {
        self.received.get(tick)?.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::FieldDeltaCodec;
    use crate::scratch::CodecScratch;
    use wire::{encode_packet, CountEncoding, Limits, PacketHeader, WirePacket};

    fn packet_bytes(
        tick: u32,
        entries: &[(&ObjectUpdate, Option<(SnapshotTick, &ObjectUpdate)>)],
    ) -> Vec<u8> {
        let codec = FieldDeltaCodec::default();
        let mut scratch = CodecScratch::new();
        let mut blob = Vec::new();
        for (current, baseline) in entries {
            scratch
                .encode_delta(&codec, current, *baseline, SnapshotTick::new(tick), &mut blob)
                .unwrap();
        }
        let ids: Vec<i32> = entries.iter().map(|(u, _)| u.id.raw()).collect();
        let self_state = SelfState::default().to_bytes();
        let packet = WirePacket {
            header: PacketHeader::new(tick, 0, 0),
            self_state: &self_state,
            ids,
            updates: &blob,
        };
        encode_packet(&packet, CountEncoding::Varint, &Limits::default()).unwrap()
    }

    fn ship(id: i32, throttle: i8) -> ObjectUpdate {
        let mut update = ObjectUpdate::blank(NetId::new(id));
        update.throttle = throttle;
        update.hull = Some(100.0);
        update
    }

    #[test]
    fn receive_keyframes_then_delta() {
        let codec = FieldDeltaCodec::default();
        let mut history = ReplicaHistory::new();
        let a1 = ship(1, 10);
        let b1 = ship(2, 20);
        let first = history
            .receive(&packet_bytes(1, &[(&a1, None), (&b1, None)]), &codec, &Limits::default())
            .unwrap();
        assert_eq!(first.updates.len(), 2);

        let a2 = ship(1, 11);
        let second = history
            .receive(
                &packet_bytes(2, &[(&a2, Some((SnapshotTick::new(1), &a1)))]),
                &codec,
                &Limits::default(),
            )
            .unwrap();
        assert!(second.updates[0].bit_eq(&a2));
        assert_eq!(history.latest_tick(), Some(SnapshotTick::new(2)));
    }

    #[test]
    fn unknown_baseline_rejected() {
        let codec = FieldDeltaCodec::default();
        let history = ReplicaHistory::new();
        let a1 = ship(1, 10);
        let a2 = ship(1, 11);
        let bytes = packet_bytes(3, &[(&a2, Some((SnapshotTick::new(2), &a1)))]);
        let err = history.decode(&bytes, &codec, &Limits::default()).unwrap_err();
        assert!(matches!(err, CodecError::BaselineNotFound { .. }));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let codec = FieldDeltaCodec::default();
        let mut bytes = packet_bytes(1, &[(&ship(1, 0), None)]);
        bytes.push(0);
        let err = ReplicaHistory::new()
            .decode(&bytes, &codec, &Limits::default())
            .unwrap_err();
        assert_eq!(err, CodecError::TrailingUpdateData { remaining: 1 });
    }

    #[test]
    fn ack_window_reports_gaps() {
        let codec = FieldDeltaCodec::default();
        let mut history = ReplicaHistory::new();
        for tick in [1, 2, 4] {
            history
                .receive(&packet_bytes(tick, &[]), &codec, &Limits::default())
                .unwrap();
        }
        let ack = history.ack_window().unwrap();
        assert_eq!(ack.tick, SnapshotTick::new(4));
        assert_eq!(ack.history, 0b110);
    }

    #[test]
    fn out_of_order_packet_not_recorded() {
        let codec = FieldDeltaCodec::default();
        let mut history = ReplicaHistory::new();
        history
            .receive(&packet_bytes(5, &[]), &codec, &Limits::default())
            .unwrap();
        let err = history
            .receive(&packet_bytes(4, &[]), &codec, &Limits::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::OutOfOrder { .. }));
    }
}
