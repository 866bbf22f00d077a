//! Server tracker and client history kept in step over a lossy link.

use codec::{
    AckOutcome, ClientBaselines, CodecScratch, DeltaCodec, FieldDeltaCodec, NetId, ObjectUpdate,
    ReplicaHistory, SelfState, SnapshotTick, SELF_STATE_SIZE,
};
use glam::Vec3;
use wire::{encode_packet, CountEncoding, Limits, PacketHeader, WirePacket};

fn world_at(tick: u32) -> Vec<ObjectUpdate> {
    (1..=6)
        .map(|id| {
            let mut update = ObjectUpdate::blank(NetId::new(id));
            update.position = codec::quantize_position(Vec3::new(
                id as f32 * 100.0 + tick as f32 * 0.5,
                0.0,
                -(tick as f32) * 0.25,
            ));
            update.throttle = ((tick + id as u32) % 50) as i8;
            update.hull = Some(1000.0 - tick as f32);
            update
        })
        .collect()
}

fn pack(
    codec: &impl DeltaCodec,
    tracker: &mut ClientBaselines,
    tick: SnapshotTick,
    updates: &[ObjectUpdate],
) -> Vec<u8> {
    let mut scratch = CodecScratch::new();
    let mut blob = Vec::new();
    for update in updates {
        let baseline = tracker.fetch(update.id, tick);
        scratch
            .encode_delta(codec, update, baseline, tick, &mut blob)
            .unwrap();
    }
    let self_state = SelfState {
        health: tick.raw() as f32,
        ..SelfState::default()
    };
    let self_bytes = self_state.to_bytes();
    assert_eq!(self_bytes.len(), SELF_STATE_SIZE);
    let packet = WirePacket {
        header: PacketHeader::new(tick.raw(), tracker.old_tick().raw(), tracker.latest_input()),
        self_state: &self_bytes,
        ids: updates.iter().map(|u| u.id.raw()).collect(),
        updates: &blob,
    };
    let bytes = encode_packet(&packet, CountEncoding::Varint, &Limits::default()).unwrap();
    tracker
        .enqueue_state(tick, self_state, updates.to_vec())
        .unwrap();
    bytes
}

#[test]
fn lossy_link_decodes_every_delivered_packet() {
    let codec = FieldDeltaCodec::default();
    let mut tracker = ClientBaselines::new();
    let mut history = ReplicaHistory::new();
    let mut acked_any = false;

    for raw in 1..=200u32 {
        let tick = SnapshotTick::new(raw);
        let world = world_at(raw);
        let bytes = pack(&codec, &mut tracker, tick, &world);

        // Drop every third packet and every ack on ticks divisible by five.
        if raw % 3 == 0 {
            continue;
        }
        let decoded = history.receive(&bytes, &codec, &Limits::default()).unwrap();
        assert_eq!(decoded.tick, tick);
        assert_eq!(decoded.self_state.health, raw as f32);
        assert_eq!(decoded.updates.len(), world.len());
        for (got, want) in decoded.updates.iter().zip(&world) {
            assert!(got.bit_eq(want), "tick {raw} entity {}", want.id);
        }

        if raw % 5 != 0 {
            let ack = history.ack_window().unwrap();
            if let AckOutcome::Advanced { .. } = tracker.acknowledge(ack) {
                acked_any = true;
            }
        }
    }

    assert!(acked_any);
    assert_eq!(tracker.confirmed_len(), 6);
}

#[test]
fn deltas_shrink_once_acknowledged() {
    let codec = FieldDeltaCodec::default();
    let mut tracker = ClientBaselines::new();
    let mut history = ReplicaHistory::new();

    let first = pack(&codec, &mut tracker, SnapshotTick::new(1), &world_at(1));
    history.receive(&first, &codec, &Limits::default()).unwrap();
    tracker.acknowledge(history.ack_window().unwrap());

    let second = pack(&codec, &mut tracker, SnapshotTick::new(2), &world_at(2));
    assert!(second.len() < first.len());
    let decoded = history.receive(&second, &codec, &Limits::default()).unwrap();
    assert_eq!(decoded.old_tick, SnapshotTick::new(1));
}
