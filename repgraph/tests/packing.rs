use bitstream::{BitReader, BitWriter};
use codec::{
    BaselineLookup, ClientBaselines, CodecResult, DeltaCodec, NetId, ObjectUpdate, SelfState,
    SnapshotTick,
};
use repgraph::{PackPath, PriorityPacker, PACKET_OVERHEAD};

/// Writes every entity as `0` bytes of a fixed length.
struct FixedSizeCodec(usize);

impl DeltaCodec for FixedSizeCodec {
    fn write_delta(
        &self,
        _current: &ObjectUpdate,
        _baseline: Option<(SnapshotTick, &ObjectUpdate)>,
        _tick: SnapshotTick,
        writer: &mut BitWriter,
    ) -> CodecResult<()> {
        for _ in 0..self.0 {
            writer.write_u8(0);
        }
        Ok(())
    }

    fn read_delta(
        &self,
        id: NetId,
        _tick: SnapshotTick,
        _baselines: &dyn BaselineLookup,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<ObjectUpdate> {
        for _ in 0..self.0 {
            reader.read_u8()?;
        }
        Ok(ObjectUpdate::blank(id))
    }
}

fn blanks(ids: impl IntoIterator<Item = i32>) -> Vec<ObjectUpdate> {
    ids.into_iter().map(|id| ObjectUpdate::blank(NetId::new(id))).collect()
}

fn tick(raw: u32) -> SnapshotTick {
    SnapshotTick::new(raw)
}

#[test]
fn two_of_three_fit_and_the_third_goes_next_tick() {
    // count byte, two one-byte id entries, two 40-byte deltas
    let budget = PACKET_OVERHEAD + 1 + 2 + 80;
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(40), budget);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks([1, 2, 3]);

    let (packet, report) = packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    assert_eq!(report.path, PackPath::Degraded);
    assert_eq!(packet.ids, vec![1, 2]);
    assert_eq!(report.bytes, budget);
    assert_eq!(baselines.priority(NetId::new(3)), 1);
    assert_eq!(baselines.priority(NetId::new(1)), 0);

    let (packet, _) = packer
        .pack(tick(2), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    assert!(packet.ids.contains(&3));
    assert_eq!(baselines.priority(NetId::new(3)), 0);
    assert_eq!(packet.ids.len(), 2);
}

#[test]
fn skipped_priority_grows_by_exactly_one_per_tick() {
    let budget = PACKET_OVERHEAD + 1 + 1 + 40;
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(40), budget);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks([1, 2, 3, 4]);

    packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    let before: Vec<u32> = (1..=4).map(|id| baselines.priority(NetId::new(id))).collect();
    let (packet, _) = packer
        .pack(tick(2), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    for id in 1..=4 {
        let after = baselines.priority(NetId::new(id));
        if packet.ids.contains(&id) {
            assert_eq!(after, 0);
        } else {
            assert_eq!(after, before[(id - 1) as usize] + 1);
        }
    }
}

#[test]
fn every_entity_is_eventually_included() {
    const ENTITIES: i32 = 20;
    const PER_PACKET: usize = 3;
    let budget = PACKET_OVERHEAD + 1 + PER_PACKET + PER_PACKET * 40;
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(40), budget);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks(1..=ENTITIES);

    let rounds = (ENTITIES as usize).div_ceil(PER_PACKET);
    let mut last_seen = vec![0u32; ENTITIES as usize];
    for raw in 1..=60u32 {
        let (packet, report) = packer
            .pack(tick(raw), SelfState::default(), &candidates, &mut baselines)
            .unwrap();
        assert_eq!(report.included, PER_PACKET);
        assert!(report.bytes <= budget);
        for id in &packet.ids {
            last_seen[(*id - 1) as usize] = raw;
        }
        for id in 1..=ENTITIES {
            assert!(baselines.priority(NetId::new(id)) < rounds as u32);
        }
        if raw as usize >= rounds {
            for seen in &last_seen {
                assert!(raw - seen < rounds as u32);
            }
        }
    }
}

#[test]
fn fitting_set_is_sent_whole() {
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(10), 1200);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks((1..=50).map(|id| id * 3));

    let (packet, report) = packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    assert_eq!(report.path, PackPath::Fast);
    assert_eq!(report.included, 50);
    assert_eq!(packet.ids.len(), 50);
}

#[test]
fn id_list_is_absolute_then_ascending_differences() {
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(1), 1200);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks([100, 105, 101]);

    let (packet, _) = packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    let bytes = packet.to_bytes(&wire::Limits::default()).unwrap();

    // count 3, zigzag(100) = 200 as a varint, zigzag(+1), zigzag(+4)
    assert_eq!(
        &bytes[PACKET_OVERHEAD..PACKET_OVERHEAD + 5],
        &[3, 0xC8, 0x01, 2, 8]
    );
    assert_eq!(bytes.len(), PACKET_OVERHEAD + 5 + 3);
}

#[test]
fn oversized_entity_is_reported_and_aged() {
    let budget = PACKET_OVERHEAD + 50;
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(60), budget);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks([5]);

    let (packet, report) = packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    assert!(packet.ids.is_empty());
    assert_eq!(report.oversized, vec![NetId::new(5)]);
    assert_eq!(report.skipped, 1);
    assert_eq!(baselines.priority(NetId::new(5)), 1);
    assert!(report.bytes <= budget);
}

#[test]
fn degraded_path_caps_at_single_byte_count() {
    let mut packer = PriorityPacker::with_codec(FixedSizeCodec(1), 1200);
    let mut baselines = ClientBaselines::new();
    let candidates = blanks(1..=600);

    let (packet, report) = packer
        .pack(tick(1), SelfState::default(), &candidates, &mut baselines)
        .unwrap();
    assert_eq!(report.path, PackPath::Degraded);
    assert_eq!(packet.ids.len(), wire::MAX_SINGLE_BYTE_COUNT);
    assert_eq!(packet.count_encoding, wire::CountEncoding::SingleByte);
}
