//! Per-client budgeted packing.
//!
//! Every candidate is delta-encoded against the client's own confirmed
//! baseline. When everything fits the budget the packet carries it all;
//! otherwise candidates are taken greedily by staleness and size, and every
//! one left out ages by one tick so nothing starves.

use std::borrow::Borrow;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::ops::Bound;

use codec::{
    ClientBaselines, CodecError, CodecResult, CodecScratch, DeltaCodec, FieldDeltaCodec, NetId,
    ObjectUpdate, SelfState, SnapshotTick, SELF_STATE_SIZE,
};
use tracing::{debug, trace, warn};
use wire::{
    count_len, id_entry_len, id_list_len, CountEncoding, EncodeError, PacketHeader, WirePacket,
    HEADER_SIZE, MAX_SINGLE_BYTE_COUNT,
};

/// Bytes every packet spends before its entity block.
pub const PACKET_OVERHEAD: usize = HEADER_SIZE + SELF_STATE_SIZE;

/// Which selection path produced a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackPath {
    /// Every candidate fit.
    Fast,
    /// A priority-selected subset of at most 127 entities.
    Degraded,
}

/// Statistics for one packed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub path: PackPath,
    pub candidates: usize,
    pub included: usize,
    /// Candidates left out, oversized and rejected ones included.
    pub skipped: usize,
    /// Encoded packet size.
    pub bytes: usize,
    /// Entities whose delta alone cannot fit an otherwise empty packet.
    pub oversized: Vec<NetId>,
    /// Entities the codec refused to encode this tick.
    pub rejected: Vec<NetId>,
}

/// One client's packet for one tick, ready for framing.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPacket {
    pub tick: SnapshotTick,
    pub old_tick: SnapshotTick,
    pub input_sequence: u32,
    pub self_state: SelfState,
    /// Included entity ids, ascending.
    pub ids: Vec<i32>,
    pub count_encoding: CountEncoding,
    /// Entity deltas in `ids` order.
    pub updates: Vec<u8>,
}

impl OutboundPacket {
    #[must_use]
    pub fn header(&self) -> PacketHeader {
        PacketHeader::new(
            self.tick.raw(),
            self.old_tick.raw(),
            self.input_sequence,
        )
    }

    /// Exact size of [`Self::to_bytes`].
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        wire::packet_len(
            SELF_STATE_SIZE,
            &self.ids,
            self.count_encoding,
            self.updates.len(),
        )
    }

    /// Frames the packet.
    pub fn to_bytes(&self, limits: &wire::Limits) -> Result<Vec<u8>, EncodeError> {
        let self_state = self.self_state.to_bytes();
        let packet = WirePacket {
            header: self.header(),
            self_state: &self_state,
            ids: self.ids.clone(),
            updates: &self.updates,
        };
        wire::encode_packet(&packet, self.count_encoding, limits)
    }
}

#[derive(Debug, Clone, Copy)]
struct Encoded {
    index: usize,
    id: NetId,
    start: usize,
    len: usize,
    priority: u32,
}

/// Budgeted packet builder.
///
/// Holds only scratch buffers between calls; everything a client is known
/// to hold lives in its [`ClientBaselines`].
#[derive(Debug)]
pub struct PriorityPacker<C: DeltaCodec = FieldDeltaCodec> {
    codec: C,
    max_packet_bytes: usize,
    max_entities: usize,
    scratch: CodecScratch,
    blob: Vec<u8>,
    encoded: Vec<Encoded>,
    rejected: Vec<NetId>,
}

impl PriorityPacker<FieldDeltaCodec> {
    /// Creates a packer with the default field codec.
    #[must_use]
    pub fn new(max_packet_bytes: usize) -> Self {
        Self::with_codec(FieldDeltaCodec::default(), max_packet_bytes)
    }
}

impl<C: DeltaCodec> PriorityPacker<C> {
    #[must_use]
    pub fn with_codec(codec: C, max_packet_bytes: usize) -> Self {
        Self {
            codec,
            max_packet_bytes,
            max_entities: wire::Limits::default().max_entities,
            scratch: CodecScratch::new(),
            blob: Vec::new(),
            encoded: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Caps how many entities one packet lists.
    #[must_use]
    pub fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    #[must_use]
    pub fn max_packet_bytes(&self) -> usize {
        self.max_packet_bytes
    }

    #[must_use]
    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Packs `candidates` for one client at `tick`.
    ///
    /// Included entities are recorded as sent in `baselines` (resetting
    /// their priority); every other candidate has its priority raised by
    /// one. An entity the codec cannot encode is left out and aged like
    /// any other skipped entity. Candidate ids must be unique.
    pub fn pack<U: Borrow<ObjectUpdate>>(
        &mut self,
        tick: SnapshotTick,
        self_state: SelfState,
        candidates: &[U],
        baselines: &mut ClientBaselines,
    ) -> CodecResult<(OutboundPacket, PackReport)> {
        let budget = self.max_packet_bytes;
        let floor = PACKET_OVERHEAD + count_len(0, CountEncoding::Varint);
        if floor > budget {
            return Err(EncodeError::PacketTooLarge {
                size: floor,
                limit: budget,
            }
            .into());
        }

        self.encode_all(tick, candidates, baselines)?;

        let mut oversized = Vec::new();
        self.encoded.retain(|entry| {
            let alone = floor + id_entry_len(None, entry.id.raw()) + entry.len;
            if alone > budget {
                warn!(
                    id = %entry.id,
                    bytes = entry.len,
                    budget,
                    "entity delta cannot fit an empty packet"
                );
                oversized.push(entry.id);
                false
            } else {
                true
            }
        });

        let all_ids: Vec<i32> = self.encoded.iter().map(|entry| entry.id.raw()).collect();
        let total = PACKET_OVERHEAD
            + id_list_len(&all_ids, CountEncoding::Varint)
            + self.encoded.iter().map(|entry| entry.len).sum::<usize>();

        let (path, count_encoding, accepted) = if total <= budget
            && all_ids.len() <= self.max_entities
        {
            (PackPath::Fast, CountEncoding::Varint, all_ids)
        } else {
            let accepted = self.select_degraded(budget);
            debug!(
                tick = tick.raw(),
                candidates = candidates.len(),
                accepted = accepted.len(),
                wanted = total,
                budget,
                "packet over budget, packing by priority"
            );
            (PackPath::Degraded, CountEncoding::SingleByte, accepted)
        };

        let mut updates = Vec::new();
        let mut included = Vec::with_capacity(accepted.len());
        let mut skipped = Vec::new();
        let mut next = accepted.iter().peekable();
        for entry in &self.encoded {
            if next.peek().is_some_and(|id| **id == entry.id.raw()) {
                next.next();
                updates.extend_from_slice(&self.blob[entry.start..entry.start + entry.len]);
                included.push(candidates[entry.index].borrow().clone());
            } else {
                skipped.push(entry.id);
            }
        }
        skipped.extend_from_slice(&oversized);
        skipped.extend_from_slice(&self.rejected);

        let packet = OutboundPacket {
            tick,
            old_tick: baselines.old_tick(),
            input_sequence: baselines.latest_input(),
            self_state,
            ids: accepted,
            count_encoding,
            updates,
        };

        baselines.enqueue_state(tick, self_state, included)?;
        for id in &skipped {
            let priority = baselines.priority(*id).saturating_add(1);
            baselines.set_priority(*id, priority);
        }

        let report = PackReport {
            path,
            candidates: candidates.len(),
            included: packet.ids.len(),
            skipped: skipped.len(),
            bytes: packet.encoded_len(),
            oversized,
            rejected: self.rejected.clone(),
        };
        trace!(
            tick = tick.raw(),
            old_tick = packet.old_tick.raw(),
            path = ?report.path,
            included = report.included,
            skipped = report.skipped,
            bytes = report.bytes,
            "packed"
        );
        Ok((packet, report))
    }

    fn encode_all<U: Borrow<ObjectUpdate>>(
        &mut self,
        tick: SnapshotTick,
        candidates: &[U],
        baselines: &ClientBaselines,
    ) -> CodecResult<()> {
        self.blob.clear();
        self.encoded.clear();
        self.rejected.clear();
        for (index, candidate) in candidates.iter().enumerate() {
            let update = candidate.borrow();
            let start = self.blob.len();
            let baseline = baselines.fetch(update.id, tick);
            let len = match self
                .scratch
                .encode_delta(&self.codec, update, baseline, tick, &mut self.blob)
            {
                Ok(len) => len,
                Err(err) => {
                    self.blob.truncate(start);
                    warn!(id = %update.id, %err, "entity cannot be encoded, leaving it out");
                    self.rejected.push(update.id);
                    continue;
                }
            };
            self.encoded.push(Encoded {
                index,
                id: update.id,
                start,
                len,
                priority: baselines.priority(update.id),
            });
        }

        self.encoded.sort_unstable_by_key(|entry| entry.id);
        self.rejected.sort_unstable();
        let mut ids: Vec<NetId> = self.encoded.iter().map(|entry| entry.id).collect();
        ids.extend_from_slice(&self.rejected);
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CodecError::WireEncode(EncodeError::UnsortedIds {
                previous: pair[0].raw(),
                current: pair[1].raw(),
            }));
        }
        Ok(())
    }

    /// Greedy selection by priority descending, then size ascending.
    ///
    /// Stops at the first candidate that would overflow the budget or at
    /// the single-byte count cap. Returns accepted ids ascending.
    fn select_degraded(&self, budget: usize) -> Vec<i32> {
        let mut order: Vec<&Encoded> = self.encoded.iter().collect();
        order.sort_by_key(|entry| (Reverse(entry.priority), entry.len, entry.id));

        let cap = MAX_SINGLE_BYTE_COUNT.min(self.max_entities);
        let mut accepted = BTreeSet::new();
        let mut cost = PACKET_OVERHEAD + count_len(0, CountEncoding::SingleByte);
        for entry in order {
            if accepted.len() >= cap {
                break;
            }
            let id = entry.id.raw();
            let previous = accepted.range(..id).next_back().copied();
            let following = accepted
                .range((Bound::Excluded(id), Bound::Unbounded))
                .next()
                .copied();

            let mut added = entry.len + id_entry_len(previous, id);
            let mut removed = 0;
            if let Some(following) = following {
                added += id_entry_len(Some(id), following);
                removed = id_entry_len(previous, following);
            }
            let next_cost = cost + added - removed;
            if next_cost > budget {
                break;
            }
            cost = next_cost;
            accepted.insert(id);
        }
        accepted.into_iter().collect()
    }
}
