//! Per-connection baseline tracking on the sending side.
//!
//! The tracker remembers what was sent each tick, which of those ticks the
//! client confirmed, and the per-entity staleness counters the packer uses
//! to avoid starving anything.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use tracing::{debug, warn};

use crate::baseline::{BaselineError, BaselineStore};
use crate::self_state::SelfState;
use crate::types::{NetId, SnapshotTick};
use crate::update::ObjectUpdate;
use crate::HISTORY_CAPACITY;

/// Number of ticks before the acknowledged tick covered by the history mask.
pub const ACK_HISTORY_BITS: u32 = 64;

/// A client acknowledgement: the newest received tick plus a bitmask of the
/// 64 ticks before it (bit `i` set means `tick - 1 - i` was received).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckWindow {
    pub tick: SnapshotTick,
    pub history: u64,
}

impl AckWindow {
    #[must_use]
    pub const fn new(tick: SnapshotTick) -> Self {
        Self { tick, history: 0 }
    }

    #[must_use]
    pub const fn with_history(tick: SnapshotTick, history: u64) -> Self {
        Self { tick, history }
    }

    /// Returns `true` if `tick` is acknowledged by this window.
    #[must_use]
    pub fn contains(&self, tick: SnapshotTick) -> bool {
        match self.tick.ticks_since(tick) {
            Some(0) => true,
            Some(age) if age <= ACK_HISTORY_BITS => self.history & (1u64 << (age - 1)) != 0,
            _ => false,
        }
    }

    /// Acknowledged ticks, oldest first.
    pub fn ticks(&self) -> impl Iterator<Item = SnapshotTick> + '_ {
        (0..=ACK_HISTORY_BITS)
            .rev()
            .filter_map(|age| self.tick.raw().checked_sub(age))
            .filter(|raw| *raw != 0)
            .map(SnapshotTick::new)
            .filter(|tick| self.contains(*tick))
    }
}

/// What a state sent at one tick contained.
#[derive(Debug, Clone, PartialEq)]
pub struct SentState {
    pub self_state: SelfState,
    /// Included entity updates, ascending by id.
    pub updates: Vec<ObjectUpdate>,
    promoted: bool,
}

/// Result of applying an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The acknowledged tick advanced; `promoted` entity states became baselines.
    Advanced { promoted: usize },
    /// Not newer than the current acknowledgement; ignored.
    Stale,
    /// Names a tick that was never sent; ignored.
    Unknown,
}

/// Baseline state for one connection.
#[derive(Debug, Clone)]
pub struct ClientBaselines {
    sent: BaselineStore<SentState>,
    most_recent_ack: Option<SnapshotTick>,
    confirmed: HashMap<NetId, (SnapshotTick, ObjectUpdate)>,
    priorities: HashMap<NetId, u32>,
    latest_input: u32,
}

impl Default for ClientBaselines {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBaselines {
    /// Creates a tracker remembering [`HISTORY_CAPACITY`] sent states.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(NonZeroUsize::MIN.saturating_add(HISTORY_CAPACITY - 1))
    }

    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            sent: BaselineStore::new(capacity),
            most_recent_ack: None,
            confirmed: HashMap::new(),
            priorities: HashMap::new(),
            latest_input: 0,
        }
    }

    /// Applies an acknowledgement, promoting every newly confirmed sent state.
    pub fn acknowledge(&mut self, ack: AckWindow) -> AckOutcome {
        let newest = self.sent.newest_tick();
        if ack.tick.is_zero() || newest.map_or(true, |newest| ack.tick > newest) {
            warn!(tick = ack.tick.raw(), ?newest, "ack for a tick that was never sent");
            return AckOutcome::Unknown;
        }
        if let Some(last) = self.most_recent_ack {
            if ack.tick <= last {
                debug!(tick = ack.tick.raw(), last = last.raw(), "stale ack ignored");
                return AckOutcome::Stale;
            }
        }

        let mut promoted = 0;
        for tick in ack.ticks() {
            let Some(state) = self.sent.get_mut(tick) else {
                continue;
            };
            if state.promoted {
                continue;
            }
            state.promoted = true;
            for update in &state.updates {
                match self.confirmed.entry(update.id) {
                    Entry::Occupied(entry) if entry.get().0 >= tick => {}
                    Entry::Occupied(mut entry) => {
                        entry.insert((tick, update.clone()));
                        promoted += 1;
                    }
                    Entry::Vacant(entry) => {
                        entry.insert((tick, update.clone()));
                        promoted += 1;
                    }
                }
            }
        }
        self.most_recent_ack = Some(ack.tick);
        AckOutcome::Advanced { promoted }
    }

    /// The most recently acknowledged tick and what was sent at it.
    #[must_use]
    pub fn acknowledged_state(&self) -> Option<(SnapshotTick, &SentState)> {
        let tick = self.most_recent_ack?;
        self.sent.get(tick).map(|state| (tick, state))
    }

    /// Most recently acknowledged tick, zero when nothing has been acknowledged.
    #[must_use]
    pub fn old_tick(&self) -> SnapshotTick {
        self.most_recent_ack.unwrap_or_default()
    }

    /// The confirmed baseline for `id` usable when encoding at `tick`.
    ///
    /// Baselines too old for the client to still hold are treated as absent.
    #[must_use]
    pub fn fetch(&self, id: NetId, tick: SnapshotTick) -> Option<(SnapshotTick, &ObjectUpdate)> {
        let (baseline_tick, update) = self.confirmed.get(&id)?;
        match tick.ticks_since(*baseline_tick) {
            Some(age) if age > 0 && (age as usize) < self.sent.capacity() => {
                Some((*baseline_tick, update))
            }
            _ => None,
        }
    }

    /// Records what was sent at `tick`; included entities have their priority reset.
    pub fn enqueue_state(
        &mut self,
        tick: SnapshotTick,
        self_state: SelfState,
        updates: Vec<ObjectUpdate>,
    ) -> Result<(), BaselineError> {
        self.sent.insert(
            tick,
            SentState {
                self_state,
                updates,
                promoted: false,
            },
        )?;
        if let Some(state) = self.sent.get(tick) {
            for update in &state.updates {
                self.priorities.remove(&update.id);
            }
        }
        Ok(())
    }

    /// Staleness counter for `id`.
    #[must_use]
    pub fn priority(&self, id: NetId) -> u32 {
        self.priorities.get(&id).copied().unwrap_or(0)
    }

    pub fn set_priority(&mut self, id: NetId, priority: u32) {
        if priority == 0 {
            self.priorities.remove(&id);
        } else {
            self.priorities.insert(id, priority);
        }
    }

    /// Drops everything known about `id` so a reused id starts from a keyframe.
    pub fn forget(&mut self, id: NetId) {
        self.confirmed.remove(&id);
        self.priorities.remove(&id);
        for (_, state) in self.sent.iter_mut() {
            state.updates.retain(|update| update.id != id);
        }
    }

    /// Records a processed input sequence number.
    pub fn record_input(&mut self, sequence: u32) {
        self.latest_input = self.latest_input.max(sequence);
    }

    #[must_use]
    pub fn latest_input(&self) -> u32 {
        self.latest_input
    }

    /// Number of entities with a confirmed baseline.
    #[must_use]
    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }
}
