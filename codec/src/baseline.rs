//! Tick-ordered history ring shared by the server tracker and the client replica.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;

use crate::SnapshotTick;

/// Errors that can occur when inserting into the baseline store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineError {
    /// Ticks must be strictly increasing.
    OutOfOrder {
        last_tick: SnapshotTick,
        new_tick: SnapshotTick,
    },
}

impl fmt::Display for BaselineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                last_tick,
                new_tick,
            } => write!(f, "tick {new_tick} inserted after {last_tick}"),
        }
    }
}

impl std::error::Error for BaselineError {}

/// A fixed-capacity ring of values keyed by strictly increasing ticks.
///
/// Inserting into a full store evicts the oldest entry. Lookups are binary
/// searches over the tick order.
#[derive(Debug, Clone)]
pub struct BaselineStore<T> {
    entries: VecDeque<(SnapshotTick, T)>,
    capacity: usize,
}

impl<T> BaselineStore<T> {
    /// Creates a new baseline store with the given capacity.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity: capacity.get(),
        }
    }

    /// Returns the capacity of the store.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of entries stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tick of the newest entry.
    #[must_use]
    pub fn newest_tick(&self) -> Option<SnapshotTick> {
        self.entries.back().map(|(tick, _)| *tick)
    }

    /// Tick of the oldest retained entry.
    #[must_use]
    pub fn oldest_tick(&self) -> Option<SnapshotTick> {
        self.entries.front().map(|(tick, _)| *tick)
    }

    /// Inserts a value at `tick`, evicting the oldest entry when full.
    pub fn insert(&mut self, tick: SnapshotTick, value: T) -> Result<(), BaselineError> {
        if let Some(last_tick) = self.newest_tick() {
            if tick <= last_tick {
                return Err(BaselineError::OutOfOrder {
                    last_tick,
                    new_tick: tick,
                });
            }
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((tick, value));
        Ok(())
    }

    /// Returns the value stored for an exact tick.
    #[must_use]
    pub fn get(&self, tick: SnapshotTick) -> Option<&T> {
        let idx = self.position(tick)?;
        self.entries.get(idx).map(|(_, value)| value)
    }

    /// Returns the value stored for an exact tick, mutably.
    pub fn get_mut(&mut self, tick: SnapshotTick) -> Option<&mut T> {
        let idx = self.position(tick)?;
        self.entries.get_mut(idx).map(|(_, value)| value)
    }

    /// Returns the newest entry at or before `tick`.
    #[must_use]
    pub fn latest_at_or_before(&self, tick: SnapshotTick) -> Option<(SnapshotTick, &T)> {
        let after = self.entries.partition_point(|(t, _)| *t <= tick);
        let idx = after.checked_sub(1)?;
        self.entries.get(idx).map(|(t, value)| (*t, value))
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (SnapshotTick, &T)> {
        self.entries.iter().map(|(tick, value)| (*tick, value))
    }

    /// Iterates mutably from oldest to newest.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (SnapshotTick, &mut T)> {
        self.entries.iter_mut().map(|(tick, value)| (*tick, value))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, tick: SnapshotTick) -> Option<usize> {
        self.entries
            .binary_search_by_key(&tick, |(t, _)| *t)
            .ok()
    }
}
