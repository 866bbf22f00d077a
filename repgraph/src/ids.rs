//! Ephemeral entity id pool.

use std::collections::VecDeque;
use std::fmt;

use codec::NetId;

/// Errors from the id pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    /// Every slot is in use.
    Exhausted { capacity: usize },
    /// Only negative (pool-issued) ids can be freed.
    NotEphemeral(NetId),
    /// The id is not currently allocated.
    NotAllocated(NetId),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { capacity } => write!(f, "all {capacity} ephemeral ids in use"),
            Self::NotEphemeral(id) => write!(f, "{id} is not an ephemeral id"),
            Self::NotAllocated(id) => write!(f, "{id} is not allocated"),
        }
    }
}

impl std::error::Error for IdError {}

/// Issues negative ids from a bounded pool of reusable slots.
///
/// Freed slots are reused oldest-first, so a just-freed id is the last to
/// come back.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    allocated: Vec<bool>,
    free: VecDeque<usize>,
    capacity: usize,
    live: usize,
}

impl IdAllocator {
    /// Creates a pool of at most `capacity` ids (clamped to the `i32` range).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            allocated: Vec::new(),
            free: VecDeque::new(),
            capacity: capacity.min(i32::MAX as usize),
            live: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids currently handed out.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Allocates an id, failing when the pool is exhausted.
    pub fn allocate(&mut self) -> Result<NetId, IdError> {
        self.try_allocate().ok_or(IdError::Exhausted {
            capacity: self.capacity,
        })
    }

    /// Allocates an id, or `None` when the pool is exhausted.
    pub fn try_allocate(&mut self) -> Option<NetId> {
        let slot = match self.free.pop_front() {
            Some(slot) => slot,
            None if self.allocated.len() < self.capacity => {
                self.allocated.push(false);
                self.allocated.len() - 1
            }
            None => return None,
        };
        self.allocated[slot] = true;
        self.live += 1;
        Some(slot_to_id(slot))
    }

    /// Returns `true` if `id` is currently allocated from this pool.
    #[must_use]
    pub fn is_allocated(&self, id: NetId) -> bool {
        id_to_slot(id).is_some_and(|slot| self.allocated.get(slot).copied().unwrap_or(false))
    }

    /// Returns an allocated id to the pool.
    pub fn free(&mut self, id: NetId) -> Result<(), IdError> {
        let slot = id_to_slot(id).ok_or(IdError::NotEphemeral(id))?;
        match self.allocated.get_mut(slot) {
            Some(flag) if *flag => {
                *flag = false;
                self.free.push_back(slot);
                self.live -= 1;
                Ok(())
            }
            _ => Err(IdError::NotAllocated(id)),
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

fn slot_to_id(slot: usize) -> NetId {
    NetId::new(-(slot as i32) - 1)
}

fn id_to_slot(id: NetId) -> Option<usize> {
    if id.is_ephemeral() {
        Some((-(i64::from(id.raw())) - 1) as usize)
    } else {
        None
    }
}
