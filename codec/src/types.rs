//! Core identifier and enum types for the codec.

use std::fmt;

/// A simulation tick number.
///
/// Ticks are monotonically increasing identifiers for simulation states.
/// Tick 0 is reserved to mean "no baseline".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnapshotTick(u32);

impl SnapshotTick {
    /// Creates a new snapshot tick.
    #[must_use]
    pub const fn new(tick: u32) -> Self {
        Self(tick)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this tick is zero (often used as "no baseline").
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Number of ticks from `earlier` to `self`, or `None` if `earlier` is newer.
    #[must_use]
    pub const fn ticks_since(self, earlier: Self) -> Option<u32> {
        self.0.checked_sub(earlier.0)
    }
}

impl From<u32> for SnapshotTick {
    fn from(tick: u32) -> Self {
        Self(tick)
    }
}

impl From<SnapshotTick> for u32 {
    fn from(tick: SnapshotTick) -> Self {
        tick.0
    }
}

impl fmt::Display for SnapshotTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A replicated entity identifier.
///
/// Positive ids are persistent (assigned outside the id pool, e.g. player
/// ships); negative ids are ephemeral and come from the id allocator.
/// Zero is never a valid entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NetId(i32);

impl NetId {
    /// Creates a new net id.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns `true` for pool-allocated ids.
    #[must_use]
    pub const fn is_ephemeral(self) -> bool {
        self.0 < 0
    }

    /// Returns `true` for externally assigned ids.
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        self.0 > 0
    }
}

impl From<i32> for NetId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<NetId> for i32 {
    fn from(id: NetId) -> Self {
        id.0
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attitude of an entity toward the receiving client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RepAttitude {
    #[default]
    Neutral = 0,
    Friendly = 1,
    Hostile = 2,
}

impl RepAttitude {
    /// Parses the 2-bit wire value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Neutral),
            1 => Some(Self::Friendly),
            2 => Some(Self::Hostile),
            _ => None,
        }
    }
}

/// Cruise engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CruisePhase {
    #[default]
    Off = 0,
    Charging = 1,
    Cruising = 2,
    Disrupted = 3,
}

impl CruisePhase {
    /// Parses the 2-bit wire value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Off,
            1 => Self::Charging,
            2 => Self::Cruising,
            _ => Self::Disrupted,
        }
    }
}
