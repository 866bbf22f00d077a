//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// Decode errors for packet framing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Packet is too small to contain the header and self-state block.
    PacketTooSmall { actual: usize, required: usize },

    /// Baseline tick is not older than the packet tick.
    InvalidOldTick { tick: u32, old_tick: u32 },

    /// Id list is not strictly ascending.
    NonAscendingIds { previous: i32, current: i32 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Underlying bitstream error.
    Bitstream(BitError),
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    EntityCount,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Ids handed to the id-list encoder were not strictly ascending.
    UnsortedIds { previous: i32, current: i32 },
    /// Too many ids for the requested count encoding.
    CountOverflow { count: usize, max: usize },
    /// Encoded packet would exceed the packet byte limit.
    PacketTooLarge { size: usize, limit: usize },
    /// More ids than a decoder with the same limits accepts.
    TooManyEntities { count: usize, limit: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(
                    f,
                    "packet too small: {actual} bytes, need at least {required}"
                )
            }
            Self::InvalidOldTick { tick, old_tick } => {
                write!(f, "baseline tick {old_tick} is not older than tick {tick}")
            }
            Self::NonAscendingIds { previous, current } => {
                write!(f, "id list not ascending: {previous} then {current}")
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::Bitstream(err) => write!(f, "bitstream error: {err}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PacketBytes => "packet bytes",
            Self::EntityCount => "entity count",
        };
        f.write_str(name)
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsortedIds { previous, current } => {
                write!(f, "ids must be strictly ascending: {previous} then {current}")
            }
            Self::CountOverflow { count, max } => {
                write!(f, "{count} ids do not fit a count limited to {max}")
            }
            Self::PacketTooLarge { size, limit } => {
                write!(f, "packet of {size} bytes exceeds limit of {limit}")
            }
            Self::TooManyEntities { count, limit } => {
                write!(f, "{count} entities exceed the per-packet limit of {limit}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<BitError> for DecodeError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}
