//! Error types for codec operations.

use std::fmt;

use crate::baseline::BaselineError;
use crate::types::{NetId, SnapshotTick};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding entity updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wire format error.
    Wire(wire::DecodeError),

    /// Wire framing rejected the packet on encode.
    WireEncode(wire::EncodeError),

    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// A field carried a value with no meaning.
    InvalidValue { field: &'static str, value: u64 },

    /// A field value does not fit the bits its encoding gives it.
    OutOfRange {
        field: &'static str,
        value: i64,
        bits: u8,
    },

    /// Baseline tick is not older than the tick being encoded.
    BaselineNotOlder {
        tick: SnapshotTick,
        baseline: SnapshotTick,
    },

    /// The baseline a delta was encoded against is not in history.
    BaselineNotFound { id: NetId, tick: SnapshotTick },

    /// Self-state block had the wrong length.
    SelfStateSize { expected: usize, actual: usize },

    /// Update blob had bytes left after every listed entity was decoded.
    TrailingUpdateData { remaining: usize },

    /// History insertion out of tick order.
    OutOfOrder {
        last_tick: SnapshotTick,
        new_tick: SnapshotTick,
    },
}

/// Specific codec limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    GunCount,
    BaselineAge,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::WireEncode(e) => write!(f, "wire encode error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value {value} for field {field}")
            }
            Self::OutOfRange { field, value, bits } => {
                write!(f, "{field} value {value} does not fit in {bits} bits")
            }
            Self::BaselineNotOlder { tick, baseline } => {
                write!(f, "baseline tick {baseline} is not older than tick {tick}")
            }
            Self::BaselineNotFound { id, tick } => {
                write!(f, "no baseline for entity {id} at tick {tick}")
            }
            Self::SelfStateSize { expected, actual } => {
                write!(f, "self state is {actual} bytes, expected {expected}")
            }
            Self::TrailingUpdateData { remaining } => {
                write!(f, "{remaining} trailing bytes after entity updates")
            }
            Self::OutOfOrder {
                last_tick,
                new_tick,
            } => {
                write!(f, "tick {new_tick} is not after {last_tick}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GunCount => f.write_str("gun count"),
            Self::BaselineAge => f.write_str("baseline age"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::WireEncode(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        Self::WireEncode(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<BaselineError> for CodecError {
    fn from(err: BaselineError) -> Self {
        match err {
            BaselineError::OutOfOrder {
                last_tick,
                new_tick,
            } => Self::OutOfOrder {
                last_tick,
                new_tick,
            },
        }
    }
}
