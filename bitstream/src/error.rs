use std::fmt;

pub type BitResult<T> = Result<T, BitError>;

/// Failure of a single bit-level read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A read needed more bits than the buffer has left.
    Truncated { needed: usize, remaining: usize },
    /// Bit width above 64.
    BitWidth { bits: u8 },
    /// Value has set bits above the requested width.
    Overflow { value: u64, bits: u8 },
    /// A varint kept its continuation bit past 32 bits of payload.
    VarintOverflow,
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, remaining } => {
                write!(f, "truncated: needed {needed} bits, {remaining} left")
            }
            Self::BitWidth { bits } => write!(f, "bit width {bits} exceeds 64"),
            Self::Overflow { value, bits } => write!(f, "{value} does not fit in {bits} bits"),
            Self::VarintOverflow => f.write_str("varint overflows u32"),
        }
    }
}

impl std::error::Error for BitError {}
