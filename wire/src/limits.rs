//! Configurable limits for bounded decoding.

/// Wire-level limits for update packets.
///
/// The packer reads `max_packet_bytes` as its per-client budget and the
/// decoder enforces both fields so hostile input cannot force large
/// allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum packet size in bytes, header included.
    pub max_packet_bytes: usize,

    /// Maximum number of entity entries in one packet.
    pub max_entities: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Fits a typical MTU after UDP and transport overhead
            max_packet_bytes: 1200,
            max_entities: 4096,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 500,
            max_entities: 256,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_entities: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_fits_mtu() {
        let limits = Limits::default();
        assert!(limits.max_packet_bytes <= 1400);
        assert!(limits.max_entities > 0);
    }

    #[test]
    fn testing_limits_are_smaller() {
        let testing = Limits::for_testing();
        let default = Limits::default();
        assert!(testing.max_packet_bytes < default.max_packet_bytes);
        assert!(testing.max_entities < default.max_entities);
    }

    #[test]
    fn unlimited_is_max() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_packet_bytes, usize::MAX);
        assert_eq!(limits.max_entities, usize::MAX);
    }
}
