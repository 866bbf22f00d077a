//! Limits for codec-level decoding.

/// Codec-specific limits enforced while reading entity updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum number of gun orientations per entity.
    pub max_guns: usize,
    /// Maximum baseline age a delta may reference, in ticks.
    pub max_baseline_age: u32,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_guns: 32,
            max_baseline_age: crate::HISTORY_CAPACITY as u32,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_guns: 8,
            max_baseline_age: 16,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_guns: usize::MAX,
            max_baseline_age: u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_age_matches_history() {
        let limits = CodecLimits::default();
        assert_eq!(limits.max_baseline_age as usize, crate::HISTORY_CAPACITY);
        assert!(limits.max_guns >= 8);
    }

    #[test]
    fn testing_limits_smaller() {
        let test_limits = CodecLimits::for_testing();
        let default_limits = CodecLimits::default();
        assert!(test_limits.max_guns < default_limits.max_guns);
        assert!(test_limits.max_baseline_age < default_limits.max_baseline_age);
    }

    #[test]
    fn unlimited_limits() {
        let limits = CodecLimits::unlimited();
        assert_eq!(limits.max_guns, usize::MAX);
        assert_eq!(limits.max_baseline_age, u32::MAX);
    }
}
