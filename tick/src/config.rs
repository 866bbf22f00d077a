//! Scheduler configuration.

use std::time::Duration;

/// Timing parameters for [`TickScheduler`](crate::TickScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TickConfig {
    /// Fixed simulation step.
    pub step: Duration,
    /// Fixed steps run per frame before the rest of the backlog is flushed.
    pub max_catch_up_steps: u32,
    /// Number of oversleep samples the precision estimate is taken over.
    pub precision_window: usize,
    /// Duration requested from the OS per sleep.
    pub sleep_quantum: Duration,
    /// Precision estimate used before any sleep has been observed.
    pub initial_precision: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            step: Duration::from_nanos(16_666_667),
            max_catch_up_steps: 2,
            precision_window: 32,
            sleep_quantum: Duration::from_millis(1),
            initial_precision: Duration::from_millis(1),
        }
    }
}

impl TickConfig {
    /// Default configuration at `hz` steps per second.
    #[must_use]
    pub fn with_rate(hz: u32) -> Self {
        Self {
            step: Duration::from_secs(1) / hz.max(1),
            ..Self::default()
        }
    }

    /// Steps per second implied by `step`.
    #[must_use]
    pub fn rate(&self) -> f64 {
        1.0 / self.step.as_secs_f64()
    }
}
