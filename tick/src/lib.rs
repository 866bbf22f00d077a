//! Fixed-timestep scheduling for statecast servers.
//!
//! [`TickScheduler`] invokes a step callback at a fixed cadence. It sleeps in
//! small quanta while the remaining wait is comfortably larger than the
//! observed sleep overshoot, spins for the last stretch, and bounds catch-up
//! after a stall so a slow frame never snowballs.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tick::{ManualClock, StepContext, TickConfig, TickScheduler};
//!
//! let clock = ManualClock::new();
//! let mut scheduler = TickScheduler::with_clock(TickConfig::default(), &clock);
//! clock.advance(Duration::from_millis(40));
//!
//! let report = scheduler.run_frame(&mut |_: &StepContext| {});
//! assert_eq!(report.fixed_steps, 2);
//! assert!(report.flushed.is_some());
//! ```

mod clock;
mod config;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TickConfig;
pub use scheduler::{FrameReport, StepContext, StopHandle, TickScheduler};
