//! Time sources for the scheduler.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source the scheduler sleeps and spins on.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Blocks for at least `duration`.
    fn sleep(&self, duration: Duration);

    /// One iteration of a busy wait.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock driven by the caller.
///
/// Sleeping advances time by the requested duration plus a configurable
/// oversleep; spinning advances it by a small fixed amount.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    oversleep: Cell<Duration>,
    spin_step: Cell<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        let clock = Self::default();
        clock.spin_step.set(Duration::from_micros(10));
        clock
    }

    /// Moves time forward, e.g. to simulate a stall.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Extra time added to every sleep.
    pub fn set_oversleep(&self, oversleep: Duration) {
        self.oversleep.set(oversleep);
    }

    pub fn set_spin_step(&self, step: Duration) {
        self.spin_step.set(step);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration + self.oversleep.get());
    }

    fn spin(&self) {
        self.advance(self.spin_step.get().max(Duration::from_nanos(1)));
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }

    fn spin(&self) {
        (**self).spin();
    }
}
