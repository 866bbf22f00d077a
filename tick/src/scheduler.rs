//! Fixed-timestep driver.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TickConfig;

/// Passed to the step callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepContext {
    /// Step number, starting at 1.
    pub tick: u64,
    /// Simulated time covered by this step.
    pub dt: Duration,
    /// Simulated time after this step.
    pub total: Duration,
    /// `false` for a backlog flush step.
    pub fixed: bool,
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub fixed_steps: u32,
    /// Length of the variable step the backlog was flushed as, if any.
    pub flushed: Option<Duration>,
}

/// Requests a running scheduler to stop at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives a step callback at a fixed cadence.
///
/// Each frame sleeps in small quanta while the remaining wait exceeds the
/// estimated sleep precision, then spins until a full step has accumulated.
/// At most `max_catch_up_steps` fixed steps run per frame; once that cap is
/// hit any remaining backlog runs as one variable-length step so the
/// simulation never falls further behind.
#[derive(Debug)]
pub struct TickScheduler<C: Clock = SystemClock> {
    config: TickConfig,
    clock: C,
    last: Duration,
    accumulated: Duration,
    oversleep: VecDeque<Duration>,
    precision: Duration,
    tick: u64,
    total: Duration,
    stop: StopHandle,
}

impl TickScheduler<SystemClock> {
    #[must_use]
    pub fn new(config: TickConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> TickScheduler<C> {
    #[must_use]
    pub fn with_clock(config: TickConfig, clock: C) -> Self {
        let last = clock.now();
        Self {
            precision: config.initial_precision,
            oversleep: VecDeque::with_capacity(config.precision_window),
            config,
            clock,
            last,
            accumulated: Duration::ZERO,
            tick: 0,
            total: Duration::ZERO,
            stop: StopHandle::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Steps run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time so far.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Wall time accumulated but not yet simulated.
    #[must_use]
    pub fn backlog(&self) -> Duration {
        self.accumulated
    }

    /// Current estimate of how far a sleep overshoots its request.
    #[must_use]
    pub fn estimated_precision(&self) -> Duration {
        self.precision
    }

    /// Runs frames until stopped.
    pub fn run(&mut self, mut step: impl FnMut(&StepContext)) {
        while !self.stop.is_stopped() {
            self.run_frame(&mut step);
        }
    }

    /// Waits for the next step and runs one frame's worth of steps.
    pub fn run_frame(&mut self, step: &mut impl FnMut(&StepContext)) -> FrameReport {
        self.accumulate();
        while self.accumulated + self.precision < self.config.step {
            let before = self.clock.now();
            self.clock.sleep(self.config.sleep_quantum);
            let slept = self.clock.now().saturating_sub(before);
            self.record_oversleep(slept.saturating_sub(self.config.sleep_quantum));
            self.accumulate();
        }
        while self.accumulated < self.config.step {
            self.clock.spin();
            self.accumulate();
        }
        self.drain(step)
    }

    /// Runs whatever the accumulated wall time allows without waiting.
    pub fn poll(&mut self, step: &mut impl FnMut(&StepContext)) -> FrameReport {
        self.accumulate();
        self.drain(step)
    }

    fn drain(&mut self, step: &mut impl FnMut(&StepContext)) -> FrameReport {
        let mut report = FrameReport::default();
        while self.accumulated >= self.config.step
            && report.fixed_steps < self.config.max_catch_up_steps
        {
            self.accumulated -= self.config.step;
            self.execute(step, self.config.step, true);
            report.fixed_steps += 1;
        }

        if report.fixed_steps == self.config.max_catch_up_steps && !self.accumulated.is_zero() {
            let backlog = std::mem::take(&mut self.accumulated);
            debug!(
                backlog_ms = backlog.as_secs_f64() * 1000.0,
                "flushing backlog as one step"
            );
            self.execute(step, backlog, false);
            report.flushed = Some(backlog);
        }
        report
    }

    fn execute(&mut self, step: &mut impl FnMut(&StepContext), dt: Duration, fixed: bool) {
        self.tick += 1;
        self.total += dt;
        let ctx = StepContext {
            tick: self.tick,
            dt,
            total: self.total,
            fixed,
        };
        let started = self.clock.now();
        step(&ctx);
        let took = self.clock.now().saturating_sub(started);
        if took > self.config.step {
            warn!(
                tick = self.tick,
                took_ms = took.as_secs_f64() * 1000.0,
                "step exceeded its time slice"
            );
        }
    }

    fn accumulate(&mut self) {
        let now = self.clock.now();
        self.accumulated += now.saturating_sub(self.last);
        self.last = now;
    }

    fn record_oversleep(&mut self, sample: Duration) {
        if self.config.precision_window == 0 {
            return;
        }
        if self.oversleep.len() == self.config.precision_window {
            self.oversleep.pop_front();
        }
        self.oversleep.push_back(sample);
        self.precision = self.oversleep.iter().copied().max().unwrap_or(sample);
        trace!(
            precision_us = self.precision.as_micros() as u64,
            "sleep precision updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn scheduler(clock: &ManualClock) -> TickScheduler<&ManualClock> {
        TickScheduler::with_clock(TickConfig::default(), clock)
    }

    #[test]
    fn stall_runs_two_fixed_steps_then_flushes() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        clock.advance(Duration::from_millis(40));

        let mut steps = Vec::new();
        let report = scheduler.run_frame(&mut |ctx: &StepContext| steps.push(*ctx));

        assert_eq!(report.fixed_steps, 2);
        assert_eq!(report.flushed, Some(Duration::from_nanos(6_666_666)));
        assert_eq!(steps.len(), 3);
        assert!(steps[0].fixed && steps[1].fixed && !steps[2].fixed);
        assert_eq!(steps[2].tick, 3);
        assert_eq!(scheduler.total(), Duration::from_millis(40));
        assert!(scheduler.backlog().is_zero());
    }

    #[test]
    fn partial_backlog_is_kept_below_cap() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        clock.advance(Duration::from_millis(20));
        let report = scheduler.run_frame(&mut |_: &StepContext| {});
        assert_eq!(report.fixed_steps, 1);
        assert_eq!(report.flushed, None);
        assert!(scheduler.backlog() > Duration::from_millis(3));
    }

    #[test]
    fn waits_for_a_full_step() {
        let clock = ManualClock::new();
        clock.set_oversleep(Duration::from_micros(250));
        let mut scheduler = scheduler(&clock);

        let report = scheduler.run_frame(&mut |_: &StepContext| {});
        assert_eq!(report.fixed_steps, 1);
        assert!(clock.now() >= TickConfig::default().step);
        assert!(clock.now() < TickConfig::default().step + Duration::from_millis(2));
    }

    #[test]
    fn precision_is_rolling_max() {
        let clock = ManualClock::new();
        let config = TickConfig {
            precision_window: 2,
            ..TickConfig::default()
        };
        let mut scheduler = TickScheduler::with_clock(config, &clock);
        scheduler.record_oversleep(Duration::from_micros(500));
        scheduler.record_oversleep(Duration::from_micros(100));
        assert_eq!(scheduler.estimated_precision(), Duration::from_micros(500));
        scheduler.record_oversleep(Duration::from_micros(200));
        assert_eq!(scheduler.estimated_precision(), Duration::from_micros(200));
    }

    #[test]
    fn no_drift_over_many_frames() {
        let clock = ManualClock::new();
        clock.set_oversleep(Duration::from_micros(400));
        let mut scheduler = scheduler(&clock);
        for _ in 0..600 {
            let report = scheduler.run_frame(&mut |_: &StepContext| {});
            assert!(report.flushed.is_none());
        }
        assert_eq!(scheduler.tick(), 600);
        let lag = clock.now() - scheduler.total();
        assert!(lag < TickConfig::default().step);
    }

    #[test]
    fn stop_from_callback_ends_run() {
        let clock = ManualClock::new();
        let mut scheduler = scheduler(&clock);
        let handle = scheduler.stop_handle();
        scheduler.run(|ctx| {
            if ctx.tick == 5 {
                handle.stop();
            }
        });
        assert_eq!(scheduler.tick(), 5);
    }
}
