//! Tick scheduling over variable frame deltas.
//!
//! The [`TickClock`] turns the frame deltas reported by the scheduler into a
//! count of activation ticks that fell due. The first tick fires once
//! `delay` seconds have elapsed and the n-th one at `delay + (n - 1) *
//! interval`. The schedule is computed from the tick count rather than by
//! subtracting intervals, so the same total elapsed time yields the same
//! number of ticks however it was split into frames.
//!
//! After a stall (a debugger break, a long load) one frame can cover many
//! intervals. At most `max_catch_up_ticks` of them are reported; the rest
//! are skipped and the schedule carries on from the current time.
//!
//! # Example
//!
//! ```
//! use umbra_engine::clock::TickClock;
//!
//! let mut clock = TickClock::new(10.0, 2.0);
//! assert_eq!(clock.advance(1.5), 0);
//! assert_eq!(clock.advance(0.5), 1); // t = 2
//! assert_eq!(clock.advance(25.0), 2); // t = 27: ticks at 12 and 22
//! assert_eq!(clock.ticks_fired(), 3);
//! ```

use tracing::warn;
use umbra_events::config::TreeConfig;

/// Most ticks a single frame reports unless configured otherwise.
pub const DEFAULT_MAX_CATCH_UP_TICKS: u64 = 32;

/// Accumulates frame time and reports how many ticks are due.
#[derive(Debug, Clone)]
pub struct TickClock {
    interval: f64,
    delay: f64,
    elapsed: f64,
    /// Scheduled ticks that have passed, reported or skipped.
    fired: u64,
    max_catch_up_ticks: u64,
    skipped: u64,
    running: bool,
}

impl TickClock {
    /// `interval` must be positive and `delay` non-negative; both are
    /// checked by [`TreeConfig::validate`] when the clock comes from a
    /// config.
    pub fn new(interval: f64, delay: f64) -> Self {
        Self {
            interval,
            delay,
            elapsed: 0.0,
            fired: 0,
            max_catch_up_ticks: DEFAULT_MAX_CATCH_UP_TICKS,
            skipped: 0,
            running: true,
        }
    }

    /// Cap the ticks one frame may report. Zero is treated as one.
    pub fn with_max_catch_up_ticks(mut self, max: u64) -> Self {
        self.max_catch_up_ticks = max.max(1);
        self
    }

    pub fn from_config(config: &TreeConfig) -> Self {
        Self::new(config.tick_interval_seconds, config.tick_delay_seconds)
    }

    /// Add `dt` seconds and return the number of ticks that fell due, at
    /// most `max_catch_up_ticks`.
    ///
    /// Returns 0 for a stopped clock and for negative or non-finite deltas.
    pub fn advance(&mut self, dt: f64) -> u64 {
        if !self.running {
            return 0;
        }
        if !(dt >= 0.0 && dt.is_finite()) {
            warn!(dt, "tick clock ignoring invalid frame delta");
            return 0;
        }
        self.elapsed += dt;

        let reached = self.ticks_reached();
        let due = reached.saturating_sub(self.fired);
        self.fired = self.fired.max(reached);
        if due > self.max_catch_up_ticks {
            let dropped = due - self.max_catch_up_ticks;
            self.skipped = self.skipped.saturating_add(dropped);
            warn!(due, dropped, "tick clock fell behind; skipping ticks");
            return self.max_catch_up_ticks;
        }
        due
    }

    /// Number of scheduled ticks at or before `elapsed`.
    fn ticks_reached(&self) -> u64 {
        if self.elapsed < self.delay {
            return 0;
        }
        // `as` saturates, so a huge elapsed time pins the count at u64::MAX.
        let intervals = ((self.elapsed - self.delay) / self.interval).floor() as u64;
        let mut reached = intervals.saturating_add(1);
        // Agree with `tick_at` when the division rounded across a boundary.
        for _ in 0..2 {
            if reached > 0 && self.tick_at(reached - 1) > self.elapsed {
                reached -= 1;
            } else if self.tick_at(reached) <= self.elapsed {
                reached = reached.saturating_add(1);
            }
        }
        reached
    }

    fn tick_at(&self, n: u64) -> f64 {
        self.delay + n as f64 * self.interval
    }

    fn next_tick_at(&self) -> f64 {
        self.tick_at(self.fired)
    }

    /// Seconds until the next tick, zero if one is already due.
    pub fn time_until_next_tick(&self) -> f64 {
        (self.next_tick_at() - self.elapsed).max(0.0)
    }

    /// Stop the clock for good.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Scheduled ticks that have passed, including skipped ones.
    pub fn ticks_fired(&self) -> u64 {
        self.fired
    }

    /// Ticks dropped by the catch-up cap.
    pub fn ticks_skipped(&self) -> u64 {
        self.skipped
    }

    pub fn max_catch_up_ticks(&self) -> u64 {
        self.max_catch_up_ticks
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_waits_for_the_delay() {
        let mut clock = TickClock::new(10.0, 2.0);
        assert_eq!(clock.advance(1.0), 0);
        assert_eq!(clock.time_until_next_tick(), 1.0);
        assert_eq!(clock.advance(1.0), 1);
        assert_eq!(clock.time_until_next_tick(), 10.0);
    }

    #[test]
    fn zero_delay_fires_on_the_first_frame() {
        let mut clock = TickClock::new(4.0, 0.0);
        assert_eq!(clock.advance(0.0), 1);
        assert_eq!(clock.advance(3.5), 0);
        assert_eq!(clock.advance(0.5), 1);
    }

    #[test]
    fn long_frame_reports_every_due_tick() {
        let mut clock = TickClock::new(1.0, 0.5);
        assert_eq!(clock.advance(10.0), 10);
        assert_eq!(clock.ticks_fired(), 10);
    }

    #[test]
    fn catch_up_is_capped_after_a_stall() {
        let mut clock = TickClock::new(1.0, 0.0).with_max_catch_up_ticks(3);
        assert_eq!(clock.advance(10.0), 3);
        assert_eq!(clock.ticks_skipped(), 8);
        // The schedule resumes from the current time, not from the backlog.
        assert_eq!(clock.advance(0.5), 0);
        assert_eq!(clock.advance(0.5), 1);
        assert_eq!(clock.ticks_skipped(), 8);
    }

    #[test]
    fn huge_finite_delta_returns_promptly() {
        let mut clock = TickClock::new(1e-3, 0.0);
        assert_eq!(clock.advance(1e300), DEFAULT_MAX_CATCH_UP_TICKS);
        assert_eq!(clock.advance(1e300), 0);
    }

    #[test]
    fn zero_cap_still_reports_one_tick() {
        let mut clock = TickClock::new(1.0, 0.0).with_max_catch_up_ticks(0);
        assert_eq!(clock.max_catch_up_ticks(), 1);
        assert_eq!(clock.advance(5.0), 1);
    }

    #[test]
    fn invalid_deltas_are_ignored() {
        let mut clock = TickClock::new(1.0, 0.0);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.advance(f64::INFINITY), 0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn stopped_clock_never_fires() {
        let mut clock = TickClock::new(1.0, 0.0);
        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(clock.advance(100.0), 0);
        assert_eq!(clock.ticks_fired(), 0);
    }

    #[test]
    fn from_config_uses_tick_timing() {
        let config = TreeConfig {
            tick_interval_seconds: 3.0,
            tick_delay_seconds: 0.5,
            ..Default::default()
        };
        let clock = TickClock::from_config(&config);
        assert_eq!(clock.interval(), 3.0);
        assert_eq!(clock.delay(), 0.5);
    }
}
