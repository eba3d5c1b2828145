//! Monotonic tick clocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock measured in host ticks.
pub trait Clock: Send + Sync {
    /// Current time in ticks. Never decreases.
    fn now_ticks(&self) -> u64;

    /// Tick frequency.
    fn ticks_per_second(&self) -> f64;
}

/// Convert seconds into ticks, rounding to the nearest tick.
///
/// Negative and non-finite inputs yield zero.
pub fn seconds_to_ticks(seconds: f64, ticks_per_second: f64) -> u64 {
    let ticks = seconds * ticks_per_second;
    if ticks.is_finite() && ticks > 0.0 {
        ticks.round() as u64
    } else {
        0
    }
}

/// Convert a duration into ticks of `clock`.
pub fn duration_to_ticks(clock: &dyn Clock, duration: Duration) -> u64 {
    seconds_to_ticks(duration.as_secs_f64(), clock.ticks_per_second())
}

/// Wall clock backed by [`Instant`], in nanosecond ticks.
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    pub const TICKS_PER_SECOND: f64 = 1_000_000_000.0;

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now_ticks(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn ticks_per_second(&self) -> f64 {
        Self::TICKS_PER_SECOND
    }
}

/// Clock that only moves when told to.
///
/// Shared between the test body (which advances it) and producer threads
/// (which read it when stamping notifications).
pub struct ManualClock {
    ticks: AtomicU64,
    ticks_per_second: f64,
}

impl ManualClock {
    /// Create a clock at tick 0 running at `ticks_per_second`.
    pub fn new(ticks_per_second: f64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            ticks_per_second,
        }
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::AcqRel);
    }

    pub fn advance_secs(&self, seconds: f64) {
        self.advance(seconds_to_ticks(seconds, self.ticks_per_second));
    }

    /// Jump to `ticks`. Moving backwards is ignored.
    pub fn set(&self, ticks: u64) {
        self.ticks.fetch_max(ticks, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(0.05, 1000.0), 50);
        assert_eq!(seconds_to_ticks(1.0, HostClock::TICKS_PER_SECOND), 1_000_000_000);
        assert_eq!(seconds_to_ticks(-1.0, 1000.0), 0);
        assert_eq!(seconds_to_ticks(f64::NAN, 1000.0), 0);
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new(1000.0);
        clock.advance(10);
        clock.advance_secs(0.5);
        assert_eq!(clock.now_ticks(), 510);
        clock.set(100);
        assert_eq!(clock.now_ticks(), 510);
        clock.set(600);
        assert_eq!(clock.now_ticks(), 600);
    }

    #[test]
    fn test_host_clock_advances() {
        let clock = HostClock::new();
        let a = clock.now_ticks();
        std::thread::sleep(Duration::from_millis(1));
        assert!(clock.now_ticks() > a);
        assert_eq!(duration_to_ticks(&clock, Duration::from_millis(2)), 2_000_000);
    }
}
