// Clock abstraction shared by the synchronizer and the frame scheduler
//
// Everything time-based in the editor (60 Hz sync gate, redraw throttling,
// settle delays) reads time through this trait so hosts can drive it from
// their own frame clock and tests can step it by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source
///
/// `now()` returns the elapsed time since an arbitrary, fixed origin.
/// Values must never go backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock implementation backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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
}

/// Hand-driven clock
///
/// Cloning shares the underlying counter, so a test can keep one handle and
/// give another to the session under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, delta: Duration) {
        self.micros
            .fetch_add(delta.as_micros() as u64, Ordering::Relaxed);
    }

    /// Convenience wrapper around `advance` for millisecond steps
    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Jump to an absolute time. Ignored if it would move the clock backwards.
    pub fn set(&self, at: Duration) {
        let target = at.as_micros() as u64;
        self.micros.fetch_max(target, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance_is_shared() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance_ms(16);
        assert_eq!(clock.now(), Duration::from_millis(16));

        clock.advance(Duration::from_micros(500));
        assert_eq!(handle.now(), Duration::from_micros(16_500));
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(100));
        clock.set(Duration::from_millis(40));
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
