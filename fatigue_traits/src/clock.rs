use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for the control loop and its pacing.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - us_since(): elapsed microseconds from an epoch Instant, wrapping like a
///   32-bit hardware microsecond counter
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Microseconds elapsed since `epoch`, truncated to 32 bits.
    ///
    /// Saturates at 0 when `epoch` lies in the future.
    fn us_since(&self, epoch: Instant) -> u32 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_micros() as u32
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Set the absolute offset relative to origin.
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn us_since_tracks_manual_advance() {
        let clock = TestClock::new();
        let epoch = clock.now();
        clock.advance(Duration::from_micros(1_250));
        assert_eq!(clock.us_since(epoch), 1_250);
    }

    #[test]
    fn us_since_wraps_like_a_u32_counter() {
        let clock = TestClock::new();
        let epoch = clock.now();
        clock.set_offset(Duration::from_micros(u64::from(u32::MAX) + 6));
        assert_eq!(clock.us_since(epoch), 5);
    }

    #[test]
    fn us_since_future_epoch_is_zero() {
        let clock = TestClock::new();
        clock.advance(Duration::from_millis(5));
        let later = clock.now() + Duration::from_millis(1);
        assert_eq!(clock.us_since(later), 0);
    }
}
