//! Clock abstraction for real and manually driven time.
//!
//! The engine never calls `Local::now()` directly. Everything that needs the
//! current instant goes through a [`Clock`], so tests can pin the time of day
//! and step across sunrise, sunset, or midnight without waiting.

use chrono::{DateTime, FixedOffset, Local};

/// Source of the current local instant.
pub trait Clock: Send + Sync {
    /// Current time, carrying the local UTC offset in effect at that instant.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall-clock time in the system's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let now = Local::now();
        now.with_timezone(now.offset())
    }
}

#[cfg(any(test, feature = "testing-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "testing-support"))]
mod manual {
    use super::Clock;
    use chrono::{DateTime, Duration, FixedOffset};
    use std::sync::{Arc, Mutex};

    /// Clock that only moves when told to.
    ///
    /// Clones share the same instant, so a test can keep one handle while the
    /// engine owns another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<FixedOffset>>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<FixedOffset>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        pub fn set(&self, instant: DateTime<FixedOffset>) {
            *self.lock() = instant;
        }

        pub fn advance(&self, step: Duration) {
            let mut now = self.lock();
            *now += step;
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
            // A panicking test thread must not wedge the others
            self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<FixedOffset> {
            *self.lock()
        }
    }
}
