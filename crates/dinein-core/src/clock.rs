//! # Clock
//!
//! Time source for stores that assign their own timestamps.
//!
//! PostgreSQL stamps rows with `clock_timestamp()`; the in-memory store has
//! no server clock, so it takes one of these. `paid_at` must be monotonic
//! per process, which [`MonotonicClock`] guarantees even when the wall clock
//! steps backwards.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// A source of UTC instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wraps another clock so successive readings strictly increase.
///
/// A reading that is not after the previous one is bumped to one
/// microsecond past it (PostgreSQL timestamp resolution).
#[derive(Debug)]
pub struct MonotonicClock<C> {
    inner: C,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> MonotonicClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut now = self.inner.now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

/// A clock that only moves when told to. For tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(30));
        assert_eq!(clock.now(), start + Duration::minutes(30));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_monotonic_clock_never_repeats() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let manual = Arc::new(ManualClock::new(start));
        let clock = MonotonicClock::new(Arc::clone(&manual));

        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, start);
        assert_eq!(b, start + Duration::microseconds(1));

        // Wall clock stepping back still moves forward.
        manual.set(start - Duration::hours(1));
        assert!(clock.now() > b);
    }

    #[test]
    fn test_system_clock_is_monotonic_when_wrapped() {
        let clock = MonotonicClock::new(SystemClock);
        let readings: Vec<_> = (0..100).map(|_| clock.now()).collect();
        assert!(readings.windows(2).all(|w| w[0] < w[1]));
    }
}
