//! Monotonic clock abstraction used by the TTL cache and refresh indicators.
//!
//! Production code uses [`SystemClock`]; tests drive a [`ManualClock`] so
//! expiry can be checked without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Returns how long ago `since` was, saturating at zero.
    fn age(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }
}

/// Real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Creates a clock that can be handed to several services at once.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Moves the clock forward.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, by: Duration) {
        self.offset_nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }
}

/// Shared, dynamically dispatched clock handle.
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.age(start), Duration::ZERO);

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.age(start), Duration::from_secs(90));
    }

    #[test]
    fn test_age_saturates_for_future_instants() {
        let clock = ManualClock::new();
        let future = clock.now() + Duration::from_secs(5);
        assert_eq!(clock.age(future), Duration::ZERO);
    }

    #[test]
    fn test_shared_clock_is_observed_by_all_holders() {
        let clock = ManualClock::shared();
        let handle: SharedClock = clock.clone();
        let start = handle.now();

        clock.advance(Duration::from_secs(3));
        assert_eq!(handle.age(start), Duration::from_secs(3));
    }
}
