//! Clock abstraction for the polling pipeline
//!
//! The calibration and fusion stages never read a clock themselves; the
//! polling loop samples a `TimeSource` once per cycle and threads the
//! timestamp through. That keeps the core deterministic and lets tests pin
//! time exactly.

/// Timestamp in milliseconds since epoch (or device boot for monotonic sources)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// System wall-clock time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
///
/// Uses an atomic so tests can advance the clock through a shared handle
/// while a poller holds the same instance.
#[derive(Debug, Default)]
pub struct FixedClock {
    timestamp: core::sync::atomic::AtomicU64,
}

impl FixedClock {
    /// Create a clock pinned at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: core::sync::atomic::AtomicU64::new(timestamp),
        }
    }

    /// Pin the clock to a new timestamp
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp
            .store(timestamp, core::sync::atomic::Ordering::Relaxed);
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.timestamp
            .fetch_add(ms, core::sync::atomic::Ordering::Relaxed);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp.load(core::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(1000);
        assert_eq!(clock.now(), 1000);

        clock.advance(500);
        assert_eq!(clock.now(), 1500);

        clock.set(100);
        assert_eq!(clock.now(), 100);
    }

    #[cfg(feature = "std")]
    #[test]
    fn system_clock_is_nonzero() {
        assert!(SystemClock.now() > 0);
    }
}
