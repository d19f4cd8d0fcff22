//! Clock abstraction for sightline services.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// The time source for everything above the core.
///
/// The core engines take `now_ms` as an explicit parameter; this trait is
/// how the embedding service produces that value, so that production and
/// tests share one injection point.
///
/// # Implementations
///
/// - **Production**: [`crate::TokioClock`] - wall clock + `tokio::time`
/// - **Tests**: [`ManualClock`] - advanced explicitly, never sleeps for real
#[async_trait]
pub trait MeetingClock: Send + Sync + 'static {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Suspends the caller for the given duration.
    ///
    /// In production this is a real sleep; a manual clock returns
    /// immediately after advancing itself.
    async fn sleep_ms(&self, ms: u64);
}

/// Deterministic clock for tests: time moves only when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given time.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Advances the clock.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl MeetingClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    async fn sleep_ms(&self, ms: u64) {
        // Virtual time: sleeping is advancing
        self.advance_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_is_deterministic() {
        let clock = ManualClock::starting_at(1000);
        assert_eq!(clock.now_ms(), 1000);
        clock.advance_ms(500);
        assert_eq!(clock.now_ms(), 1500);
        clock.sleep_ms(250).await;
        assert_eq!(clock.now_ms(), 1750);
    }
}
