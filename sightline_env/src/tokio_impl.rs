//! Production clock backed by Tokio and the system clock.

use crate::MeetingClock;
use async_trait::async_trait;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Production clock.
///
/// Captures the wall-clock epoch offset once at construction, then derives
/// `now_ms` from a monotonic instant so time never goes backwards within a
/// session even if the system clock is adjusted.
pub struct TokioClock {
    epoch_ms: u64,
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            epoch_ms,
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeetingClock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.start.elapsed().as_millis() as u64
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
