//! Clock implementations.

use crate::Clock;
use clickstream_types::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Timestamp(millis)
    }
}

/// Clock driven by tokio's timer.
///
/// Reports `origin` plus the time elapsed on `tokio::time::Instant` since the
/// clock was created. Under a paused runtime (`start_paused = true`) time only
/// moves when every task is asleep, so pacing logic built on
/// `tokio::time::sleep` can be exercised without real waiting.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Timestamp,
    start: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock that reads `origin` right now.
    pub fn starting_at(origin: Timestamp) -> Self {
        Self {
            origin,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.origin.saturating_add(self.start.elapsed())
    }
}
