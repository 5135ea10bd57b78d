//! Delivery lag tracking.
//!
//! Lag is how far behind its own timestamp an event was when the pacer handed
//! it to the transport. With a poll interval `p` and no backlog, lag stays
//! under `p`; growth beyond that means the pacer is falling behind.

use clickstream_types::{Event, Timestamp};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Shared histogram of per-event delivery lag, in milliseconds.
#[derive(Clone)]
pub struct LagTracker {
    histogram: Arc<Mutex<Histogram<u64>>>,
}

impl LagTracker {
    pub fn new() -> Self {
        Self {
            histogram: Arc::new(Mutex::new(
                Histogram::new(3).expect("histogram creation should succeed"),
            )),
        }
    }

    /// Record the lag of every event in a batch handed off at `now`.
    pub fn record(&self, now: Timestamp, events: &[Event]) {
        let mut histogram = self.histogram.lock();
        for event in events {
            histogram.saturating_record(now.as_millis().saturating_sub(event.timestamp.as_millis()));
        }
    }

    /// Snapshot of the lag distribution.
    pub fn report(&self) -> LagReport {
        LagReport {
            histogram: self.histogram.lock().clone(),
        }
    }
}

impl Default for LagTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time lag distribution.
pub struct LagReport {
    histogram: Histogram<u64>,
}

impl LagReport {
    /// Number of events measured.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn has_measurements(&self) -> bool {
        !self.histogram.is_empty()
    }

    /// Median lag.
    pub fn p50(&self) -> Duration {
        Duration::from_millis(self.histogram.value_at_quantile(0.50))
    }

    /// 99th percentile lag.
    pub fn p99(&self) -> Duration {
        Duration::from_millis(self.histogram.value_at_quantile(0.99))
    }

    /// Largest lag seen.
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.histogram.max())
    }

    /// Print a summary to stdout.
    pub fn print_summary(&self) {
        if self.has_measurements() {
            println!("\n--- Delivery Lag ---");
            println!("Events: {}", self.count());
            println!("  P50:  {:?}", self.p50());
            println!("  P99:  {:?}", self.p99());
            println!("  Max:  {:?}", self.max());
        } else {
            println!("\nNo delivery lag measurements recorded.");
        }
    }
}
