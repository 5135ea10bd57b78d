//! Run statistics and the end-of-run report.

use crate::lag::LagReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the scheduler and every shard task.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Windows completed.
    pub windows: AtomicU64,
    /// Events produced by the builder and kept in a workload.
    pub generated_events: AtomicU64,
    /// Generated events dropped for falling outside their window.
    pub truncated_events: AtomicU64,
    /// Events handed to the transport, including failed deliveries.
    pub sent_events: AtomicU64,
    /// Deliveries attempted.
    pub deliveries: AtomicU64,
    /// Deliveries the transport reported as failed.
    pub delivery_failures: AtomicU64,
    /// Events moved into the carry-forward set.
    pub carried_events: AtomicU64,
    /// Shard tasks that failed (generation error or panic).
    pub failed_shards: AtomicU64,
    /// Pacing ticks across all shards.
    pub ticks: AtomicU64,
}

impl SchedulerStats {
    pub(crate) fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            windows: self.windows.load(Ordering::Relaxed),
            generated_events: self.generated_events.load(Ordering::Relaxed),
            truncated_events: self.truncated_events.load(Ordering::Relaxed),
            sent_events: self.sent_events.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            carried_events: self.carried_events.load(Ordering::Relaxed),
            failed_shards: self.failed_shards.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`SchedulerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub windows: u64,
    pub generated_events: u64,
    pub truncated_events: u64,
    pub sent_events: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub carried_events: u64,
    pub failed_shards: u64,
    pub ticks: u64,
}

/// Report generated after a streaming run.
pub struct StreamerReport {
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Final counters.
    pub stats: StatsSnapshot,
    /// Events still waiting in the carry-forward set.
    pub pending_carry: usize,
    /// Delivery lag distribution.
    pub lag: LagReport,
}

impl StreamerReport {
    /// Events per second handed to the transport.
    pub fn events_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.stats.sent_events as f64 / secs
        } else {
            0.0
        }
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("\n=== Streamer Report ===");
        println!("Duration: {:?}", self.duration);
        println!("Windows: {}", self.stats.windows);
        println!("Generated: {}", self.stats.generated_events);
        println!("Truncated: {}", self.stats.truncated_events);
        println!("Sent: {}", self.stats.sent_events);
        println!("Deliveries: {}", self.stats.deliveries);
        println!("Failed deliveries: {}", self.stats.delivery_failures);
        println!("Carried: {}", self.stats.carried_events);
        println!("Pending carry: {}", self.pending_carry);
        println!("Failed shards: {}", self.stats.failed_shards);
        println!("Avg events/s: {:.2}", self.events_per_second());
        self.lag.print_summary();
    }
}
