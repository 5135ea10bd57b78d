//! Delivery pacer.
//!
//! Releases a shard's events to the transport as wall-clock time reaches
//! their timestamps. Each tick reads the clock once, hands every member's due
//! prefix (timestamps strictly before `now`) to the transport as one delivery,
//! then sleeps for whatever is left of the poll interval. The loop stops once
//! the clock passes `end + grace`; anything still held becomes carry-forward.

use crate::builder::WindowWorkload;
use crate::carry::CarriedEvents;
use crate::lag::LagTracker;
use crate::scheduler::SchedulerStats;
use clickstream_core::{Clock, DeliveryBatch, DeliveryTransport, SequenceCounter};
use clickstream_types::{Event, ShardId, Timestamp, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a pacer run left behind.
#[derive(Debug)]
pub struct PacerOutcome {
    /// Ticks executed before the deadline.
    pub ticks: u64,
    /// Users still holding events at the deadline.
    pub carried: Vec<CarriedEvents>,
}

impl PacerOutcome {
    /// Events left undelivered.
    pub fn carried_events(&self) -> usize {
        self.carried.iter().map(|c| c.events.len()).sum()
    }
}

/// Paces one shard's workload out to the transport.
#[derive(Clone)]
pub struct DeliveryPacer {
    transport: Arc<dyn DeliveryTransport>,
    clock: Arc<dyn Clock>,
    sequence: Arc<SequenceCounter>,
    stats: Arc<SchedulerStats>,
    lag: LagTracker,
    poll_interval: Duration,
    grace: Duration,
}

impl DeliveryPacer {
    pub fn new(
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
        sequence: Arc<SequenceCounter>,
        poll_interval: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            sequence,
            stats: Arc::new(SchedulerStats::default()),
            lag: LagTracker::new(),
            poll_interval,
            grace,
        }
    }

    /// Count into shared statistics.
    pub fn with_stats(mut self, stats: Arc<SchedulerStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Record delivery lag into a shared tracker.
    pub fn with_lag_tracker(mut self, lag: LagTracker) -> Self {
        self.lag = lag;
        self
    }

    /// Pace `workload` until the clock passes `end + grace`.
    pub async fn run(&self, shard: ShardId, mut workload: WindowWorkload, end: Timestamp) -> PacerOutcome {
        let deadline = end.saturating_add(self.grace);
        let mut ticks = 0u64;

        loop {
            let started = tokio::time::Instant::now();
            let now = self.clock.now();
            if now > deadline {
                break;
            }
            ticks += 1;

            for member in workload.members.iter_mut() {
                // Events are sorted, so everything due forms a prefix.
                let due = member.events.partition_point(|e| e.timestamp < now);
                if due == 0 {
                    continue;
                }
                let batch: Vec<Event> = member.events.drain(..due).collect();
                self.deliver(shard, &member.user, &batch, now).await;
            }

            match self.poll_interval.checked_sub(started.elapsed()) {
                Some(rest) if !rest.is_zero() => tokio::time::sleep(rest).await,
                _ => tokio::task::yield_now().await,
            }
        }

        SchedulerStats::add(&self.stats.ticks, ticks);
        let carried = workload.into_leftovers();
        let outcome = PacerOutcome { ticks, carried };
        if !outcome.carried.is_empty() {
            info!(
                shard = %shard,
                users = outcome.carried.len(),
                events = outcome.carried_events(),
                "Grace deadline passed with undelivered events"
            );
        }
        outcome
    }

    /// Hand one user's due events to the transport.
    ///
    /// The events count as sent whatever the outcome.
    async fn deliver(&self, shard: ShardId, user: &User, events: &[Event], now: Timestamp) {
        let count = events.len() as u64;
        let sequence_id = self.sequence.next_id();
        let batch = DeliveryBatch::for_user(user, events, sequence_id);

        match self.transport.deliver(batch).await {
            Ok(()) => {
                debug!(
                    shard = %shard,
                    user = %user.id,
                    events = count,
                    sequence_id,
                    "Delivered events"
                );
            }
            Err(e) => {
                SchedulerStats::add(&self.stats.delivery_failures, 1);
                warn!(
                    shard = %shard,
                    user = %user.id,
                    events = count,
                    first_timestamp = %events[0].timestamp,
                    sequence_id,
                    error = %e,
                    "Delivery failed"
                );
            }
        }

        user.record_sent(count);
        SchedulerStats::add(&self.stats.deliveries, 1);
        SchedulerStats::add(&self.stats.sent_events, count);
        self.lag.record(now, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ShardMember;
    use clickstream_core::TokioClock;
    use clickstream_test_helpers::{users, FailingTransport, RecordingTransport};
    use std::collections::VecDeque;
    use tracing_test::traced_test;

    fn workload(users: &[Arc<User>], timestamps: &[u64]) -> WindowWorkload {
        let members = users
            .iter()
            .map(|user| {
                let events: VecDeque<Event> = timestamps
                    .iter()
                    .map(|&ts| Event::new("scripted", Timestamp(ts)))
                    .collect();
                user.begin_window(events.len() as u64);
                ShardMember {
                    user: Arc::clone(user),
                    events,
                }
            })
            .collect();
        WindowWorkload { members }
    }

    fn pacer(transport: Arc<dyn DeliveryTransport>, clock: Arc<dyn Clock>, poll_ms: u64, grace_ms: u64) -> DeliveryPacer {
        DeliveryPacer::new(
            transport,
            clock,
            Arc::new(SequenceCounter::new()),
            Duration::from_millis(poll_ms),
            Duration::from_millis(grace_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_event_per_user_per_tick() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(Timestamp::ZERO));
        let transport = Arc::new(RecordingTransport::new(Arc::clone(&clock)));
        let users = users(10);
        let pacer = pacer(transport.clone(), clock, 20_000, 0);

        let outcome = pacer
            .run(ShardId(0), workload(&users, &[10_000, 30_000, 50_000]), Timestamp(60_000))
            .await;

        assert!(outcome.carried.is_empty());
        // Ticks at 0, 20s, 40s and 60s; the first one has nothing due.
        assert_eq!(outcome.ticks, 4);

        for user in &users {
            let deliveries = transport.deliveries_for(user.id);
            let arrivals: Vec<u64> = deliveries.iter().map(|d| d.delivered_at.as_millis()).collect();
            assert_eq!(arrivals, vec![20_000, 40_000, 60_000]);
            assert!(deliveries.iter().all(|d| d.timestamps.len() == 1));
            assert_eq!(user.sent_events(), 3);
            assert_eq!(user.unsent_events(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_strictly_ordered() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(Timestamp::ZERO));
        let transport = Arc::new(RecordingTransport::new(Arc::clone(&clock)));
        let users = users(1);
        let pacer = pacer(transport.clone(), clock, 7_000, 5_000);

        let timestamps: Vec<u64> = (0..60).map(|i| i * 1_000).collect();
        pacer
            .run(ShardId(0), workload(&users, &timestamps), Timestamp(60_000))
            .await;

        let deliveries = transport.deliveries_for(users[0].id);
        for pair in deliveries.windows(2) {
            let last_of_earlier = pair[0].timestamps.iter().max().unwrap();
            let first_of_later = pair[1].timestamps.iter().min().unwrap();
            assert!(last_of_earlier < first_of_later);
        }
        for delivery in &deliveries {
            assert!(delivery.timestamps.iter().all(|ts| *ts < delivery.delivered_at));
        }
        assert_eq!(transport.event_count(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_leaves_carry_forward() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(Timestamp::ZERO));
        let transport = Arc::new(RecordingTransport::new(Arc::clone(&clock)));
        let users = users(10);
        let pacer = pacer(transport.clone(), clock, 25_000, 0);

        let outcome = pacer
            .run(ShardId(1), workload(&users, &[10_000, 30_000, 55_000]), Timestamp(60_000))
            .await;

        assert_eq!(outcome.carried.len(), 10);
        for carried in &outcome.carried {
            let remaining: Vec<u64> = carried.events.iter().map(|e| e.timestamp.as_millis()).collect();
            assert_eq!(remaining, vec![55_000]);
            // Conservation: sent + remaining == total.
            assert_eq!(
                carried.user.sent_events() + carried.events.len() as u64,
                carried.user.total_window_events()
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_events_are_never_flushed() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(Timestamp::ZERO));
        let transport = Arc::new(RecordingTransport::new(Arc::clone(&clock)));
        let users = users(1);
        let pacer = pacer(transport.clone(), clock, 20_000, 0);

        let outcome = pacer
            .run(ShardId(0), workload(&users, &[10_000, 70_000]), Timestamp(60_000))
            .await;

        let delivered: Vec<Timestamp> = transport
            .deliveries()
            .into_iter()
            .flat_map(|d| d.timestamps)
            .collect();
        assert_eq!(delivered, vec![Timestamp(10_000)]);
        assert_eq!(outcome.carried_events(), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_failed_deliveries_still_count_as_sent() {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(Timestamp::ZERO));
        let transport = Arc::new(FailingTransport::new());
        let stats = Arc::new(SchedulerStats::default());
        let users = users(10);
        let pacer = pacer(transport.clone(), clock, 20_000, 0).with_stats(Arc::clone(&stats));

        let outcome = pacer
            .run(ShardId(0), workload(&users, &[10_000, 30_000, 50_000]), Timestamp(60_000))
            .await;

        assert!(outcome.carried.is_empty());
        assert_eq!(transport.attempts(), 30);
        for user in &users {
            assert_eq!(user.sent_events(), 3);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.delivery_failures, 30);
        assert_eq!(snapshot.sent_events, 30);

        assert!(logs_contain("Delivery failed"));
        logs_assert(|lines: &[&str]| {
            let failures = lines.iter().filter(|l| l.contains("Delivery failed")).count();
            if failures == 30 {
                Ok(())
            } else {
                Err(format!("expected 30 failure logs, got {}", failures))
            }
        });
    }
}
