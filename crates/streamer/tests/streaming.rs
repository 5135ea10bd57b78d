//! End-to-end scenarios for the window scheduler.
//!
//! All tests run on a paused tokio runtime with a [`TokioClock`] starting at
//! the epoch, so a 60 second window completes instantly and every arrival
//! time is exact.

use clickstream_core::{Clock, ContentGenerator, TokioClock};
use clickstream_streamer::{SchedulerPhase, StreamerConfig, WindowScheduler};
use clickstream_test_helpers::{user, users, RecordingTransport, ScriptedGenerator};
use clickstream_types::{Timestamp, MILLIS_PER_DAY};
use clickstream_workload::{UserFactory, UserPool, WorkloadConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ten daily-active users, one session each, all starting in the first minute.
fn config(poll_ms: u64) -> StreamerConfig {
    let workload = WorkloadConfig::default()
        .with_dau_choices(vec![10])
        .with_new_users_per_day(0)
        .with_session_count_choices(vec![1])
        .with_only_hour(0)
        .with_visit_minute_choices(vec![0]);
    StreamerConfig::new("shop")
        .with_window_length(Duration::from_secs(60))
        .with_flush_grace(Duration::ZERO)
        .with_poll_interval(Duration::from_millis(poll_ms))
        .with_shards(3)
        .with_seed(7)
        .with_workload(workload)
}

struct Harness {
    scheduler: WindowScheduler,
    transport: Arc<RecordingTransport>,
    generator: Arc<ScriptedGenerator>,
}

fn harness(config: StreamerConfig, generator: ScriptedGenerator) -> Harness {
    harness_at(Timestamp::ZERO, config, generator)
}

fn harness_at(origin: Timestamp, config: StreamerConfig, generator: ScriptedGenerator) -> Harness {
    let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(origin));
    let transport = Arc::new(RecordingTransport::new(Arc::clone(&clock)));
    let generator = Arc::new(generator);
    let content: Arc<dyn ContentGenerator> = generator.clone();
    let pool = UserPool::from_users(UserFactory::new(), users(10));
    let scheduler = WindowScheduler::new(config, pool, content, transport.clone(), clock)
        .expect("valid configuration");
    Harness {
        scheduler,
        transport,
        generator,
    }
}

#[tokio::test(start_paused = true)]
async fn test_events_arrive_on_poll_ticks() {
    let mut h = harness(config(20_000), ScriptedGenerator::at(&[10_000, 30_000, 50_000]));

    let summary = h.scheduler.run_window().await;
    assert_eq!(summary.population, 10);
    assert_eq!(summary.tasks, 3);
    assert_eq!(summary.active_users, 10);
    assert_eq!(summary.generated_events, 30);
    assert_eq!(summary.carried_out, 0);
    assert_eq!(h.scheduler.phase(), SchedulerPhase::WaitingForShards);

    for user in h.scheduler.active_users() {
        let deliveries = h.transport.deliveries_for(user.id);
        let arrivals: Vec<u64> = deliveries.iter().map(|d| d.delivered_at.as_millis()).collect();
        assert_eq!(arrivals, vec![20_000, 40_000, 60_000]);
        assert_eq!(user.sent_events(), 3);
        assert_eq!(user.unsent_events(), 0);
    }

    let stats = h.scheduler.stats().snapshot();
    assert_eq!(stats.sent_events, 30);
    assert_eq!(stats.deliveries, 30);
    assert!(h.scheduler.carry_forward().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sequence_ids_are_unique_and_increasing_per_user() {
    let mut h = harness(config(20_000), ScriptedGenerator::at(&[10_000, 30_000, 50_000]));
    h.scheduler.run_window().await;

    let deliveries = h.transport.deliveries();
    let mut ids: Vec<u64> = deliveries.iter().map(|d| d.sequence_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), deliveries.len());

    for user in h.scheduler.active_users() {
        let ids: Vec<u64> = h
            .transport
            .deliveries_for(user.id)
            .iter()
            .map(|d| d.sequence_id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test(start_paused = true)]
async fn test_missed_events_carry_into_next_window() {
    let mut h = harness(config(25_000), ScriptedGenerator::at(&[10_000, 30_000, 55_000]));

    // Ticks at 0, 25s and 50s; the 55s events miss the deadline.
    let first = h.scheduler.run_window().await;
    assert_eq!(first.carried_out, 10);
    assert_eq!(h.scheduler.carry_forward().len(), 10);
    for user in h.scheduler.active_users() {
        let carried = h.scheduler.carry_forward().get(&user.id).unwrap();
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].timestamp, Timestamp(55_000));
    }

    // The next window is contiguous and starts with the carried events.
    let report = h.scheduler.run_windows(1).await;
    assert!(h.scheduler.carry_forward().is_empty());
    assert_eq!(report.pending_carry, 0);
    assert_eq!(report.stats.windows, 2);

    for user in h.scheduler.active_users() {
        let deliveries = h.transport.deliveries_for(user.id);
        let timestamps: Vec<Timestamp> = deliveries.iter().flat_map(|d| d.timestamps.clone()).collect();
        assert_eq!(
            timestamps,
            vec![Timestamp(10_000), Timestamp(30_000), Timestamp(55_000)]
        );
        // Delivered on the first tick of the second window.
        assert_eq!(deliveries[2].delivered_at, Timestamp(75_000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_events_beyond_the_window_are_dropped() {
    let mut h = harness(config(20_000), ScriptedGenerator::at(&[10_000, 70_000]));

    let summary = h.scheduler.run_window().await;
    assert_eq!(summary.generated_events, 10);
    assert_eq!(summary.carried_out, 0);

    let stats = h.scheduler.stats().snapshot();
    assert_eq!(stats.truncated_events, 10);
    assert_eq!(stats.sent_events, 10);
    assert!(h
        .transport
        .deliveries()
        .iter()
        .all(|d| d.timestamps == vec![Timestamp(10_000)]));
}

#[tokio::test(start_paused = true)]
async fn test_failed_shard_does_not_stall_the_others() {
    let failing = user(1).id;
    let generator = ScriptedGenerator::at(&[10_000, 30_000, 50_000]).failing_for(failing);
    let mut h = harness(config(20_000), generator);

    let summary = h.scheduler.run_window().await;
    assert_eq!(summary.failed_shards, 1);
    assert_eq!(h.scheduler.stats().snapshot().failed_shards, 1);
    assert!(h.transport.deliveries_for(failing).is_empty());

    // Shards hold three or four users; the failed one takes its whole shard.
    let delivered: Vec<_> = h
        .scheduler
        .active_users()
        .iter()
        .filter(|u| !h.transport.deliveries_for(u.id).is_empty())
        .collect();
    assert!(delivered.len() == 6 || delivered.len() == 7);
    for user in delivered {
        assert_eq!(user.sent_events(), 3);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_is_checked_between_windows() {
    let mut h = harness(config(20_000), ScriptedGenerator::at(&[10_000, 30_000, 50_000]));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        // Lands in the middle of the second window.
        tokio::time::sleep(Duration::from_secs(100)).await;
        trigger.cancel();
    });

    let report = h.scheduler.run_until_cancelled(cancel).await;
    assert_eq!(report.stats.windows, 2);
    assert_eq!(report.stats.failed_shards, 0);
    assert!(report.lag.has_measurements());
}

#[tokio::test(start_paused = true)]
async fn test_carry_survives_day_rollover() {
    // Start one minute before midnight with one active user per day; the
    // 23:59:55 event misses the deadline and lands in the next day's window.
    let origin = Timestamp(MILLIS_PER_DAY - 60_000);
    let base = config(25_000).with_workload(
        config(25_000)
            .workload
            .with_dau_choices(vec![1])
            .with_only_hour(23)
            .with_visit_minute_choices(vec![59]),
    );
    let generator = ScriptedGenerator::at(&[
        origin.as_millis() + 10_000,
        origin.as_millis() + 55_000,
    ]);
    let mut h = harness_at(origin, base, generator);

    h.scheduler.run_window().await;
    assert_eq!(h.scheduler.carry_forward().event_count(), 1);
    let carried_user = *h.scheduler.carry_forward().users().next().unwrap();

    let summary = h.scheduler.run_window().await;
    let orphaned = h.scheduler.active_users()[0].id != carried_user;
    // A carried user missing from the new day's population gets an extra
    // carry-only task.
    assert_eq!(summary.tasks, 1 + usize::from(orphaned));
    assert_eq!(summary.carried_in, 1);
    assert_eq!(summary.generated_events, 0);
    assert!(h.scheduler.carry_forward().is_empty());

    let deliveries = h.transport.deliveries_for(carried_user);
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[1].timestamps, vec![Timestamp(origin.as_millis() + 55_000)]);
    assert_eq!(deliveries[1].delivered_at, Timestamp(origin.as_millis() + 75_000));
}

#[tokio::test(start_paused = true)]
async fn test_failed_shard_returns_carried_events() {
    let mut h = harness(config(25_000), ScriptedGenerator::at(&[10_000, 30_000, 55_000]));

    let first = h.scheduler.run_window().await;
    assert_eq!(first.carried_out, 10);

    // Jump to the next day so the following window generates sessions again,
    // and make one shard's generation fail there.
    tokio::time::sleep(Duration::from_millis(MILLIS_PER_DAY - 75_000)).await;
    h.generator.fail_for(user(1).id);

    let failed = h.scheduler.run_window().await;
    assert_eq!(failed.failed_shards, 1);
    // The failed shard's users keep their carried events for the next window.
    let returned = h.scheduler.carry_forward().len();
    assert!(returned == 3 || returned == 4);
    assert_eq!(failed.carried_out, returned);
    assert!(h.scheduler.carry_forward().get(&user(1).id).is_some());

    // Nothing new falls inside the third window, so the generator is not
    // consulted and the returned events go out.
    let third = h.scheduler.run_window().await;
    assert_eq!(third.failed_shards, 0);
    assert_eq!(third.carried_in, returned);
    assert!(h.scheduler.carry_forward().is_empty());

    for user in h.scheduler.active_users() {
        let late: usize = h
            .transport
            .deliveries_for(user.id)
            .iter()
            .flat_map(|d| d.timestamps.iter())
            .filter(|ts| **ts == Timestamp(55_000))
            .count();
        assert_eq!(late, 1, "user {} lost or repeated its carried event", user.id);
    }
}

#[tokio::test(start_paused = true)]
async fn test_pool_grows_when_the_day_rolls_over() {
    let origin = Timestamp(MILLIS_PER_DAY - 60_000);
    let base = config(20_000);
    let workload = base.workload.clone().with_new_users_per_day(2);
    let mut h = harness_at(
        origin,
        base.with_workload(workload),
        ScriptedGenerator::at(&[10_000]),
    );

    h.scheduler.run_window().await;
    assert_eq!(h.scheduler.pool().len(), 10);

    h.scheduler.run_window().await;
    assert_eq!(h.scheduler.pool().len(), 12);
    assert_eq!(h.scheduler.active_users().len(), 10);
}
