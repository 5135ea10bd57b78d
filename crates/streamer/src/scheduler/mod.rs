//! Window scheduler.
//!
//! Drives the real-time loop one window at a time:
//!
//! 1. **Building**: roll the simulated day if needed (grow the pool, resample
//!    the daily-active users) and partition them into shards
//! 2. **Dispatching**: spawn one build-and-pace task per shard; each shard
//!    receives its users' carried events to prepend
//! 3. **Merging carry-over**: carried users outside today's population get one
//!    extra carry-only task ending with the current window
//! 4. **Waiting for shards**: join every task of the window; their leftovers
//!    become the next window's carry-forward set
//!
//! Tasks take a permit from a `K + 1` semaphore, so the carry-only task never
//! waits behind a full set of shards.

mod stats;

pub use stats::{SchedulerStats, StatsSnapshot, StreamerReport};

use crate::builder::{BuildError, BuildSummary, ShardInput, WindowEventBuilder, WindowWorkload};
use crate::carry::{CarriedEvents, CarryForwardSet};
use crate::config::{ConfigError, StreamerConfig};
use crate::lag::LagTracker;
use crate::pacer::DeliveryPacer;
use crate::partition::partition;
use crate::window::Window;
use clickstream_core::{Clock, ContentGenerator, DeliveryTransport, SequenceCounter};
use clickstream_types::{ShardId, SimDay, User, WindowIndex};
use clickstream_workload::{Choice, SessionPlanner, UserPool};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where the scheduler is within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Building,
    Dispatching,
    MergingCarryover,
    WaitingForShards,
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerPhase::Building => "building",
            SchedulerPhase::Dispatching => "dispatching",
            SchedulerPhase::MergingCarryover => "merging-carryover",
            SchedulerPhase::WaitingForShards => "waiting-for-shards",
        };
        f.write_str(name)
    }
}

/// Result of one shard task.
struct ShardOutcome {
    summary: BuildSummary,
    carried: Vec<CarriedEvents>,
}

/// Why a shard task produced no outcome.
enum ShardFailure {
    /// The generator failed; carried events come back with the error.
    Build(BuildError),
    /// The build step panicked; its inputs are gone.
    BuildPanicked(JoinError),
}

type ShardResult = (ShardId, Result<ShardOutcome, ShardFailure>);

/// What a shard task was handed, for failure reports.
#[derive(Debug, Clone, Copy)]
struct ShardLoad {
    users: usize,
    carried_events: usize,
}

/// Per-window summary, logged and returned by [`WindowScheduler::run_window`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSummary {
    pub index: WindowIndex,
    /// Daily-active users considered for the window.
    pub population: usize,
    /// Shard tasks spawned, including the carry-only task.
    pub tasks: usize,
    /// Users with events in the window.
    pub active_users: usize,
    pub generated_events: usize,
    /// Carried events delivered into this window.
    pub carried_in: usize,
    /// Events left for the next window.
    pub carried_out: usize,
    pub failed_shards: usize,
}

/// Errors that stop the scheduler from starting.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workload configuration error: {0}")]
    Workload(#[from] clickstream_workload::ConfigError),
}

/// Real-time windowed generator and streamer.
pub struct WindowScheduler {
    config: StreamerConfig,
    pool: UserPool,
    active: Vec<Arc<User>>,
    current_day: Option<SimDay>,
    dau: Choice<usize>,
    builder: WindowEventBuilder,
    pacer: DeliveryPacer,
    clock: Arc<dyn Clock>,
    stats: Arc<SchedulerStats>,
    lag: LagTracker,
    workers: Arc<Semaphore>,
    carry: CarryForwardSet,
    last_window: Option<Window>,
    phase: SchedulerPhase,
    rng: ChaCha8Rng,
}

impl WindowScheduler {
    /// Create a scheduler over `pool`.
    pub fn new(
        config: StreamerConfig,
        pool: UserPool,
        generator: Arc<dyn ContentGenerator>,
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let planner = Arc::new(SessionPlanner::from_config(&config.workload)?);
        let dau = Choice::new(config.workload.dau_choices.clone())
            .ok_or(clickstream_workload::ConfigError::EmptyChoices("dau_choices"))?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let stats = Arc::new(SchedulerStats::default());
        let lag = LagTracker::new();
        let sequence = Arc::new(SequenceCounter::with_log_every(config.progress_every));
        let pacer = DeliveryPacer::new(
            transport,
            Arc::clone(&clock),
            sequence,
            config.poll_interval,
            config.flush_grace,
        )
        .with_stats(Arc::clone(&stats))
        .with_lag_tracker(lag.clone());

        Ok(Self {
            workers: Arc::new(Semaphore::new(config.shards + 1)),
            config,
            pool,
            active: Vec::new(),
            current_day: None,
            dau,
            builder: WindowEventBuilder::new(planner, generator),
            pacer,
            clock,
            stats,
            lag,
            carry: CarryForwardSet::new(),
            last_window: None,
            phase: SchedulerPhase::Building,
            rng,
        })
    }

    /// Run windows until `cancel` fires. Cancellation is checked between
    /// windows; a window in progress always runs to its grace deadline.
    pub async fn run_until_cancelled(&mut self, cancel: CancellationToken) -> StreamerReport {
        let started = Instant::now();
        info!(
            shards = self.config.shards,
            window_secs = self.config.window_length.as_secs(),
            poll_secs = self.config.poll_interval.as_secs(),
            grace_secs = self.config.flush_grace.as_secs(),
            users = self.pool.len(),
            "Starting streamer"
        );

        while !cancel.is_cancelled() {
            self.run_window().await;
        }

        self.report(started)
    }

    /// Run exactly `count` windows.
    pub async fn run_windows(&mut self, count: u64) -> StreamerReport {
        let started = Instant::now();
        for _ in 0..count {
            self.run_window().await;
        }
        self.report(started)
    }

    /// Run one window through every phase.
    pub async fn run_window(&mut self) -> WindowSummary {
        self.phase = SchedulerPhase::Building;
        let window = self.next_window();
        self.refresh_population(window.start.day());

        let population = self.active.len();
        let shards = partition(self.active.clone(), self.config.shards);
        let mut tasks = JoinSet::new();
        let mut loads = BTreeMap::new();
        let mut summary = WindowSummary {
            index: window.index,
            population,
            ..WindowSummary::default()
        };

        self.phase = SchedulerPhase::Dispatching;
        for (i, users) in shards.into_iter().enumerate() {
            let inputs: Vec<ShardInput> = users
                .into_iter()
                .map(|user| ShardInput {
                    carried: self.carry.take(&user.id).unwrap_or_default(),
                    user,
                })
                .collect();
            let load = self.spawn_shard(&mut tasks, ShardId(i), window, inputs, true);
            loads.insert(ShardId(i), load);
        }

        self.phase = SchedulerPhase::MergingCarryover;
        let orphans = self.carry.drain();
        if !orphans.is_empty() {
            info!(
                window = %window.index,
                users = orphans.len(),
                "Dispatching carry-forward task"
            );
            let inputs = orphans.into_iter().map(ShardInput::from).collect();
            let load = self.spawn_shard(&mut tasks, ShardId::CARRY_FORWARD, window, inputs, false);
            loads.insert(ShardId::CARRY_FORWARD, load);
        }
        summary.tasks = tasks.len();

        self.phase = SchedulerPhase::WaitingForShards;
        while let Some(joined) = tasks.join_next().await {
            let (shard, result) = match joined {
                Ok(joined) => joined,
                // Which shard panicked is known once every other task has reported.
                Err(e) => {
                    error!(window = %window.index, error = %e, "Shard task panicked");
                    summary.failed_shards += 1;
                    SchedulerStats::add(&self.stats.failed_shards, 1);
                    continue;
                }
            };
            let load = loads.remove(&shard);

            match result {
                Ok(outcome) => {
                    summary.active_users += outcome.summary.active_users;
                    summary.generated_events += outcome.summary.generated_events;
                    summary.carried_in += outcome.summary.carried_events;
                    self.carry.absorb(outcome.carried);
                }
                Err(ShardFailure::Build(failure)) => {
                    summary.failed_shards += 1;
                    SchedulerStats::add(&self.stats.failed_shards, 1);
                    error!(
                        window = %window.index,
                        shard = %shard,
                        users = load.map_or(0, |l| l.users),
                        returned_events = failure.carried_events(),
                        error = %failure.source,
                        "Shard task failed, carried events returned"
                    );
                    self.carry.absorb(failure.carried);
                }
                Err(ShardFailure::BuildPanicked(e)) => {
                    summary.failed_shards += 1;
                    SchedulerStats::add(&self.stats.failed_shards, 1);
                    error!(
                        window = %window.index,
                        shard = %shard,
                        users = load.map_or(0, |l| l.users),
                        lost_events = load.map_or(0, |l| l.carried_events),
                        error = %e,
                        "Shard build panicked"
                    );
                }
            }
        }

        // Shards that never reported are the ones whose task panicked.
        for (shard, load) in loads {
            error!(
                window = %window.index,
                shard = %shard,
                users = load.users,
                lost_events = load.carried_events,
                "Shard task lost with its carried events"
            );
        }

        summary.carried_out = self.carry.event_count();
        SchedulerStats::add(&self.stats.carried_events, summary.carried_out as u64);
        SchedulerStats::add(&self.stats.windows, 1);
        self.last_window = Some(window);

        info!(
            window = %window.index,
            start = %window.start,
            population = summary.population,
            users = summary.active_users,
            events = summary.generated_events,
            carried_in = summary.carried_in,
            carried_out = summary.carried_out,
            failed_shards = summary.failed_shards,
            "Window complete"
        );
        summary
    }

    fn spawn_shard(
        &mut self,
        tasks: &mut JoinSet<ShardResult>,
        shard: ShardId,
        window: Window,
        inputs: Vec<ShardInput>,
        generate: bool,
    ) -> ShardLoad {
        let load = ShardLoad {
            users: inputs.len(),
            carried_events: inputs.iter().map(|i| i.carried.len()).sum(),
        };
        let builder = self.builder.clone();
        let pacer = self.pacer.clone();
        let stats = Arc::clone(&self.stats);
        let workers = Arc::clone(&self.workers);
        let mut rng = ChaCha8Rng::seed_from_u64(self.rng.gen());

        tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = workers.acquire_owned().await;

            let (workload, summary) = if generate {
                // Session generation is CPU-bound; keep it off the pacers' workers.
                let built =
                    tokio::task::spawn_blocking(move || builder.build(&window, inputs, &mut rng))
                        .await;
                match built {
                    Ok(Ok(built)) => built,
                    Ok(Err(failure)) => return (shard, Err(ShardFailure::Build(failure))),
                    Err(e) => return (shard, Err(ShardFailure::BuildPanicked(e))),
                }
            } else {
                let workload = WindowWorkload::from_carried(inputs);
                let summary = BuildSummary {
                    active_users: workload.members.len(),
                    carried_events: load.carried_events,
                    ..BuildSummary::default()
                };
                (workload, summary)
            };
            SchedulerStats::add(&stats.generated_events, summary.generated_events as u64);
            SchedulerStats::add(&stats.truncated_events, summary.truncated_events as u64);

            let outcome = pacer.run(shard, workload, window.end).await;
            (
                shard,
                Ok(ShardOutcome {
                    summary,
                    carried: outcome.carried,
                }),
            )
        });
        load
    }

    /// The next window: contiguous with the last one unless we fell more than
    /// a window behind.
    fn next_window(&self) -> Window {
        let now = self.clock.now();
        match self.last_window {
            None => Window::new(WindowIndex(0), now, self.config.window_length),
            Some(last) => {
                let (next, restarted) = last.successor(now);
                if restarted {
                    warn!(
                        window = %next.index,
                        behind_ms = now.as_millis().saturating_sub(last.end.as_millis()),
                        "Fell behind by more than a window, restarting at now"
                    );
                }
                next
            }
        }
    }

    /// Grow the pool and resample daily-active users when the day changes.
    fn refresh_population(&mut self, today: SimDay) {
        if self.current_day == Some(today) {
            return;
        }

        if self.current_day.is_some() && self.config.workload.new_users_per_day > 0 {
            let total = self
                .pool
                .grow(self.config.workload.new_users_per_day, &mut self.rng);
            info!(day = %today, users = total, "Acquired new users");
        }

        let dau = *self.dau.sample(&mut self.rng);
        self.active = self.pool.sample(dau, &mut self.rng);
        self.current_day = Some(today);
        info!(day = %today, dau = self.active.len(), "Sampled daily active users");
    }

    /// Report over everything run so far.
    pub fn report(&self, started: Instant) -> StreamerReport {
        StreamerReport {
            duration: started.elapsed(),
            stats: self.stats.snapshot(),
            pending_carry: self.carry.event_count(),
            lag: self.lag.report(),
        }
    }

    /// Shared counters.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Events waiting for the next window.
    pub fn carry_forward(&self) -> &CarryForwardSet {
        &self.carry
    }

    /// Today's daily-active users.
    pub fn active_users(&self) -> &[Arc<User>] {
        &self.active
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn pool(&self) -> &UserPool {
        &self.pool
    }
}
