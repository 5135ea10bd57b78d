//! Bulk backfill.
//!
//! Generates whole past days at once and delivers them as mixed-user batches,
//! without pacing. The pool starts at a quarter of `all_users` and gains a
//! fortieth of it every day.

use crate::config::{BackfillConfig, StreamerConfig};
use crate::scheduler::SchedulerError;
use clickstream_core::{ContentGenerator, DeliveryBatch, DeliveryTransport, GenerationError, SequenceCounter};
use clickstream_types::{Event, SimDay};
use clickstream_workload::{Choice, SessionPlanner, UserFactory, UserPool};
use futures::future::join_all;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Totals from a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Days generated.
    pub days: u64,
    /// Events generated and handed to the transport.
    pub events: u64,
    /// Deliveries attempted.
    pub deliveries: u64,
    /// Deliveries the transport rejected.
    pub failed_deliveries: u64,
    /// Users whose sessions could not be generated.
    pub failed_users: u64,
    /// Final pool size.
    pub users: usize,
    pub duration: Duration,
}

impl BackfillReport {
    /// Print the report to stdout.
    pub fn print(&self) {
        println!("\n=== Backfill Report ===");
        println!("Duration: {:?}", self.duration);
        println!("Days: {}", self.days);
        println!("Users: {}", self.users);
        println!("Events: {}", self.events);
        println!("Deliveries: {}", self.deliveries);
        println!("Failed deliveries: {}", self.failed_deliveries);
        println!("Failed users: {}", self.failed_users);
    }
}

/// Day-by-day bulk generator.
pub struct Backfill {
    config: BackfillConfig,
    new_users_per_day: usize,
    pool: UserPool,
    dau: Choice<usize>,
    planner: SessionPlanner,
    generator: Arc<dyn ContentGenerator>,
    transport: Arc<dyn DeliveryTransport>,
    sequence: SequenceCounter,
    rng: ChaCha8Rng,
}

impl Backfill {
    /// Create a backfill runner with a freshly generated pool.
    pub fn new(
        config: &StreamerConfig,
        generator: Arc<dyn ContentGenerator>,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let all_users = config.backfill.all_users;
        let pool = UserPool::generate(UserFactory::new(), all_users / 4, &mut rng);
        let dau = Choice::new(config.workload.dau_choices.clone())
            .ok_or(clickstream_workload::ConfigError::EmptyChoices("dau_choices"))?;

        Ok(Self {
            config: config.backfill.clone(),
            new_users_per_day: all_users / 40,
            pool,
            dau,
            planner: SessionPlanner::from_config(&config.workload)?,
            generator,
            transport,
            sequence: SequenceCounter::with_log_every(config.progress_every),
            rng,
        })
    }

    /// Generate and deliver the configured number of days before `today`.
    pub async fn run(&mut self, today: SimDay) -> BackfillReport {
        let started = Instant::now();
        let mut report = BackfillReport::default();

        for day in today.preceding(self.config.days) {
            self.run_day(day, &mut report).await;
            report.days += 1;
        }

        report.users = self.pool.len();
        report.duration = started.elapsed();
        info!(
            days = report.days,
            events = report.events,
            deliveries = report.deliveries,
            "Backfill finished"
        );
        report
    }

    async fn run_day(&mut self, day: SimDay, report: &mut BackfillReport) {
        let day_started = Instant::now();
        self.pool.grow(self.new_users_per_day, &mut self.rng);
        let dau = *self.dau.sample(&mut self.rng);
        let users = self.pool.sample(dau, &mut self.rng);
        info!(day = %day, dau = users.len(), pool = self.pool.len(), "Starting day");

        let threshold = self.config.flush_threshold();
        let mut buffer: Vec<Event> = Vec::new();
        let mut day_events = 0u64;

        for (handled, user) in users.iter().enumerate() {
            if let Err(e) = self.generate_user_day(user, day, &mut buffer) {
                report.failed_users += 1;
                error!(day = %day, user = %user.id, error = %e, "Session generation failed");
            }

            if buffer.len() > threshold {
                info!(
                    day = %day,
                    users = users.len(),
                    left = users.len() - handled - 1,
                    "Flushing buffered events"
                );
                day_events += buffer.len() as u64;
                self.flush(std::mem::take(&mut buffer), report).await;
            }
        }

        if !buffer.is_empty() {
            day_events += buffer.len() as u64;
            self.flush(buffer, report).await;
        }

        info!(
            day = %day,
            events = day_events,
            elapsed_ms = day_started.elapsed().as_millis() as u64,
            "Day delivered"
        );
    }

    fn generate_user_day(
        &mut self,
        user: &clickstream_types::User,
        day: SimDay,
        buffer: &mut Vec<Event>,
    ) -> Result<(), GenerationError> {
        let starts = self.planner.plan_day(day.start(), &mut self.rng);
        for start in starts {
            user.set_current_timestamp(start);
            self.generator
                .generate_session(user, start, &mut self.rng, buffer)?;
        }
        Ok(())
    }

    /// Deliver `events` in `events_per_request` chunks, all in flight at once.
    async fn flush(&self, mut events: Vec<Event>, report: &mut BackfillReport) {
        events.sort_by_key(|e| e.timestamp);
        let chunks: Vec<&[Event]> = events.chunks(self.config.events_per_request).collect();

        let results = join_all(chunks.iter().map(|chunk| {
            let batch = DeliveryBatch::bulk(chunk, self.sequence.next_id());
            self.transport.deliver(batch)
        }))
        .await;

        for (chunk, result) in chunks.iter().zip(results) {
            report.deliveries += 1;
            report.events += chunk.len() as u64;
            if let Err(e) = result {
                report.failed_deliveries += 1;
                warn!(events = chunk.len(), error = %e, "Bulk delivery failed");
            }
        }
    }
}
