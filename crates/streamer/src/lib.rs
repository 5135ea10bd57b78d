//! Real-time clickstream streamer.
//!
//! Generates synthetic app sessions and delivers their events to an HTTP
//! ingestion endpoint at the moment each event "happens".
//!
//! # Architecture
//!
//! - **Scheduler**: cuts time into fixed windows and runs them back to back
//! - **Partitioning**: splits the daily-active users into balanced shards
//! - **Builder**: generates each shard's sessions and keeps in-window events
//! - **Pacer**: releases due events per user on a fixed poll interval
//! - **Carry-forward**: hands events missed at a deadline to the next window
//! - **Backfill**: bulk generation of past days without pacing
//! - **Client**: HTTP transport for the ingestion endpoint
//!
//! # Example
//!
//! ```no_run
//! use clickstream_core::SystemClock;
//! use clickstream_streamer::{IngestClient, StreamerConfig, WindowScheduler};
//! use clickstream_workload::{ShoppingSessionGenerator, UserFactory, UserPool};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamerConfig::new("shop").with_shards(4);
//! let generator = Arc::new(ShoppingSessionGenerator::new("shop", &config.workload));
//! let transport = Arc::new(IngestClient::new(config.endpoint.clone(), "shop")?);
//! let mut rng = rand::thread_rng();
//! let pool = UserPool::generate(UserFactory::new(), config.workload.initial_users, &mut rng);
//!
//! let mut scheduler =
//!     WindowScheduler::new(config, pool, generator, transport, Arc::new(SystemClock))?;
//! let report = scheduler.run_until_cancelled(CancellationToken::new()).await;
//! report.print();
//! # Ok(())
//! # }
//! ```

pub mod backfill;
pub mod builder;
pub mod carry;
pub mod client;
pub mod config;
pub mod lag;
pub mod pacer;
pub mod partition;
pub mod scheduler;
pub mod window;

pub use backfill::{Backfill, BackfillReport};
pub use builder::{BuildError, BuildSummary, ShardInput, WindowEventBuilder, WindowWorkload};
pub use carry::{CarriedEvents, CarryForwardSet};
pub use client::{DryRunTransport, IngestClient, IngestParams, RpcError};
pub use config::{BackfillConfig, ConfigError, StreamerConfig};
pub use lag::{LagReport, LagTracker};
pub use pacer::{DeliveryPacer, PacerOutcome};
pub use partition::partition;
pub use scheduler::{
    SchedulerError, SchedulerPhase, SchedulerStats, StatsSnapshot, StreamerReport, WindowScheduler,
    WindowSummary,
};
pub use window::Window;
