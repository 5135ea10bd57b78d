//! Clickstream Streamer CLI
//!
//! Streams synthetic app sessions to an ingestion endpoint in real time, or
//! backfills past days in bulk.

use clap::{Parser, Subcommand};
use clickstream_core::{Clock, DeliveryTransport, SystemClock};
use clickstream_streamer::{Backfill, DryRunTransport, IngestClient, StreamerConfig, WindowScheduler};
use clickstream_workload::{ShoppingSessionGenerator, UserFactory, UserPool};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clickstream-streamer")]
#[command(about = "Real-time synthetic clickstream generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by both subcommands.
#[derive(clap::Args)]
struct CommonArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ingestion endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Application id sent with every request
    #[arg(long)]
    app_id: Option<String>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Gzip request bodies
    #[arg(long)]
    gzip: bool,

    /// Log batches instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream events in real time until interrupted
    Stream {
        #[command(flatten)]
        common: CommonArgs,

        /// Window length (e.g., "10m", "30s")
        #[arg(short, long)]
        window: Option<humantime::Duration>,

        /// How long shards keep flushing after their window ends
        #[arg(long)]
        grace: Option<humantime::Duration>,

        /// Interval between pacing ticks
        #[arg(long)]
        poll: Option<humantime::Duration>,

        /// Number of shards per window
        #[arg(long)]
        shards: Option<usize>,

        /// Stop after this many windows
        #[arg(long)]
        windows: Option<u64>,
    },

    /// Generate and deliver past days in bulk
    Backfill {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of days before today to generate
        #[arg(long)]
        days: Option<u64>,
    },
}

fn load_config(common: &CommonArgs) -> Result<StreamerConfig, Box<dyn std::error::Error>> {
    let mut config = match &common.config {
        Some(path) => StreamerConfig::from_file(path)?,
        None => StreamerConfig::default(),
    };
    if let Some(endpoint) = &common.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(app_id) = &common.app_id {
        config.app_id = app_id.clone();
    }
    if let Some(seed) = common.seed {
        config = config.with_seed(seed);
    }
    if common.gzip {
        config = config.with_gzip(true);
    }
    if config.app_id.is_empty() {
        return Err("an app id is required (--app-id or `app_id` in the config file)".into());
    }
    Ok(config)
}

fn transport(
    config: &StreamerConfig,
    dry_run: bool,
) -> Result<Arc<dyn DeliveryTransport>, Box<dyn std::error::Error>> {
    if dry_run {
        info!("Dry run: batches are logged, not sent");
        Ok(Arc::new(DryRunTransport::new()))
    } else {
        Ok(Arc::new(
            IngestClient::new(config.endpoint.clone(), config.app_id.clone())?
                .with_gzip(config.gzip),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::Stream {
            common,
            window,
            grace,
            poll,
            shards,
            windows,
        } => {
            let mut config = load_config(&common)?;
            if let Some(window) = window {
                config = config.with_window_length(*window);
            }
            if let Some(grace) = grace {
                config = config.with_flush_grace(*grace);
            }
            if let Some(poll) = poll {
                config = config.with_poll_interval(*poll);
            }
            if let Some(shards) = shards {
                config = config.with_shards(shards);
            }

            let transport = transport(&config, common.dry_run)?;
            let generator = Arc::new(ShoppingSessionGenerator::new(
                config.app_id.clone(),
                &config.workload,
            ));
            let mut rng = match config.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            let pool = UserPool::generate(UserFactory::new(), config.workload.initial_users, &mut rng);
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);

            let mut scheduler = WindowScheduler::new(config, pool, generator, transport, clock)?;

            let report = match windows {
                Some(count) => scheduler.run_windows(count).await,
                None => {
                    let cancel = CancellationToken::new();
                    let on_signal = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            info!("Interrupt received, stopping after the current window");
                            on_signal.cancel();
                        }
                    });
                    scheduler.run_until_cancelled(cancel).await
                }
            };
            report.print();
        }

        Commands::Backfill { common, days } => {
            let mut config = load_config(&common)?;
            if let Some(days) = days {
                config.backfill.days = days;
            }

            let transport = transport(&config, common.dry_run)?;
            let generator = Arc::new(ShoppingSessionGenerator::new(
                config.app_id.clone(),
                &config.workload,
            ));

            let mut backfill = Backfill::new(&config, generator, transport)?;
            let today = SystemClock.now().day();
            println!("Backfilling {} days before {}...", config.backfill.days, today);
            let report = backfill.run(today).await;
            report.print();
        }
    }

    Ok(())
}
