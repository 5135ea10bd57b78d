//! Streamer configuration.
//!
//! [`StreamerConfig`] is the in-memory form used by the scheduler and the
//! backfill runner. [`ConfigFile`] is its TOML representation, where
//! durations are plain numbers in the unit the field name says.

use clickstream_workload::WorkloadConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/collect";

/// Configuration for the bulk backfill path.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackfillConfig {
    /// Number of days to generate, ending yesterday.
    pub days: u64,

    /// Events per delivery.
    pub events_per_request: usize,

    /// Deliveries that may be in flight at once.
    pub max_batch_requests: usize,

    /// Population the backfill starts from and grows towards.
    pub all_users: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            days: 30,
            events_per_request: 10_000,
            max_batch_requests: 20,
            all_users: 100_000,
        }
    }
}

impl BackfillConfig {
    /// Buffered event count above which a day's events are flushed early.
    pub fn flush_threshold(&self) -> usize {
        self.events_per_request
            .saturating_mul(self.max_batch_requests.saturating_sub(1))
    }
}

/// Configuration for a streaming run.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamerConfig {
    /// Length of one generation window.
    pub window_length: Duration,

    /// How long a shard keeps pacing after its window ends.
    pub flush_grace: Duration,

    /// Interval between pacing ticks.
    pub poll_interval: Duration,

    /// Number of shards (and workers) per window.
    pub shards: usize,

    /// Application id sent with every request.
    pub app_id: String,

    /// Ingestion endpoint URL.
    pub endpoint: String,

    /// Seed for the scheduler's RNG. Random when unset.
    pub seed: Option<u64>,

    /// Gzip request bodies.
    pub gzip: bool,

    /// Deliveries between sequence progress log lines.
    pub progress_every: u64,

    /// Population and session distributions.
    pub workload: WorkloadConfig,

    /// Bulk backfill settings.
    pub backfill: BackfillConfig,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            window_length: Duration::from_secs(10 * 60),
            flush_grace: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            shards: 10,
            app_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            seed: None,
            gzip: false,
            progress_every: 100,
            workload: WorkloadConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl StreamerConfig {
    /// Create a configuration for `app_id` with default settings.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    /// Set the window length.
    pub fn with_window_length(mut self, length: Duration) -> Self {
        self.window_length = length;
        self
    }

    /// Set the flush grace period.
    pub fn with_flush_grace(mut self, grace: Duration) -> Self {
        self.flush_grace = grace;
        self
    }

    /// Set the pacing interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the shard count.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the ingestion endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Fix the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable gzip request bodies.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the workload configuration.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    /// Set the backfill configuration.
    pub fn with_backfill(mut self, backfill: BackfillConfig) -> Self {
        self.backfill = backfill;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_length.is_zero() {
            return Err(ConfigError::Invalid("window_length must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval must be positive".into()));
        }
        if self.shards == 0 {
            return Err(ConfigError::Invalid("shards must be at least 1".into()));
        }
        if self.backfill.events_per_request == 0 || self.backfill.max_batch_requests == 0 {
            return Err(ConfigError::Invalid(
                "backfill batch sizes must be at least 1".into(),
            ));
        }
        self.workload.validate()?;
        Ok(())
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&text)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.into())
    }
}

/// On-disk configuration layout.
///
/// ```toml
/// app_id = "shop"
/// endpoint = "https://ingest.example.com/collect"
/// window_minutes = 10
/// flush_grace_secs = 10
/// poll_interval_secs = 10
/// shards = 10
/// gzip = true
///
/// [workload]
/// dau_choices = [180, 200, 220]
///
/// [backfill]
/// days = 7
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub app_id: String,
    pub endpoint: String,
    pub window_minutes: u64,
    pub flush_grace_secs: u64,
    pub poll_interval_secs: u64,
    pub shards: usize,
    pub seed: Option<u64>,
    pub gzip: bool,
    pub progress_every: u64,
    pub workload: WorkloadConfig,
    pub backfill: BackfillConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let defaults = StreamerConfig::default();
        Self {
            app_id: defaults.app_id,
            endpoint: defaults.endpoint,
            window_minutes: defaults.window_length.as_secs() / 60,
            flush_grace_secs: defaults.flush_grace.as_secs(),
            poll_interval_secs: defaults.poll_interval.as_secs(),
            shards: defaults.shards,
            seed: defaults.seed,
            gzip: defaults.gzip,
            progress_every: defaults.progress_every,
            workload: defaults.workload,
            backfill: defaults.backfill,
        }
    }
}

impl From<ConfigFile> for StreamerConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            window_length: Duration::from_secs(file.window_minutes * 60),
            flush_grace: Duration::from_secs(file.flush_grace_secs),
            poll_interval: Duration::from_secs(file.poll_interval_secs),
            shards: file.shards,
            app_id: file.app_id,
            endpoint: file.endpoint,
            seed: file.seed,
            gzip: file.gzip,
            progress_every: file.progress_every,
            workload: file.workload,
            backfill: file.backfill,
        }
    }
}

/// Configuration errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Workload configuration: {0}")]
    Workload(#[from] clickstream_workload::ConfigError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        StreamerConfig::new("shop").validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let config = StreamerConfig::new("shop").with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_workload_errors_are_wrapped() {
        let workload = WorkloadConfig::default().with_dau_choices(vec![]);
        let config = StreamerConfig::new("shop").with_workload(workload);
        assert!(matches!(config.validate(), Err(ConfigError::Workload(_))));
    }

    #[test]
    fn test_toml_units() {
        let config = StreamerConfig::from_toml(
            r#"
            app_id = "shop"
            window_minutes = 2
            flush_grace_secs = 5
            poll_interval_secs = 3
            shards = 4
            gzip = true

            [workload]
            initial_users = 40

            [backfill]
            days = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.app_id, "shop");
        assert_eq!(config.window_length, Duration::from_secs(120));
        assert_eq!(config.flush_grace, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.shards, 4);
        assert!(config.gzip);
        assert_eq!(config.workload.initial_users, 40);
        assert_eq!(config.backfill.days, 3);
        assert_eq!(config.backfill.events_per_request, 10_000);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_gzip_defaults_off() {
        assert!(!StreamerConfig::from_toml("app_id = \"shop\"").unwrap().gzip);
        assert!(StreamerConfig::new("shop").with_gzip(true).gzip);
    }

    #[test]
    fn test_flush_threshold() {
        let backfill = BackfillConfig {
            events_per_request: 100,
            max_batch_requests: 5,
            ..BackfillConfig::default()
        };
        assert_eq!(backfill.flush_threshold(), 400);
    }
}
