//! Configuration for user population and session planning.

use serde::Deserialize;

/// Relative likelihood of a session starting in each hour of the day (UTC).
///
/// Quiet overnight, a morning commute bump, a lunch plateau and an evening
/// peak around 20:00.
pub const DEFAULT_HOUR_WEIGHTS: [u32; 24] = [
    3, 2, 1, 1, 1, 2, 4, 7, 9, 8, 7, 8, 10, 9, 7, 7, 8, 10, 12, 14, 15, 13, 9, 5,
];

/// Workload configuration.
///
/// Every `*_choices` list is a discrete distribution: each draw picks one
/// element uniformly, so repeating a value raises its probability.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Users created when the pool is first populated.
    pub initial_users: usize,

    /// Users added to the pool each time the simulated day rolls over.
    pub new_users_per_day: usize,

    /// Daily-active-user counts to draw from on each new day.
    pub dau_choices: Vec<usize>,

    /// Sessions-per-user-per-day counts to draw from.
    pub session_count_choices: Vec<u32>,

    /// 24 weights, one per hour, for the session start hour.
    pub visit_hour_weights: Vec<u32>,

    /// Minutes (0..60) a session start may fall on.
    pub visit_minute_choices: Vec<u32>,

    /// Upper bound on screens visited in one session.
    pub max_screens_per_session: usize,

    /// Minimum dwell time on one screen, in milliseconds.
    pub min_dwell_ms: u64,

    /// Maximum dwell time on one screen, in milliseconds.
    pub max_dwell_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            initial_users: 1_000,
            new_users_per_day: 25,
            dau_choices: vec![180, 200, 220, 250, 280],
            session_count_choices: vec![1, 1, 1, 2, 2, 3, 4],
            visit_hour_weights: DEFAULT_HOUR_WEIGHTS.to_vec(),
            visit_minute_choices: (0..60).collect(),
            max_screens_per_session: 50,
            min_dwell_ms: 1_000,
            max_dwell_ms: 30_000,
        }
    }
}

impl WorkloadConfig {
    /// Set the initial population size.
    pub fn with_initial_users(mut self, users: usize) -> Self {
        self.initial_users = users;
        self
    }

    /// Set the number of users acquired per simulated day.
    pub fn with_new_users_per_day(mut self, users: usize) -> Self {
        self.new_users_per_day = users;
        self
    }

    /// Set the daily-active-user distribution.
    pub fn with_dau_choices(mut self, choices: Vec<usize>) -> Self {
        self.dau_choices = choices;
        self
    }

    /// Set the sessions-per-day distribution.
    pub fn with_session_count_choices(mut self, choices: Vec<u32>) -> Self {
        self.session_count_choices = choices;
        self
    }

    /// Set the per-hour session start weights.
    pub fn with_visit_hour_weights(mut self, weights: Vec<u32>) -> Self {
        self.visit_hour_weights = weights;
        self
    }

    /// Set the session start minute distribution.
    pub fn with_visit_minute_choices(mut self, minutes: Vec<u32>) -> Self {
        self.visit_minute_choices = minutes;
        self
    }

    /// Pin every session start to one hour of the day.
    pub fn with_only_hour(self, hour: u32) -> Self {
        let weights = (0..24).map(|h| u32::from(h == hour)).collect();
        self.with_visit_hour_weights(weights)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dau_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("dau_choices"));
        }
        if self.session_count_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("session_count_choices"));
        }
        if self.visit_minute_choices.is_empty() {
            return Err(ConfigError::EmptyChoices("visit_minute_choices"));
        }
        if self.visit_hour_weights.len() != 24 {
            return Err(ConfigError::HourWeights(format!(
                "expected 24 weights, got {}",
                self.visit_hour_weights.len()
            )));
        }
        if self.visit_hour_weights.iter().all(|&w| w == 0) {
            return Err(ConfigError::HourWeights("all weights are zero".to_string()));
        }
        if let Some(&minute) = self.visit_minute_choices.iter().find(|&&m| m >= 60) {
            return Err(ConfigError::InvalidMinute(minute));
        }
        if self.max_screens_per_session == 0 {
            return Err(ConfigError::Invalid(
                "max_screens_per_session must be at least 1".to_string(),
            ));
        }
        if self.min_dwell_ms > self.max_dwell_ms {
            return Err(ConfigError::Invalid(format!(
                "min_dwell_ms ({}) exceeds max_dwell_ms ({})",
                self.min_dwell_ms, self.max_dwell_ms
            )));
        }
        Ok(())
    }
}

/// Workload configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Distribution `{0}` has no choices")]
    EmptyChoices(&'static str),

    #[error("Invalid visit hour weights: {0}")]
    HourWeights(String),

    #[error("Visit minute {0} is out of range 0..60")]
    InvalidMinute(u32),

    #[error("Invalid workload configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        WorkloadConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_empty_distributions() {
        let config = WorkloadConfig::default().with_dau_choices(vec![]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyChoices("dau_choices"))
        ));
    }

    #[test]
    fn test_rejects_bad_minutes_and_hours() {
        let config = WorkloadConfig::default().with_visit_minute_choices(vec![0, 60]);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMinute(60))));

        let config = WorkloadConfig::default().with_visit_hour_weights(vec![1; 23]);
        assert!(matches!(config.validate(), Err(ConfigError::HourWeights(_))));
    }

    #[test]
    fn test_only_hour_weights() {
        let config = WorkloadConfig::default().with_only_hour(5);
        assert_eq!(config.visit_hour_weights.iter().sum::<u32>(), 1);
        assert_eq!(config.visit_hour_weights[5], 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: WorkloadConfig = toml::from_str(
            r#"
            initial_users = 50
            dau_choices = [10, 20]
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_users, 50);
        assert_eq!(config.dau_choices, vec![10, 20]);
        assert_eq!(config.visit_minute_choices.len(), 60);
    }
}
