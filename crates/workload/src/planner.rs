//! Session start planning.
//!
//! Decides how many sessions a user has on a given day and when each one
//! starts. Start times are anchored to the day: an hour from the weighted
//! hour table, a minute from the minute choices, then second and millisecond
//! jitter.

use crate::config::{ConfigError, WorkloadConfig};
use crate::distribution::{Choice, WeightedTable};
use clickstream_types::Timestamp;
use rand::Rng;

const MILLIS_PER_HOUR: u64 = 60 * 60 * 1000;
const MILLIS_PER_MINUTE: u64 = 60 * 1000;

/// Draws session counts and day-anchored session start times.
#[derive(Clone, Debug)]
pub struct SessionPlanner {
    session_counts: Choice<u32>,
    hours: WeightedTable<u32>,
    minutes: Choice<u32>,
}

impl SessionPlanner {
    /// Build a planner from validated workload configuration.
    pub fn from_config(config: &WorkloadConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let session_counts = Choice::new(config.session_count_choices.clone())
            .ok_or(ConfigError::EmptyChoices("session_count_choices"))?;
        let hours = WeightedTable::new(
            config
                .visit_hour_weights
                .iter()
                .enumerate()
                .map(|(hour, &weight)| (hour as u32, weight))
                .collect(),
        )
        .ok_or_else(|| ConfigError::HourWeights("all weights are zero".to_string()))?;
        let minutes = Choice::new(config.visit_minute_choices.clone())
            .ok_or(ConfigError::EmptyChoices("visit_minute_choices"))?;

        Ok(Self {
            session_counts,
            hours,
            minutes,
        })
    }

    /// Number of sessions a user has today.
    pub fn session_count<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        *self.session_counts.sample(rng)
    }

    /// One candidate session start on the day beginning at `day_start`.
    pub fn session_start<R: Rng + ?Sized>(&self, day_start: Timestamp, rng: &mut R) -> Timestamp {
        let hour = u64::from(*self.hours.sample(rng));
        let minute = u64::from(*self.minutes.sample(rng));
        let second: u64 = rng.gen_range(0..60);
        let millis: u64 = rng.gen_range(0..1000);

        day_start.plus_millis(hour * MILLIS_PER_HOUR + minute * MILLIS_PER_MINUTE + second * 1000 + millis)
    }

    /// Every session start for one user on one day, ascending.
    pub fn plan_day<R: Rng + ?Sized>(&self, day_start: Timestamp, rng: &mut R) -> Vec<Timestamp> {
        let count = self.session_count(rng);
        let mut starts: Vec<Timestamp> = (0..count)
            .map(|_| self.session_start(day_start, rng))
            .collect();
        starts.sort_unstable();
        starts
    }
}
