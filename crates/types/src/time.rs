//! Millisecond timestamps and simulated calendar days.
//!
//! All simulated time is UTC milliseconds since the Unix epoch. Session start
//! times are anchored to the start of a [`SimDay`], so a timestamp's day is
//! derived by integer division rather than through a time zone database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Milliseconds in one simulated day.
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Event or wall-clock time, in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The Unix epoch.
    pub const ZERO: Self = Timestamp(0);

    /// Create from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Add a duration, saturating at `u64::MAX` milliseconds.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }

    /// Add raw milliseconds.
    pub fn plus_millis(self, millis: u64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// The simulated day this timestamp falls on.
    pub fn day(self) -> SimDay {
        SimDay(self.0 / MILLIS_PER_DAY)
    }

    /// Midnight (UTC) of this timestamp's day.
    pub fn day_start(self) -> Timestamp {
        self.day().start()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match i64::try_from(self.0)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// A simulated calendar day, counted in days since 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimDay(pub u64);

impl SimDay {
    /// Midnight at the start of the day.
    pub fn start(self) -> Timestamp {
        Timestamp(self.0.saturating_mul(MILLIS_PER_DAY))
    }

    /// Midnight at the start of the following day.
    pub fn end(self) -> Timestamp {
        self.next().start()
    }

    /// The following day.
    pub fn next(self) -> Self {
        SimDay(self.0 + 1)
    }

    /// The `count` days ending with (and excluding) `self`, oldest first.
    pub fn preceding(self, count: u64) -> Vec<SimDay> {
        let first = self.0.saturating_sub(count);
        (first..self.0).map(SimDay).collect()
    }
}

impl fmt::Display for SimDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match i64::try_from(self.start().0)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d")),
            None => write!(f, "day {}", self.0),
        }
    }
}
