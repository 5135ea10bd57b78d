//! Synthetic workload for the clickstream generator.
//!
//! This crate owns everything about *what* gets generated:
//!
//! - [`UserPool`] / [`UserFactory`]: the growing synthetic population
//! - [`SessionPlanner`]: how many sessions a user has and when they start
//! - [`ShoppingSessionGenerator`]: the built-in [`clickstream_core::ContentGenerator`]
//! - [`WorkloadConfig`]: distributions driving all of the above
//!
//! Timing and delivery live in `clickstream-streamer`.

mod config;
mod distribution;
mod planner;
mod session;
mod users;

pub use config::{ConfigError, WorkloadConfig, DEFAULT_HOUR_WEIGHTS};
pub use distribution::{sample_distinct, Choice, WeightedTable};
pub use planner::SessionPlanner;
pub use session::{NavigationGraph, Page, ShoppingSessionGenerator};
pub use users::{UserFactory, UserPool};
