//! Core types for the clickstream generator.
//!
//! Everything here is plain data shared by the workload generator and the
//! realtime streamer:
//!
//! - [`Timestamp`] / [`SimDay`]: simulated time in UTC milliseconds
//! - [`User`], [`Device`], [`Platform`]: synthetic users and their counters
//! - [`Event`]: one generated clickstream record
//! - [`UserId`], [`ShardId`], [`WindowIndex`]: identifiers

mod event;
mod identifiers;
mod time;
mod user;

pub use event::Event;
pub use identifiers::{ShardId, UserId, WindowIndex};
pub use time::{SimDay, Timestamp, MILLIS_PER_DAY};
pub use user::{Device, Platform, User};
