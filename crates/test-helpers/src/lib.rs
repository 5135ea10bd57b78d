//! Test fixtures for the clickstream generator.
//!
//! - [`ScriptedGenerator`]: emits events at fixed absolute timestamps
//! - [`RecordingTransport`]: remembers every delivery and when it happened
//! - [`FailingTransport`]: rejects every delivery
//! - [`users`]: users with fixed identities

mod generator;
mod transport;

pub use generator::ScriptedGenerator;
pub use transport::{FailingTransport, RecordedDelivery, RecordingTransport};

use clickstream_types::{Device, Platform, User, UserId};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Device profile shared by fixture users.
pub fn test_device() -> Device {
    Device {
        brand: "Google".to_string(),
        model: "Pixel 8".to_string(),
        os_version: "14".to_string(),
        screen_width: 1080,
        screen_height: 2400,
        locale: "en_US".to_string(),
        ip_address: Ipv4Addr::new(198, 51, 100, 7),
    }
}

/// One fixture user with identity `UserId::from_index(index)`.
pub fn user(index: u64) -> Arc<User> {
    Arc::new(User::new(
        UserId::from_index(index),
        Platform::Android,
        test_device(),
    ))
}

/// `count` fixture users with indices `1..=count`.
pub fn users(count: u64) -> Vec<Arc<User>> {
    (1..=count).map(user).collect()
}
