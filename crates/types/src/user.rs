//! Synthetic users and their device profiles.
//!
//! A [`User`] is created once by the user pool and lives for the whole
//! process. Shards only hold `Arc<User>` references for the duration of a
//! window. The per-window counters are atomics so the pacer can update them
//! through a shared reference; each user belongs to exactly one shard task per
//! window, so the counters never see concurrent writers.

use crate::{Timestamp, UserId};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Client platform a user's traffic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    Android,
    #[serde(rename = "iOS")]
    IOS,
    Web,
}

impl Platform {
    /// Name used in event payloads and request parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::IOS => "iOS",
            Platform::Web => "Web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device descriptor attached to every event a user produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Device brand ("Samsung", "Apple", browser vendor for web).
    pub brand: String,
    /// Device model or browser name.
    pub model: String,
    /// Operating system version string.
    pub os_version: String,
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// Locale, e.g. "en_US".
    pub locale: String,
    /// Source IP the sink should attribute the traffic to.
    pub ip_address: Ipv4Addr,
}

/// A synthetic user.
#[derive(Debug)]
pub struct User {
    /// Stable identity.
    pub id: UserId,

    /// Platform the user's app runs on.
    pub platform: Platform,

    /// Device profile.
    pub device: Device,

    /// Simulated "current time" of the user, advanced by the content
    /// generator as it emits a session's events.
    current_timestamp: AtomicU64,

    /// Number of sessions generated for this user so far.
    sessions: AtomicU64,

    /// Events assigned to the user in the current window (carried + new).
    total_window_events: AtomicU64,

    /// Events handed to the delivery transport in the current window.
    sent_events: AtomicU64,
}

impl User {
    /// Create a user with zeroed counters.
    pub fn new(id: UserId, platform: Platform, device: Device) -> Self {
        Self {
            id,
            platform,
            device,
            current_timestamp: AtomicU64::new(0),
            sessions: AtomicU64::new(0),
            total_window_events: AtomicU64::new(0),
            sent_events: AtomicU64::new(0),
        }
    }

    /// The user's simulated current time.
    pub fn current_timestamp(&self) -> Timestamp {
        Timestamp(self.current_timestamp.load(Ordering::Relaxed))
    }

    /// Move the user's simulated current time.
    pub fn set_current_timestamp(&self, ts: Timestamp) {
        self.current_timestamp.store(ts.0, Ordering::Relaxed);
    }

    /// Advance the simulated current time by `millis` and return the new value.
    pub fn advance_current_timestamp(&self, millis: u64) -> Timestamp {
        let previous = self.current_timestamp.fetch_add(millis, Ordering::Relaxed);
        Timestamp(previous.saturating_add(millis))
    }

    /// Get the next session number (1 for the user's first session).
    pub fn next_session_number(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of sessions generated so far.
    pub fn session_count(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Reset the window counters for a new window holding `total` events.
    pub fn begin_window(&self, total: u64) {
        self.total_window_events.store(total, Ordering::Relaxed);
        self.sent_events.store(0, Ordering::Relaxed);
    }

    /// Record `count` events handed to the transport.
    pub fn record_sent(&self, count: u64) {
        let sent = self.sent_events.fetch_add(count, Ordering::Relaxed) + count;
        debug_assert!(
            sent <= self.total_window_events(),
            "user {} sent {} of {} window events",
            self.id,
            sent,
            self.total_window_events()
        );
    }

    /// Events assigned to the user in the current window.
    pub fn total_window_events(&self) -> u64 {
        self.total_window_events.load(Ordering::Relaxed)
    }

    /// Events sent in the current window.
    pub fn sent_events(&self) -> u64 {
        self.sent_events.load(Ordering::Relaxed)
    }

    /// Events assigned but not yet sent in the current window.
    pub fn unsent_events(&self) -> u64 {
        self.total_window_events().saturating_sub(self.sent_events())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({}, {})", self.id.short(), self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            brand: "Google".to_string(),
            model: "Pixel 8".to_string(),
            os_version: "14".to_string(),
            screen_width: 1080,
            screen_height: 2400,
            locale: "en_US".to_string(),
            ip_address: Ipv4Addr::new(203, 0, 113, 9),
        }
    }

    #[test]
    fn test_window_counters() {
        let user = User::new(UserId::from_index(1), Platform::Android, sample_device());
        user.begin_window(5);
        user.record_sent(2);
        assert_eq!(user.sent_events(), 2);
        assert_eq!(user.unsent_events(), 3);

        user.begin_window(1);
        assert_eq!(user.sent_events(), 0);
        assert_eq!(user.total_window_events(), 1);
    }

    #[test]
    fn test_current_time_and_sessions() {
        let user = User::new(UserId::from_index(2), Platform::Web, sample_device());
        user.set_current_timestamp(Timestamp(1_000));
        assert_eq!(user.advance_current_timestamp(250), Timestamp(1_250));
        assert_eq!(user.current_timestamp(), Timestamp(1_250));

        assert_eq!(user.next_session_number(), 1);
        assert_eq!(user.next_session_number(), 2);
        assert_eq!(user.session_count(), 2);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::IOS.to_string(), "iOS");
        assert_eq!(
            serde_json::to_string(&Platform::IOS).unwrap(),
            "\"iOS\""
        );
    }
}
