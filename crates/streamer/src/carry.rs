//! Carry-forward of undelivered events between windows.

use clickstream_types::{Event, User, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// One user's events left undelivered when a pacer stopped.
#[derive(Debug)]
pub struct CarriedEvents {
    pub user: Arc<User>,
    /// Remaining events, in timestamp order.
    pub events: Vec<Event>,
}

/// Undelivered events collected at a window boundary.
///
/// Owned by the scheduler. Filled once all shard tasks of a window have
/// joined, then drained while building the next window: every entry is taken
/// exactly once, either by the user's shard or by the carry-only task.
#[derive(Debug, Default)]
pub struct CarryForwardSet {
    entries: BTreeMap<UserId, CarriedEvents>,
}

impl CarryForwardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the leftovers of one finished shard.
    ///
    /// A user owns one shard per window, so a second entry for the same user
    /// cannot occur; if it ever does, the events are merged rather than lost.
    pub fn absorb(&mut self, carried: Vec<CarriedEvents>) {
        for entry in carried {
            if entry.events.is_empty() {
                continue;
            }
            match self.entries.get_mut(&entry.user.id) {
                Some(existing) => {
                    warn!(user = %entry.user.id, "User carried from two shards");
                    existing.events.extend(entry.events);
                    existing.events.sort_by_key(|e| e.timestamp);
                }
                None => {
                    self.entries.insert(entry.user.id, entry);
                }
            }
        }
    }

    /// Remove and return `user`'s carried events.
    pub fn take(&mut self, user: &UserId) -> Option<Vec<Event>> {
        self.entries.remove(user).map(|entry| entry.events)
    }

    /// Remove and return every remaining entry.
    pub fn drain(&mut self) -> Vec<CarriedEvents> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Number of users with carried events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total carried events.
    pub fn event_count(&self) -> usize {
        self.entries.values().map(|entry| entry.events.len()).sum()
    }

    /// Carried events of `user`, if any.
    pub fn get(&self, user: &UserId) -> Option<&[Event]> {
        self.entries.get(user).map(|entry| entry.events.as_slice())
    }

    /// Users with carried events.
    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.entries.keys()
    }
}
