//! Delivery batches and the outbound sequence counter.

use clickstream_types::{Event, User};
use parking_lot::Mutex;
use tracing::info;

/// Who a batch of events belongs to.
#[derive(Debug, Clone, Copy)]
pub enum DeliveryTarget<'a> {
    /// A pacer delivery: every event belongs to this user.
    User(&'a User),
    /// A backfill delivery mixing many users' events.
    Bulk,
}

/// One logical delivery handed to a [`crate::DeliveryTransport`].
#[derive(Debug, Clone, Copy)]
pub struct DeliveryBatch<'a> {
    /// Owner of the events.
    pub target: DeliveryTarget<'a>,
    /// Events in timestamp order.
    pub events: &'a [Event],
    /// Process-wide bundle sequence id for this delivery.
    pub sequence_id: u64,
}

impl<'a> DeliveryBatch<'a> {
    /// Batch of one user's due events.
    pub fn for_user(user: &'a User, events: &'a [Event], sequence_id: u64) -> Self {
        Self {
            target: DeliveryTarget::User(user),
            events,
            sequence_id,
        }
    }

    /// Batch of mixed events from the backfill path.
    pub fn bulk(events: &'a [Event], sequence_id: u64) -> Self {
        Self {
            target: DeliveryTarget::Bulk,
            events,
            sequence_id,
        }
    }

    /// The user, for single-user batches.
    pub fn user(&self) -> Option<&'a User> {
        match self.target {
            DeliveryTarget::User(user) => Some(user),
            DeliveryTarget::Bulk => None,
        }
    }

    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch carries no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Monotonically increasing bundle sequence id shared by every sender.
///
/// Owned by whoever drives deliveries (scheduler or backfill) and handed to
/// tasks behind an `Arc`. The lock covers increment-and-compare only; it is
/// released before the id is used for I/O.
#[derive(Debug)]
pub struct SequenceCounter {
    next: Mutex<u64>,
    log_every: u64,
}

impl SequenceCounter {
    /// Counter starting at 1, logging progress every 100 ids.
    pub fn new() -> Self {
        Self::with_log_every(100)
    }

    /// Counter starting at 1, logging progress every `log_every` ids.
    pub fn with_log_every(log_every: u64) -> Self {
        Self {
            next: Mutex::new(1),
            log_every: log_every.max(1),
        }
    }

    /// Allocate the next sequence id.
    pub fn next_id(&self) -> u64 {
        let id = {
            let mut next = self.next.lock();
            let id = *next;
            *next += 1;
            id
        };
        if id % self.log_every == 0 {
            info!(requests = id, "Delivery progress");
        }
        id
    }

    /// Number of ids allocated so far.
    pub fn issued(&self) -> u64 {
        *self.next.lock() - 1
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequence_ids_are_unique_across_threads() {
        let counter = Arc::new(SequenceCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..250).map(|_| counter.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 1000);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&1000));
        assert_eq!(counter.issued(), 1000);
    }

    #[test]
    fn test_bulk_batch_has_no_user() {
        let events = Vec::new();
        let batch = DeliveryBatch::bulk(&events, 7);
        assert!(batch.user().is_none());
        assert!(batch.is_empty());
        assert_eq!(batch.sequence_id, 7);
    }
}
