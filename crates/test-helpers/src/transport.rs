use async_trait::async_trait;
use clickstream_core::{Clock, DeliveryBatch, DeliveryTransport, TransportError};
use clickstream_types::{Timestamp, UserId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One delivery seen by a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelivery {
    /// Owner of the batch, `None` for bulk batches.
    pub user: Option<UserId>,
    /// Event timestamps in batch order.
    pub timestamps: Vec<Timestamp>,
    /// Sequence id the sender allocated.
    pub sequence_id: u64,
    /// Clock reading when the batch arrived.
    pub delivered_at: Timestamp,
}

/// Transport that records every batch and always succeeds.
pub struct RecordingTransport {
    clock: Arc<dyn Clock>,
    deliveries: Mutex<Vec<RecordedDelivery>>,
}

impl RecordingTransport {
    /// Record arrivals using `clock` for the delivery time.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Every delivery so far, in arrival order.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().clone()
    }

    /// Deliveries made for `user`, in arrival order.
    pub fn deliveries_for(&self, user: UserId) -> Vec<RecordedDelivery> {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.user == Some(user))
            .cloned()
            .collect()
    }

    /// Total events received.
    pub fn event_count(&self) -> usize {
        self.deliveries.lock().iter().map(|d| d.timestamps.len()).sum()
    }
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn deliver(&self, batch: DeliveryBatch<'_>) -> Result<(), TransportError> {
        let record = RecordedDelivery {
            user: batch.user().map(|u| u.id),
            timestamps: batch.events.iter().map(|e| e.timestamp).collect(),
            sequence_id: batch.sequence_id,
            delivered_at: self.clock.now(),
        };
        self.deliveries.lock().push(record);
        Ok(())
    }
}

/// Transport that rejects every batch with a 503.
#[derive(Debug, Default)]
pub struct FailingTransport {
    attempts: AtomicU64,
}

impl FailingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries attempted.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeliveryTransport for FailingTransport {
    async fn deliver(&self, _batch: DeliveryBatch<'_>) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(TransportError::Status { status: 503 })
    }
}
