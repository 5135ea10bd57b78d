use async_trait::async_trait;
use clickstream_core::{DeliveryBatch, DeliveryTransport, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Transport that logs each batch instead of sending it.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    deliveries: AtomicU64,
    events: AtomicU64,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches seen so far.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Events seen so far.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeliveryTransport for DryRunTransport {
    async fn deliver(&self, batch: DeliveryBatch<'_>) -> Result<(), TransportError> {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(batch.len() as u64, Ordering::Relaxed);

        let user = batch.user().map(|u| u.id.short());
        info!(
            user = user.as_deref().unwrap_or("bulk"),
            events = batch.len(),
            sequence_id = batch.sequence_id,
            first = ?batch.events.first().map(|e| e.timestamp),
            "Dry run delivery"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickstream_test_helpers::user;
    use clickstream_types::{Event, Timestamp};
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_batches_are_counted_and_logged() {
        let transport = DryRunTransport::new();
        let user = user(4);
        let events = vec![
            Event::new("_screen_view", Timestamp(10)),
            Event::new("_screen_view", Timestamp(20)),
        ];

        transport
            .deliver(DeliveryBatch::for_user(&user, &events, 1))
            .await
            .unwrap();
        transport
            .deliver(DeliveryBatch::bulk(&events[..1], 2))
            .await
            .unwrap();

        assert_eq!(transport.deliveries(), 2);
        assert_eq!(transport.events(), 3);
        assert!(logs_contain("Dry run delivery"));
        assert!(logs_contain("bulk"));
    }
}
