//! Collaborator traits consumed by the streamer.

use crate::{DeliveryBatch, GenerationError, TransportError};
use async_trait::async_trait;
use clickstream_types::{Event, Timestamp, User};
use rand::RngCore;

/// Produces the events of one user session.
///
/// Implementations walk the app's screens starting at `session_start` and
/// append the resulting events, in timestamp order, to `events`.
///
/// # Guarantees expected from implementors
///
/// - **No global state**: the only state mutated is the user's simulated
///   current time (and session counter)
/// - **Append only**: events already in `events` are never touched
/// - **Local failure**: an error describes this user and session only
pub trait ContentGenerator: Send + Sync {
    /// Generate one session for `user` beginning at `session_start`.
    fn generate_session(
        &self,
        user: &User,
        session_start: Timestamp,
        rng: &mut dyn RngCore,
        events: &mut Vec<Event>,
    ) -> Result<(), GenerationError>;
}

/// Hands a batch of events to the downstream sink.
///
/// Delivery is best-effort. Callers log a returned error and move on; they
/// never retry and never treat it as fatal. Implementations must not hold a
/// lock across the network or database call.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Attempt to deliver the batch.
    async fn deliver(&self, batch: DeliveryBatch<'_>) -> Result<(), TransportError>;
}

/// Source of "now" for window scheduling and pacing.
///
/// # Example
///
/// ```ignore
/// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
/// let window_start = clock.now();
/// ```
pub trait Clock: Send + Sync {
    /// Current wall-clock (or virtual) time.
    fn now(&self) -> Timestamp;
}
