//! Error types shared across the workspace.

use clickstream_types::UserId;
use thiserror::Error;

/// Errors raised by a content generator.
///
/// Fatal to the shard task that hit it; other shards keep running.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The user's state cannot produce a session.
    #[error("Invalid state for user {user}: {reason}")]
    InvalidUser { user: UserId, reason: String },

    /// The generator itself is misconfigured.
    #[error("Generator misconfigured: {0}")]
    Misconfigured(String),
}

/// Errors from a delivery attempt.
///
/// Recovered locally by the caller: logged, and the batch counts as sent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response was received.
    #[error("Request failed: {0}")]
    Request(String),

    /// The sink answered with a non-success status.
    #[error("Sink returned status {status}")]
    Status { status: u16 },

    /// The payload could not be encoded.
    #[error("Payload encoding failed: {0}")]
    Encode(String),
}
