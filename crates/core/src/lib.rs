//! Collaborator interfaces for the clickstream generator.
//!
//! The realtime engine treats content generation, delivery and time as
//! external collaborators. This crate defines the seams:
//!
//! - [`ContentGenerator`]: "given a user and a start time, produce a session"
//! - [`DeliveryTransport`]: "given a batch, attempt delivery"
//! - [`Clock`]: injectable source of "now" ([`SystemClock`], [`TokioClock`])
//! - [`SequenceCounter`]: the process-wide bundle sequence id

mod clock;
mod delivery;
mod error;
mod traits;

pub use clock::{SystemClock, TokioClock};
pub use delivery::{DeliveryBatch, DeliveryTarget, SequenceCounter};
pub use error::{GenerationError, TransportError};
pub use traits::{Clock, ContentGenerator, DeliveryTransport};
