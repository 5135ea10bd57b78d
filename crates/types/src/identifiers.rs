//! Domain-specific identifier types.

use rand::Rng;
use serde::{Serialize, Serializer};
use std::fmt;

/// Synthetic user identifier.
///
/// Rendered as 32 lowercase hex characters, the same shape an SDK-generated
/// unique id has on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub [u8; 16]);

impl UserId {
    /// Draw a fresh random identifier.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes[..]);
        UserId(bytes)
    }

    /// Build an identifier from a small integer (tests and fixtures).
    pub fn from_index(index: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&index.to_be_bytes());
        UserId(bytes)
    }

    /// Full hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, used in session ids and log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.short())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Shard identifier within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId(pub usize);

impl ShardId {
    /// Reserved shard id for the task that only drains carried-forward events.
    pub const CARRY_FORWARD: Self = ShardId(usize::MAX);

    /// Whether this is the carry-forward task's id.
    pub fn is_carry_forward(self) -> bool {
        self == Self::CARRY_FORWARD
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_carry_forward() {
            write!(f, "Shard(carry)")
        } else {
            write!(f, "Shard({})", self.0)
        }
    }
}

/// Window sequence number (0 for the first window of a run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WindowIndex(pub u64);

impl WindowIndex {
    /// Get the next window index.
    pub fn next(self) -> Self {
        WindowIndex(self.0 + 1)
    }
}

impl fmt::Display for WindowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Window({})", self.0)
    }
}
