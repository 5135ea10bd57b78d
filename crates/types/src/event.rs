//! Generated clickstream events.

use crate::Timestamp;
use serde::Serialize;
use serde_json::{Map, Value};

/// A single generated event.
///
/// Events are deliberately not `Clone`: an event instance moves from the
/// generator into exactly one window workload, and from there either into a
/// delivery or into the carry-forward set. Copying one would make a double
/// send possible.
#[derive(Debug, PartialEq, Serialize)]
pub struct Event {
    /// Event name, e.g. `_screen_view` or `add_to_cart`.
    pub event_type: String,

    /// When the event happened in simulated time.
    pub timestamp: Timestamp,

    /// Remaining payload fields, flattened into the serialized record.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Event {
    /// Create an event with no attributes.
    pub fn new(event_type: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
            attributes: Map::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
