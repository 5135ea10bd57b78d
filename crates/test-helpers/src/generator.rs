use clickstream_core::{ContentGenerator, GenerationError};
use clickstream_types::{Event, Timestamp, User, UserId};
use parking_lot::Mutex;
use rand::RngCore;
use std::collections::HashSet;

/// Content generator that ignores the session start and emits one event per
/// configured absolute timestamp.
///
/// Advances the user's current time to each emitted timestamp, like a real
/// generator would.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    timestamps: Vec<Timestamp>,
    failing: Mutex<HashSet<UserId>>,
}

impl ScriptedGenerator {
    /// Emit `timestamps` (milliseconds) for every session.
    pub fn at(timestamps: &[u64]) -> Self {
        Self {
            timestamps: timestamps.iter().copied().map(Timestamp).collect(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Fail every session generated for `user`.
    pub fn failing_for(self, user: UserId) -> Self {
        self.fail_for(user);
        self
    }

    /// Start failing sessions for `user` from now on.
    pub fn fail_for(&self, user: UserId) {
        self.failing.lock().insert(user);
    }
}

impl ContentGenerator for ScriptedGenerator {
    fn generate_session(
        &self,
        user: &User,
        _session_start: Timestamp,
        _rng: &mut dyn RngCore,
        events: &mut Vec<Event>,
    ) -> Result<(), GenerationError> {
        if self.failing.lock().contains(&user.id) {
            return Err(GenerationError::InvalidUser {
                user: user.id,
                reason: "scripted failure".to_string(),
            });
        }

        let session = user.next_session_number();
        for &ts in &self.timestamps {
            user.set_current_timestamp(ts);
            events.push(
                Event::new("scripted", ts)
                    .with_attribute("unique_id", user.id.to_hex())
                    .with_attribute("session_number", session),
            );
        }
        Ok(())
    }
}
