//! Window event builder.
//!
//! Turns a shard of users into that shard's [`WindowWorkload`]: the ordered
//! events each user emits inside the window, with carried-forward events in
//! front.

use crate::carry::CarriedEvents;
use crate::window::Window;
use clickstream_core::{ContentGenerator, GenerationError};
use clickstream_types::{Event, Timestamp, User};
use clickstream_workload::SessionPlanner;
use rand::RngCore;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// One user handed to a shard, with anything carried from earlier windows.
#[derive(Debug)]
pub struct ShardInput {
    pub user: Arc<User>,
    /// Events from earlier windows, in timestamp order.
    pub carried: Vec<Event>,
}

impl ShardInput {
    /// A user with nothing carried.
    pub fn fresh(user: Arc<User>) -> Self {
        Self {
            user,
            carried: Vec::new(),
        }
    }
}

impl From<CarriedEvents> for ShardInput {
    fn from(carried: CarriedEvents) -> Self {
        Self {
            user: carried.user,
            carried: carried.events,
        }
    }
}

/// A user and the events still to deliver this window.
#[derive(Debug)]
pub struct ShardMember {
    pub user: Arc<User>,
    pub events: VecDeque<Event>,
}

/// A shard's events for one window, consumed by the pacer.
#[derive(Debug, Default)]
pub struct WindowWorkload {
    pub members: Vec<ShardMember>,
}

impl WindowWorkload {
    /// Workload of carried events only; nothing new is generated.
    ///
    /// Window counters are reset to the carried count.
    pub fn from_carried(inputs: Vec<ShardInput>) -> Self {
        let members = inputs
            .into_iter()
            .filter(|input| !input.carried.is_empty())
            .map(|input| {
                input.user.begin_window(input.carried.len() as u64);
                ShardMember {
                    user: input.user,
                    events: input.carried.into(),
                }
            })
            .collect();
        Self { members }
    }

    /// Events not yet delivered.
    pub fn pending_events(&self) -> usize {
        self.members.iter().map(|m| m.events.len()).sum()
    }

    /// Move every member's remaining events out.
    pub fn into_leftovers(self) -> Vec<CarriedEvents> {
        self.members
            .into_iter()
            .filter(|m| !m.events.is_empty())
            .map(|m| CarriedEvents {
                user: m.user,
                events: m.events.into(),
            })
            .collect()
    }
}

/// Aggregate counts from one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Users with at least one event this window.
    pub active_users: usize,
    /// Newly generated events kept in the workload.
    pub generated_events: usize,
    /// Carried events placed in front of new ones.
    pub carried_events: usize,
    /// Generated events dropped for falling outside the window.
    pub truncated_events: usize,
}

/// A shard build that failed, with the carried events it was given.
#[derive(Debug, thiserror::Error)]
#[error("Shard build failed: {source}")]
pub struct BuildError {
    pub source: GenerationError,
    /// Carried events of every input, ready to go back to the carry set.
    pub carried: Vec<CarriedEvents>,
}

impl BuildError {
    fn new(source: GenerationError, inputs: Vec<ShardInput>) -> Self {
        let carried = inputs
            .into_iter()
            .filter(|input| !input.carried.is_empty())
            .map(|input| CarriedEvents {
                user: input.user,
                events: input.carried,
            })
            .collect();
        Self { source, carried }
    }

    /// Number of carried events handed back.
    pub fn carried_events(&self) -> usize {
        self.carried.iter().map(|c| c.events.len()).sum()
    }
}

/// Generates each shard member's in-window events.
#[derive(Clone)]
pub struct WindowEventBuilder {
    planner: Arc<SessionPlanner>,
    generator: Arc<dyn ContentGenerator>,
}

impl WindowEventBuilder {
    pub fn new(planner: Arc<SessionPlanner>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { planner, generator }
    }

    /// Build the workload for `inputs` in `window`.
    ///
    /// Users with no events (nothing carried and no session starting inside
    /// the window) are left out for this window only. Every user is generated
    /// before any workload is assembled, so a generation failure hands back
    /// the shard's carried events untouched.
    pub fn build(
        &self,
        window: &Window,
        inputs: Vec<ShardInput>,
        rng: &mut dyn RngCore,
    ) -> Result<(WindowWorkload, BuildSummary), BuildError> {
        let day_start = window.start.day_start();
        let mut generated = Vec::with_capacity(inputs.len());
        let mut failure = None;
        for input in &inputs {
            match self.generate_user(&input.user, window, day_start, rng) {
                Ok(events) => generated.push(events),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(source) = failure {
            return Err(BuildError::new(source, inputs));
        }

        let mut summary = BuildSummary::default();
        let mut members = Vec::with_capacity(inputs.len());
        for (ShardInput { user, carried }, (events, truncated)) in inputs.into_iter().zip(generated) {
            summary.truncated_events += truncated;
            if carried.is_empty() && events.is_empty() {
                continue;
            }

            summary.active_users += 1;
            summary.carried_events += carried.len();
            summary.generated_events += events.len();

            let mut queue = VecDeque::from(carried);
            queue.extend(events);
            user.begin_window(queue.len() as u64);
            members.push(ShardMember { user, events: queue });
        }

        debug!(
            window = %window.index,
            users = summary.active_users,
            events = summary.generated_events,
            carried = summary.carried_events,
            "Built shard workload"
        );

        Ok((WindowWorkload { members }, summary))
    }

    /// One user's in-window events, sorted, and how many fell outside.
    fn generate_user(
        &self,
        user: &User,
        window: &Window,
        day_start: Timestamp,
        rng: &mut dyn RngCore,
    ) -> Result<(Vec<Event>, usize), GenerationError> {
        let mut events = Vec::new();
        for start in self.session_starts(window, day_start, rng) {
            user.set_current_timestamp(start);
            self.generator.generate_session(user, start, rng, &mut events)?;
        }

        let produced = events.len();
        events.retain(|e| window.contains(e.timestamp));
        events.sort_by_key(|e| e.timestamp);
        let truncated = produced - events.len();
        Ok((events, truncated))
    }

    /// Session start times inside `window`, ascending.
    fn session_starts(
        &self,
        window: &Window,
        day_start: Timestamp,
        rng: &mut dyn RngCore,
    ) -> Vec<Timestamp> {
        let count = self.planner.session_count(rng);
        let mut starts: Vec<Timestamp> = (0..count)
            .map(|_| self.planner.session_start(day_start, rng))
            .filter(|start| window.contains(*start))
            .collect();
        starts.sort_unstable();
        starts
    }
}
