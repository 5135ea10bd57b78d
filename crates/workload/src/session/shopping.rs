//! Shopping app session generator.

use super::pages::{NavigationGraph, Page};
use crate::config::WorkloadConfig;
use clickstream_core::{ContentGenerator, GenerationError};
use clickstream_types::{Event, Timestamp, User};
use rand::{Rng, RngCore};
use serde_json::Value;

/// Chance that a product detail view ends in `add_to_cart`.
const ADD_TO_CART_PROBABILITY: f64 = 0.3;

const SEARCH_TERMS: &[&str] = &[
    "sneakers", "headphones", "coffee", "backpack", "lamp", "jacket", "phone case", "watch",
];

/// Walks the shopping app's navigation graph to produce one session.
///
/// Each session emits `_session_start` (plus `_app_start` on the user's first
/// session), one `_screen_view` per page visited, page-specific actions and a
/// closing `_app_end`. Consecutive screens are separated by a random dwell.
#[derive(Clone, Debug)]
pub struct ShoppingSessionGenerator {
    app_id: String,
    graph: NavigationGraph,
    max_screens: usize,
    min_dwell_ms: u64,
    max_dwell_ms: u64,
}

impl ShoppingSessionGenerator {
    /// Create a generator for `app_id` using the session limits in `config`.
    pub fn new(app_id: impl Into<String>, config: &WorkloadConfig) -> Self {
        Self {
            app_id: app_id.into(),
            graph: NavigationGraph::shopping(),
            max_screens: config.max_screens_per_session.max(1),
            min_dwell_ms: config.min_dwell_ms.min(config.max_dwell_ms),
            max_dwell_ms: config.max_dwell_ms,
        }
    }

    fn dwell(&self, rng: &mut dyn RngCore) -> u64 {
        rng.gen_range(self.min_dwell_ms..=self.max_dwell_ms)
    }

    fn entry_page(&self, session_number: u64) -> Page {
        if session_number == 1 {
            Page::Login
        } else {
            Page::Main
        }
    }
}

/// Attributes shared by every event of one session.
struct SessionContext<'a> {
    app_id: &'a str,
    user: &'a User,
    device: Value,
    session_id: String,
    session_number: u64,
}

impl SessionContext<'_> {
    fn event(&self, event_type: &str, timestamp: Timestamp) -> Event {
        Event::new(event_type, timestamp)
            .with_attribute("app_id", self.app_id)
            .with_attribute("unique_id", self.user.id.to_hex())
            .with_attribute("platform", self.user.platform.as_str())
            .with_attribute("device", self.device.clone())
            .with_attribute("session_id", self.session_id.as_str())
            .with_attribute("session_number", self.session_number)
    }
}

impl ContentGenerator for ShoppingSessionGenerator {
    fn generate_session(
        &self,
        user: &User,
        session_start: Timestamp,
        rng: &mut dyn RngCore,
        events: &mut Vec<Event>,
    ) -> Result<(), GenerationError> {
        let device = serde_json::to_value(&user.device).map_err(|e| GenerationError::InvalidUser {
            user: user.id,
            reason: format!("device profile not serializable: {}", e),
        })?;

        let session_number = user.next_session_number();
        let ctx = SessionContext {
            app_id: &self.app_id,
            user,
            device,
            session_id: format!("{}-{:03}", user.id.short(), session_number),
            session_number,
        };

        user.set_current_timestamp(session_start);
        events.push(ctx.event("_session_start", session_start));
        if session_number == 1 {
            events.push(ctx.event("_app_start", session_start));
        }

        let mut page = self.entry_page(session_number);
        let mut previous: Option<String> = None;
        let mut screens = 0;

        while page != Page::Exit && screens < self.max_screens {
            let now = user.current_timestamp();
            let (screen_name, screen_id) = page.screen(user.platform);
            let mut view = ctx
                .event("_screen_view", now)
                .with_attribute("page", page.as_str())
                .with_attribute("screen_name", screen_name.as_str())
                .with_attribute("screen_id", screen_id);
            if let Some(prev) = previous.take() {
                view = view.with_attribute("previous_screen_name", prev);
            }
            events.push(view);
            screens += 1;

            let dwell = self.dwell(rng);
            let action_at = now.plus_millis(rng.gen_range(0..=dwell / 2));
            match page {
                Page::Login => events.push(ctx.event("login", action_at)),
                Page::Search => {
                    let term = SEARCH_TERMS[rng.gen_range(0..SEARCH_TERMS.len())];
                    events.push(ctx.event("search", action_at).with_attribute("search_term", term));
                }
                Page::Detail if rng.gen_bool(ADD_TO_CART_PROBABILITY) => {
                    let item: u32 = rng.gen_range(1..=500);
                    events.push(
                        ctx.event("add_to_cart", action_at)
                            .with_attribute("item_id", format!("item_{:03}", item)),
                    );
                }
                Page::Result => {
                    let cents: u64 = rng.gen_range(500..=50_000);
                    events.push(
                        ctx.event("purchase", action_at)
                            .with_attribute("currency", "USD")
                            .with_attribute("value", cents as f64 / 100.0),
                    );
                }
                _ => {}
            }

            user.advance_current_timestamp(dwell);
            previous = Some(screen_name);
            page = self.graph.next(page, rng);
        }

        let end = user.current_timestamp();
        events.push(
            ctx.event("_app_end", end)
                .with_attribute("engagement_time_msec", end.as_millis() - session_start.as_millis()),
        );
        Ok(())
    }
}
