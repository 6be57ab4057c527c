#![deny(warnings)]

//! Simulation engine for American Insight.
//!
//! The transitions are plain functions over `&mut GameState` so they can be
//! tested without an engine; [`Engine`] owns the state, the RNG, the
//! subscribers and the autosave slot and routes every call through them.

mod choice;
mod engine;
mod month;
mod shop;
pub mod signals;

pub use choice::resolve_choice;
pub use engine::Engine;
pub use month::advance_month;
pub use shop::{dismiss_bill, purchase_item, shop_catalog};
pub use signals::{
    Feedback, MonthlySummary, Notification, NotificationKind, Outcome, Precondition, Rejection,
    Status,
};

#[cfg(test)]
pub(crate) mod testkit {
    use sim_core::{ContentTables, Event, EventId, GameState, TierThresholds};

    pub fn content() -> ContentTables {
        data_pipeline::load_embedded().unwrap()
    }

    pub fn fresh() -> GameState {
        GameState::new_game(&TierThresholds::default())
    }

    /// An event from the shipped content, by id.
    pub fn event(id: &str) -> Event {
        let id = EventId::new(id);
        content()
            .events()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .unwrap()
    }
}
