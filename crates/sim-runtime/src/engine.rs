//! The engine object: single owner and single writer of the game state.

use persistence::{AutosaveWriter, SaveSlot};
use rand::RngCore;
use sim_core::{ContentTables, GameState, Item, ItemId, OptionId, SimConfig};
use sim_econ::{seeded_rng, SimRng};
use std::sync::Arc;
use tracing::{info, warn};

use crate::signals::{Ledger, NotificationKind, Outcome};
use crate::{choice, month, shop};

type Subscriber = Box<dyn FnMut(&GameState, &Outcome)>;

/// Owns one [`GameState`] and exposes the transitions that may change it.
///
/// Every operation runs to completion before returning. After each applied
/// transition subscribers see the new snapshot and a copy is handed to the
/// autosave writer, if any. Writes happen on the writer's own thread; a
/// failing save is logged there and otherwise ignored.
pub struct Engine<R: RngCore = SimRng> {
    content: Arc<ContentTables>,
    config: SimConfig,
    state: GameState,
    rng: R,
    subscribers: Vec<Subscriber>,
    autosave: Option<AutosaveWriter>,
}

impl Engine<SimRng> {
    /// Fresh game with an RNG seeded from `config.rng_seed`.
    pub fn new(content: Arc<ContentTables>, config: SimConfig) -> Self {
        let state = GameState::new_game(&config.balance.tiers);
        Self::restore(content, config, state)
    }

    /// Continue from a previously loaded state.
    pub fn restore(content: Arc<ContentTables>, config: SimConfig, state: GameState) -> Self {
        let rng = seeded_rng(config.rng_seed);
        Self::with_rng(content, config, state, rng)
    }
}

impl<R: RngCore> Engine<R> {
    /// Engine with an explicit random source, e.g. a scripted one in tests.
    pub fn with_rng(
        content: Arc<ContentTables>,
        config: SimConfig,
        mut state: GameState,
        rng: R,
    ) -> Self {
        state.clamp_vitals();
        state.refresh_class(&config.balance.tiers);
        Self {
            content,
            config,
            state,
            rng,
            subscribers: Vec::new(),
            autosave: None,
        }
    }

    /// Persist every applied transition to `slot` in the background.
    pub fn with_autosave(mut self, slot: SaveSlot) -> Self {
        let key = slot.key().to_string();
        self.autosave = match AutosaveWriter::spawn(slot) {
            Ok(writer) => Some(writer),
            Err(err) => {
                warn!(error = %err, key = %key, "autosave disabled");
                None
            }
        };
        self
    }

    /// Block until queued autosaves have been written.
    pub fn flush_autosave(&self) {
        if let Some(writer) = &self.autosave {
            writer.flush();
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn content(&self) -> &ContentTables {
        &self.content
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Register a callback run after every applied transition.
    pub fn subscribe(&mut self, f: impl FnMut(&GameState, &Outcome) + 'static) {
        self.subscribers.push(Box::new(f));
    }

    pub fn advance_month(&mut self) -> Outcome {
        let out = month::advance_month(
            &mut self.state,
            &self.content,
            &self.config.balance,
            &mut self.rng,
        );
        self.commit(out)
    }

    pub fn resolve_choice(&mut self, option: OptionId) -> Outcome {
        let out = choice::resolve_choice(
            &mut self.state,
            &self.content,
            &self.config.balance,
            option,
        );
        self.commit(out)
    }

    pub fn purchase_item(&mut self, id: &ItemId) -> Outcome {
        let out = shop::purchase_item(
            &mut self.state,
            &self.content,
            &self.config.balance,
            id,
            &mut self.rng,
        );
        self.commit(out)
    }

    pub fn dismiss_bill(&mut self) -> Outcome {
        let out = shop::dismiss_bill(&mut self.state);
        self.commit(out)
    }

    /// Replace the state wholesale with a fresh game. Works on finished games.
    pub fn reset_game(&mut self) -> Outcome {
        self.state = GameState::new_game(&self.config.balance.tiers);
        info!("new game");
        let mut ledger = Ledger::new(self.config.balance.notification_threshold);
        ledger.message(NotificationKind::Info, "A new month 1 begins.");
        self.commit(ledger.finish(None, None))
    }

    pub fn shop_catalog(&self) -> Vec<&Item> {
        shop::shop_catalog(&self.state, &self.content)
    }

    fn commit(&mut self, out: Outcome) -> Outcome {
        if !out.is_applied() {
            return out;
        }
        for f in &mut self.subscribers {
            f(&self.state, &out);
        }
        if let Some(writer) = &self.autosave {
            writer.submit(&self.state);
        }
        out
    }
}
