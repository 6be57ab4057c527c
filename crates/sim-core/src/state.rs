//! The single mutable aggregate the engine owns: [`GameState`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::TierThresholds;
use crate::content::{ArchiveId, Bill, EndingId, Event, ItemId, ItemTable};

/// Sanity is always clamped to `[0, SANITY_MAX]`.
pub const SANITY_MAX: i32 = 100;

/// Socioeconomic bracket derived from gold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassTier {
    /// Below the worker threshold; loses HP to exposure every month.
    Homeless,
    /// Wage earner.
    Worker,
    /// Salaried professional.
    Middle,
    /// Owner of capital.
    Capitalist,
}

impl ClassTier {
    /// All tiers, poorest first.
    pub const ALL: [ClassTier; 4] = [
        ClassTier::Homeless,
        ClassTier::Worker,
        ClassTier::Middle,
        ClassTier::Capitalist,
    ];

    /// Position in [`ClassTier::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Why a player died, when the cause is known explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeathCause {
    /// Forced organ harvest left nothing to live on.
    Dismantled,
    /// Killed in a confrontation with police.
    Cop,
    /// Took their own life.
    Suicide,
    /// Ran out of HP.
    Hp,
}

/// Bookkeeping flags plus narrative key-item markers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub is_homeless: bool,
    /// Consecutive month ends spent with negative gold.
    pub debt_months: u32,
    /// Markers granted by possessing narrative key items (e.g. `red_book`).
    #[serde(default)]
    pub markers: BTreeSet<String>,
}

/// Ideological alignment counters. Unbounded in both directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StancePoints {
    pub red: i64,
    pub wolf: i64,
    pub old: i64,
}

impl StancePoints {
    pub fn add(&mut self, other: &StancePoints) {
        self.red += other.red;
        self.wolf += other.wolf;
        self.old += other.old;
    }

    pub fn is_zero(&self) -> bool {
        self.red == 0 && self.wolf == 0 && self.old == 0
    }
}

/// Canonical game state. Only the engine mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Simulation clock, starts at 1.
    pub month: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub sanity: i32,
    /// May go negative (debt).
    pub gold: i64,
    /// Derived from `gold`; see [`GameState::refresh_class`].
    pub class_tier: ClassTier,
    /// Multiset of owned items, in acquisition order.
    pub inventory: Vec<ItemId>,
    pub flags: Flags,
    pub stance: StancePoints,
    pub unlocked_archives: BTreeSet<ArchiveId>,
    pub current_event: Option<Event>,
    pub active_bill: Option<Bill>,
    /// Once set, the state is terminal.
    pub ending: Option<EndingId>,
    /// Append-only audit trail.
    pub history: Vec<String>,
}

impl GameState {
    /// Fresh month-1 state: 100/100 HP, 50 sanity, 100 gold.
    pub fn new_game(tiers: &TierThresholds) -> Self {
        let mut state = Self {
            month: 1,
            hp: 100,
            max_hp: 100,
            sanity: 50,
            gold: 100,
            class_tier: ClassTier::Worker,
            inventory: Vec::new(),
            flags: Flags::default(),
            stance: StancePoints::default(),
            unlocked_archives: BTreeSet::new(),
            current_event: None,
            active_bill: None,
            ending: None,
            history: Vec::new(),
        };
        state.refresh_class(tiers);
        state
    }

    pub fn is_terminal(&self) -> bool {
        self.ending.is_some()
    }

    /// Re-derive the tier (and the homeless flag) from current gold.
    pub fn refresh_class(&mut self, tiers: &TierThresholds) {
        self.class_tier = tiers.tier_for(self.gold);
        self.flags.is_homeless = self.class_tier == ClassTier::Homeless;
    }

    /// Force `0 <= hp <= max_hp` and `0 <= sanity <= 100`.
    pub fn clamp_vitals(&mut self) {
        self.max_hp = self.max_hp.max(0);
        self.hp = self.hp.clamp(0, self.max_hp);
        self.sanity = self.sanity.clamp(0, SANITY_MAX);
    }

    pub fn has_item(&self, id: &ItemId) -> bool {
        self.inventory.contains(id)
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.flags.markers.contains(marker)
    }

    /// Add `count` copies of an item to the inventory.
    pub fn grant_item(&mut self, id: &ItemId, count: u32) {
        for _ in 0..count {
            self.inventory.push(id.clone());
        }
    }

    /// Remove up to `count` copies of an item; returns how many were removed.
    pub fn take_item(&mut self, id: &ItemId, count: u32) -> u32 {
        let mut removed = 0;
        while removed < count {
            match self.inventory.iter().position(|owned| owned == id) {
                Some(idx) => {
                    self.inventory.remove(idx);
                    removed += 1;
                }
                None => break,
            }
        }
        removed
    }

    /// Recompute key-item markers from what is currently owned.
    pub fn refresh_markers(&mut self, items: &ItemTable) {
        self.flags.markers = self
            .inventory
            .iter()
            .filter_map(|id| items.get(id))
            .filter_map(|item| item.key_flag.clone())
            .collect();
    }

    pub fn log(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }
}
