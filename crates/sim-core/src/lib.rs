#![deny(warnings)]

//! Core domain models and invariants for American Insight.
//!
//! This crate defines the serializable game state, the content-table schema
//! and the balancing configuration, with validation helpers that reject
//! malformed data before the simulation ever sees it.

pub mod config;
pub mod content;
pub mod state;

pub use config::{
    Balance, ChoiceMatrix, EndingRules, SalaryBand, ShopRules, SimConfig, TierThresholds,
};
pub use content::{
    validate_content, Archive, ArchiveId, Bill, BillId, BillKind, BillTrigger, ClassProfile,
    ContentTables, Ending, EndingId, EndingKind, Event, EventConditions, EventId, EventOption,
    EventOptions, EventText, Item, ItemEffects, ItemGrant, ItemId, ItemTable, ItemTag, OptionId,
    RawContent, SpecialItem,
};
pub use state::{ClassTier, DeathCause, Flags, GameState, StancePoints, SANITY_MAX};

use thiserror::Error;

/// Ending ids the resolver can produce. Content must define all of them.
pub mod ending_ids {
    /// Died homeless.
    pub const STARVED: &str = "ED-01";
    /// Died of exhaustion with a roof overhead.
    pub const COLLAPSED: &str = "ED-02";
    pub const DISMANTLED: &str = "ED-03";
    pub const SHOT_BY_POLICE: &str = "ED-04";
    /// Died while lucid.
    pub const LUCID_DEATH: &str = "ED-05";
    pub const MONTHLY_BATTERY: &str = "ED-06";
    pub const SILENT_CONSUMABLE: &str = "ED-07";
    pub const MIDDLE_NIGHTMARE: &str = "ED-08";
    pub const PIG_HAPPINESS: &str = "ED-09";
    pub const MADNESS_POOR: &str = "ED-10";
    pub const MADNESS_RICH: &str = "ED-11";
    pub const RED_STANCE: &str = "ED-13";
    pub const WOLF_STANCE: &str = "ED-14";
    pub const OLD_STANCE: &str = "ED-15";
    /// Hidden ending.
    pub const TRUE_INSIGHT: &str = "ED-20";

    pub const ALL: &[&str] = &[
        STARVED,
        COLLAPSED,
        DISMANTLED,
        SHOT_BY_POLICE,
        LUCID_DEATH,
        MONTHLY_BATTERY,
        SILENT_CONSUMABLE,
        MIDDLE_NIGHTMARE,
        PIG_HAPPINESS,
        MADNESS_POOR,
        MADNESS_RICH,
        RED_STANCE,
        WOLF_STANCE,
        OLD_STANCE,
        TRUE_INSIGHT,
    ];
}

/// Validation errors for content tables and configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Two rows of one table share an id.
    #[error("duplicate id {id} in {table}")]
    DuplicateId { table: &'static str, id: String },
    /// Required text field is blank.
    #[error("{table} entry {id} has an empty {field}")]
    EmptyField {
        table: &'static str,
        id: String,
        field: &'static str,
    },
    /// Every tier needs exactly one class profile.
    #[error("no class profile for tier {0:?}")]
    MissingClass(ClassTier),
    /// Negative salary/cost/exposure or non-finite leverage.
    #[error("class profile for tier {0:?} has invalid economics")]
    InvalidClass(ClassTier),
    /// Bill trigger with min_gold above max_gold.
    #[error("bill {0} has an empty gold window")]
    InvalidTrigger(String),
    /// Event sanity bounds outside [0,100] or inverted.
    #[error("event {0} has an invalid sanity range")]
    InvalidSanityRange(String),
    /// Reference to an item or archive that does not exist.
    #[error("{table} entry {id} references unknown {target}")]
    UnknownReference {
        table: &'static str,
        id: String,
        target: String,
    },
    /// Ending the resolver can produce is absent from the endings table.
    #[error("ending {0} is not defined")]
    MissingEnding(String),
    #[error("tier thresholds must be strictly increasing")]
    TierThresholdsNotIncreasing,
    #[error("salary bands must be strictly increasing and end at max sanity")]
    InvalidSalaryBands,
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    #[error("{0} must be a probability in [0,1]")]
    InvalidProbability(&'static str),
    #[error("{0} is out of range")]
    InvalidRange(&'static str),
}
