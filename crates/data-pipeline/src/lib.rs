#![deny(warnings)]

//! Content and balance loading.
//!
//! Content tables are JSON arrays, one file per table. The default set is
//! compiled into the binary; a directory with the same file names can replace
//! it. Balance overrides are partial YAML documents merged over the defaults.
//! Anything malformed is an error at load time.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use sim_core::{validate_content, Balance, ContentTables, RawContent, SimConfig};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const BUILTIN_CLASSES: &str = include_str!("../../../assets/data/classes.json");
pub const BUILTIN_ITEMS: &str = include_str!("../../../assets/data/items.json");
pub const BUILTIN_BILLS: &str = include_str!("../../../assets/data/bills.json");
pub const BUILTIN_EVENTS: &str = include_str!("../../../assets/data/events.json");
pub const BUILTIN_ENDINGS: &str = include_str!("../../../assets/data/endings.json");
pub const BUILTIN_ARCHIVES: &str = include_str!("../../../assets/data/archives.json");

/// Raw JSON text of every table. `archives` is optional.
#[derive(Clone, Copy, Debug)]
pub struct ContentSources<'a> {
    pub classes: &'a str,
    pub items: &'a str,
    pub bills: &'a str,
    pub events: &'a str,
    pub endings: &'a str,
    pub archives: Option<&'a str>,
}

impl ContentSources<'static> {
    /// The tables shipped with the game.
    pub fn builtin() -> Self {
        Self {
            classes: BUILTIN_CLASSES,
            items: BUILTIN_ITEMS,
            bills: BUILTIN_BILLS,
            events: BUILTIN_EVENTS,
            endings: BUILTIN_ENDINGS,
            archives: Some(BUILTIN_ARCHIVES),
        }
    }
}

fn parse_table<T: DeserializeOwned>(table: &str, text: &str) -> Result<Vec<T>> {
    serde_json::from_str(text).with_context(|| format!("malformed {table} table"))
}

/// Parse and validate all tables.
pub fn parse_tables(src: ContentSources<'_>) -> Result<ContentTables> {
    let raw = RawContent {
        classes: parse_table("classes", src.classes)?,
        items: parse_table("items", src.items)?,
        bills: parse_table("bills", src.bills)?,
        events: parse_table("events", src.events)?,
        endings: parse_table("endings", src.endings)?,
        archives: match src.archives {
            Some(text) => parse_table("archives", text)?,
            None => Vec::new(),
        },
    };
    let counts = (
        raw.items.len(),
        raw.bills.len(),
        raw.events.len(),
        raw.endings.len(),
    );
    let tables = validate_content(raw).context("content validation failed")?;
    debug!(
        items = counts.0,
        bills = counts.1,
        events = counts.2,
        endings = counts.3,
        "content validated"
    );
    Ok(tables)
}

/// Load the embedded default content.
pub fn load_embedded() -> Result<ContentTables> {
    parse_tables(ContentSources::builtin())
}

fn read(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

/// Load content from `dir`, which holds `classes.json`, `items.json`,
/// `bills.json`, `events.json`, `endings.json` and optionally `archives.json`.
pub fn load_dir(dir: &Path) -> Result<ContentTables> {
    let classes = read(dir, "classes.json")?;
    let items = read(dir, "items.json")?;
    let bills = read(dir, "bills.json")?;
    let events = read(dir, "events.json")?;
    let endings = read(dir, "endings.json")?;
    let archives_path = dir.join("archives.json");
    let archives = if archives_path.exists() {
        Some(read(dir, "archives.json")?)
    } else {
        None
    };
    let tables = parse_tables(ContentSources {
        classes: &classes,
        items: &items,
        bills: &bills,
        events: &events,
        endings: &endings,
        archives: archives.as_deref(),
    })
    .with_context(|| format!("content directory {}", dir.display()))?;
    info!(dir = %dir.display(), "content loaded");
    Ok(tables)
}

/// Parse a YAML balance override. Missing keys keep their defaults.
pub fn parse_balance(text: &str) -> Result<Balance> {
    let balance: Balance = if text.trim().is_empty() {
        Balance::default()
    } else {
        serde_yaml::from_str(text).context("malformed balance YAML")?
    };
    balance.validate().context("invalid balance")?;
    Ok(balance)
}

pub fn load_balance(path: &Path) -> Result<Balance> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let balance = parse_balance(&text).with_context(|| format!("balance file {}", path.display()))?;
    info!(path = %path.display(), "balance overrides loaded");
    Ok(balance)
}

/// Build a [`SimConfig`] from a seed and an optional balance file.
pub fn load_config(seed: u64, balance: Option<&Path>) -> Result<SimConfig> {
    let balance = match balance {
        Some(path) => load_balance(path)?,
        None => Balance::default(),
    };
    Ok(SimConfig {
        rng_seed: seed,
        balance,
    })
}
