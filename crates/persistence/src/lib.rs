#![deny(warnings)]

//! Persistence layer: versioned save envelope over an opaque blob store.
//!
//! The policy is reset over silent corruption: a missing, unreadable or
//! out-of-date save yields a fresh game instead of a partial migration.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sim_core::{
    ArchiveId, Bill, EndingId, Event, Flags, GameState, ItemId, StancePoints, TierThresholds,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

mod writer;

pub use writer::AutosaveWriter;

/// Key the game state is stored under.
pub const STORAGE_KEY: &str = "american-insight-storage";

/// Bump whenever [`SavedState`] changes shape or meaning.
pub const SCHEMA_VERSION: u32 = 13;

/// Opaque key-value blob storage.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, blob: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(f(&mut blobs))
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with(|b| b.get(key).cloned())
    }

    fn put(&mut self, key: &str, blob: &str) -> Result<()> {
        self.with(|b| {
            b.insert(key.to_string(), blob.to_string());
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.with(|b| {
            b.remove(key);
        })
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(text))
    }

    fn put(&mut self, key: &str, blob: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

/// Persisted subset of [`GameState`]. The class tier is derived from gold and
/// recomputed on load, so it is not stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub month: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub sanity: i32,
    pub gold: i64,
    pub inventory: Vec<ItemId>,
    pub flags: Flags,
    pub stance: StancePoints,
    pub unlocked_archives: BTreeSet<ArchiveId>,
    pub current_event: Option<Event>,
    pub active_bill: Option<Bill>,
    pub ending: Option<EndingId>,
    pub history: Vec<String>,
}

impl From<&GameState> for SavedState {
    fn from(s: &GameState) -> Self {
        Self {
            month: s.month,
            hp: s.hp,
            max_hp: s.max_hp,
            sanity: s.sanity,
            gold: s.gold,
            inventory: s.inventory.clone(),
            flags: s.flags.clone(),
            stance: s.stance,
            unlocked_archives: s.unlocked_archives.clone(),
            current_event: s.current_event.clone(),
            active_bill: s.active_bill.clone(),
            ending: s.ending.clone(),
            history: s.history.clone(),
        }
    }
}

impl SavedState {
    /// Rebuild a live state: vitals clamped, tier re-derived.
    pub fn into_state(self, tiers: &TierThresholds) -> GameState {
        let mut state = GameState::new_game(tiers);
        state.month = self.month.max(1);
        state.hp = self.hp;
        state.max_hp = self.max_hp;
        state.sanity = self.sanity;
        state.gold = self.gold;
        state.inventory = self.inventory;
        state.flags = self.flags;
        state.stance = self.stance;
        state.unlocked_archives = self.unlocked_archives;
        state.current_event = self.current_event;
        state.active_bill = self.active_bill;
        state.ending = self.ending;
        state.history = self.history;
        state.clamp_vitals();
        state.refresh_class(tiers);
        state
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    state: SavedState,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Why a load produced a fresh game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreshReason {
    Missing,
    Corrupt,
    VersionMismatch { found: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Restored(GameState),
    Fresh { state: GameState, reason: FreshReason },
}

impl LoadOutcome {
    pub fn state(&self) -> &GameState {
        match self {
            LoadOutcome::Restored(s) | LoadOutcome::Fresh { state: s, .. } => s,
        }
    }

    pub fn into_state(self) -> GameState {
        match self {
            LoadOutcome::Restored(s) | LoadOutcome::Fresh { state: s, .. } => s,
        }
    }

    pub fn is_restored(&self) -> bool {
        matches!(self, LoadOutcome::Restored(_))
    }
}

/// Serialize `state` into the current envelope format.
pub fn encode(state: &GameState) -> Result<String> {
    let env = Envelope {
        version: SCHEMA_VERSION,
        state: SavedState::from(state),
    };
    serde_json::to_string(&env).context("encoding save envelope")
}

/// Decode a blob. Never fails: anything unusable becomes a fresh game.
pub fn decode(blob: &str, tiers: &TierThresholds) -> LoadOutcome {
    let fresh = |reason| LoadOutcome::Fresh {
        state: GameState::new_game(tiers),
        reason,
    };
    let version = match serde_json::from_str::<VersionProbe>(blob) {
        Ok(p) => p.version,
        Err(err) => {
            warn!(%err, "save blob unreadable, starting fresh");
            return fresh(FreshReason::Corrupt);
        }
    };
    if version != SCHEMA_VERSION {
        warn!(
            found = version,
            expected = SCHEMA_VERSION,
            "save schema mismatch, starting fresh"
        );
        return fresh(FreshReason::VersionMismatch { found: version });
    }
    match serde_json::from_str::<Envelope>(blob) {
        Ok(env) => LoadOutcome::Restored(env.state.into_state(tiers)),
        Err(err) => {
            warn!(%err, "save blob does not match schema, starting fresh");
            fresh(FreshReason::Corrupt)
        }
    }
}

/// Load the state under `key`. Only store I/O failures are errors.
pub fn load(store: &dyn BlobStore, key: &str, tiers: &TierThresholds) -> Result<LoadOutcome> {
    match store.get(key)? {
        Some(blob) => Ok(decode(&blob, tiers)),
        None => {
            debug!(key, "no save found");
            Ok(LoadOutcome::Fresh {
                state: GameState::new_game(tiers),
                reason: FreshReason::Missing,
            })
        }
    }
}

pub fn save(store: &mut dyn BlobStore, key: &str, state: &GameState) -> Result<()> {
    let blob = encode(state)?;
    store.put(key, &blob)
}

/// A store plus the key the game lives under.
pub struct SaveSlot {
    store: Box<dyn BlobStore + Send>,
    key: String,
}

impl SaveSlot {
    /// Slot under [`STORAGE_KEY`].
    pub fn new(store: impl BlobStore + Send + 'static) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: impl BlobStore + Send + 'static, key: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&self, tiers: &TierThresholds) -> Result<LoadOutcome> {
        load(self.store.as_ref(), &self.key, tiers)
    }

    pub fn save(&mut self, state: &GameState) -> Result<()> {
        save(self.store.as_mut(), &self.key, state)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

impl std::fmt::Debug for SaveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSlot").field("key", &self.key).finish()
    }
}
