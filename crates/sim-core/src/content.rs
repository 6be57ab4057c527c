//! Content tables: the immutable catalogs of classes, items, bills, events,
//! endings and archives, plus their load-time validation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::ending_ids;
use crate::state::{ClassTier, DeathCause, StancePoints};
use crate::ValidationError;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

content_id!(
    /// Shop or event item identifier, e.g. "I13".
    ItemId
);
content_id!(
    /// Bill identifier.
    BillId
);
content_id!(
    /// Narrative event identifier.
    EventId
);
content_id!(
    /// Archive document identifier, e.g. "No.05".
    ArchiveId
);
content_id!(
    /// Ending identifier, e.g. "ED-06".
    EndingId
);

/// Per-tier economics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassProfile {
    pub tier: ClassTier,
    pub name: String,
    pub base_salary: i64,
    pub monthly_cost: i64,
    /// Multiplier `M` in the choice matrix.
    pub leverage: f64,
    /// HP lost to exposure every month spent in this tier.
    #[serde(default)]
    pub exposure_hp: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ItemEffects {
    pub hp: i32,
    pub san: i32,
    pub max_hp: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemTag {
    Consumer,
    Awakening,
    DarkWeb,
    Weapon,
    Ticket,
}

/// Items that bypass the generic price/effect purchase path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialItem {
    SellOrgan,
    SellBlood,
    Lottery,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub effects: ItemEffects,
    #[serde(default)]
    pub tags: Vec<ItemTag>,
    #[serde(default)]
    pub required_class: Option<ClassTier>,
    /// Only listed in the shop while gold is below this value.
    #[serde(default)]
    pub visible_below_gold: Option<i64>,
    #[serde(default)]
    pub special: Option<SpecialItem>,
    /// Marker held while this item is owned.
    #[serde(default)]
    pub key_flag: Option<String>,
    pub flavor_text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillKind {
    Surprise,
    JumpScare,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BillTrigger {
    pub min_gold: Option<i64>,
    pub max_gold: Option<i64>,
    pub required_class: Option<Vec<ClassTier>>,
    pub debt_only: bool,
}

impl BillTrigger {
    pub fn admits(&self, gold: i64, tier: ClassTier) -> bool {
        if self.debt_only && gold >= 0 {
            return false;
        }
        if let Some(classes) = &self.required_class {
            if !classes.contains(&tier) {
                return false;
            }
        }
        if self.min_gold.is_some_and(|min| gold < min) {
            return false;
        }
        if self.max_gold.is_some_and(|max| gold > max) {
            return false;
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bill {
    pub id: BillId,
    pub name: String,
    /// Gold delta applied when the bill fires; negative is an expense.
    pub amount: i64,
    pub kind: BillKind,
    #[serde(default)]
    pub trigger: BillTrigger,
    pub flavor_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventText {
    pub low_san: String,
    pub high_san: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventConditions {
    pub min_san: Option<i32>,
    pub max_san: Option<i32>,
    pub required_class: Option<Vec<ClassTier>>,
    pub has_item: Option<ItemId>,
}

impl EventConditions {
    pub fn admits(&self, tier: ClassTier, sanity: i32, inventory: &[ItemId]) -> bool {
        if self.min_san.is_some_and(|min| sanity < min) {
            return false;
        }
        if self.max_san.is_some_and(|max| sanity > max) {
            return false;
        }
        if let Some(classes) = &self.required_class {
            if !classes.contains(&tier) {
                return false;
            }
        }
        match &self.has_item {
            Some(item) => inventory.contains(item),
            None => true,
        }
    }
}

/// Item change attached to an option; negative counts remove copies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemGrant {
    pub item_id: ItemId,
    pub count: i32,
}

/// Event-specific data of one option. The stat deltas come from the choice
/// matrix, not from here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventOption {
    pub label: String,
    #[serde(default)]
    pub stance: StancePoints,
    #[serde(default)]
    pub items: Vec<ItemGrant>,
    #[serde(default)]
    pub death_cause: Option<DeathCause>,
    #[serde(default)]
    pub archive_id: Option<ArchiveId>,
}

/// The four archetype options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionId {
    /// Sell out.
    A,
    /// Go along.
    B,
    /// Buy relief.
    C,
    /// Wake up.
    D,
}

impl OptionId {
    pub const ALL: [OptionId; 4] = [OptionId::A, OptionId::B, OptionId::C, OptionId::D];
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptionId::A => "A",
            OptionId::B => "B",
            OptionId::C => "C",
            OptionId::D => "D",
        };
        f.write_str(s)
    }
}

impl FromStr for OptionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionId::A),
            "B" => Ok(OptionId::B),
            "C" => Ok(OptionId::C),
            "D" => Ok(OptionId::D),
            other => Err(format!("unknown option {other:?}, expected A-D")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventOptions {
    pub a: EventOption,
    pub b: EventOption,
    pub c: EventOption,
    pub d: EventOption,
}

impl EventOptions {
    pub fn get(&self, id: OptionId) -> &EventOption {
        match id {
            OptionId::A => &self.a,
            OptionId::B => &self.b,
            OptionId::C => &self.c,
            OptionId::D => &self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventOption> {
        [&self.a, &self.b, &self.c, &self.d].into_iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub text: EventText,
    #[serde(default)]
    pub conditions: EventConditions,
    pub options: EventOptions,
}

impl Event {
    /// Narrative variant for the reader's current sanity.
    pub fn text_for(&self, sanity: i32) -> &str {
        if sanity < 50 {
            &self.text.low_san
        } else {
            &self.text.high_san
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndingKind {
    Death,
    Survival,
    Alienation,
    Stance,
    Ur,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ending {
    pub id: EndingId,
    pub title: String,
    pub description: String,
    pub priority: i32,
    pub kind: EndingKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Archive {
    pub id: ArchiveId,
    pub title: String,
    pub flavor_text: String,
}

/// Content exactly as it arrives from the JSON arrays, before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawContent {
    pub classes: Vec<ClassProfile>,
    pub items: Vec<Item>,
    pub bills: Vec<Bill>,
    pub events: Vec<Event>,
    pub endings: Vec<Ending>,
    pub archives: Vec<Archive>,
}

pub type ItemTable = BTreeMap<ItemId, Item>;

/// Validated, indexed content. Only obtainable through [`validate_content`].
#[derive(Clone, Debug)]
pub struct ContentTables {
    classes: [ClassProfile; 4],
    items: ItemTable,
    bills: Vec<Bill>,
    events: Vec<Event>,
    endings: BTreeMap<EndingId, Ending>,
    archives: BTreeMap<ArchiveId, Archive>,
}

impl ContentTables {
    pub fn class(&self, tier: ClassTier) -> &ClassProfile {
        &self.classes[tier.index()]
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn items(&self) -> &ItemTable {
        &self.items
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn ending(&self, id: &EndingId) -> Option<&Ending> {
        self.endings.get(id)
    }

    pub fn archive(&self, id: &ArchiveId) -> Option<&Archive> {
        self.archives.get(id)
    }
}

fn require_name(table: &'static str, id: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            table,
            id: id.to_string(),
            field: "name",
        });
    }
    Ok(())
}

fn index_unique<K: Ord + Clone + fmt::Display, V>(
    table: &'static str,
    rows: Vec<V>,
    key: impl Fn(&V) -> &K,
) -> Result<BTreeMap<K, V>, ValidationError> {
    let mut out = BTreeMap::new();
    for row in rows {
        let k = key(&row).clone();
        if out.contains_key(&k) {
            return Err(ValidationError::DuplicateId {
                table,
                id: k.to_string(),
            });
        }
        out.insert(k, row);
    }
    Ok(out)
}

fn validate_classes(rows: Vec<ClassProfile>) -> Result<[ClassProfile; 4], ValidationError> {
    let mut slots: [Option<ClassProfile>; 4] = Default::default();
    for c in rows {
        require_name("classes", &format!("{:?}", c.tier), &c.name)?;
        if !c.leverage.is_finite()
            || c.leverage < 0.0
            || c.base_salary < 0
            || c.monthly_cost < 0
            || c.exposure_hp < 0
        {
            return Err(ValidationError::InvalidClass(c.tier));
        }
        let slot = &mut slots[c.tier.index()];
        if slot.is_some() {
            return Err(ValidationError::DuplicateId {
                table: "classes",
                id: format!("{:?}", c.tier),
            });
        }
        *slot = Some(c);
    }
    let [homeless, worker, middle, capitalist] = slots;
    match (homeless, worker, middle, capitalist) {
        (Some(h), Some(w), Some(m), Some(c)) => Ok([h, w, m, c]),
        (h, w, m, _) => {
            let missing = if h.is_none() {
                ClassTier::Homeless
            } else if w.is_none() {
                ClassTier::Worker
            } else if m.is_none() {
                ClassTier::Middle
            } else {
                ClassTier::Capitalist
            };
            Err(ValidationError::MissingClass(missing))
        }
    }
}

fn check_event(
    event: &Event,
    items: &ItemTable,
    archives: &BTreeMap<ArchiveId, Archive>,
) -> Result<(), ValidationError> {
    require_name("events", event.id.as_str(), &event.title)?;
    let c = &event.conditions;
    let in_range = |v: Option<i32>| v.map_or(true, |v| (0..=100).contains(&v));
    let ordered = match (c.min_san, c.max_san) {
        (Some(lo), Some(hi)) => lo <= hi,
        _ => true,
    };
    if !(in_range(c.min_san) && in_range(c.max_san) && ordered) {
        return Err(ValidationError::InvalidSanityRange(event.id.to_string()));
    }
    let unknown = |target: String| ValidationError::UnknownReference {
        table: "events",
        id: event.id.to_string(),
        target,
    };
    if let Some(item) = &c.has_item {
        if !items.contains_key(item) {
            return Err(unknown(item.to_string()));
        }
    }
    for option in event.options.iter() {
        for grant in &option.items {
            if !items.contains_key(&grant.item_id) {
                return Err(unknown(grant.item_id.to_string()));
            }
        }
        if let Some(archive) = &option.archive_id {
            if !archives.contains_key(archive) {
                return Err(unknown(archive.to_string()));
            }
        }
    }
    Ok(())
}

/// Validate raw content and index it. Any malformed entry is fatal.
pub fn validate_content(raw: RawContent) -> Result<ContentTables, ValidationError> {
    let classes = validate_classes(raw.classes)?;

    for item in &raw.items {
        require_name("items", item.id.as_str(), &item.name)?;
    }
    let items = index_unique("items", raw.items, |i| &i.id)?;

    for a in &raw.archives {
        require_name("archives", a.id.as_str(), &a.title)?;
    }
    let archives = index_unique("archives", raw.archives, |a| &a.id)?;

    let mut bill_ids = BTreeSet::new();
    for bill in &raw.bills {
        require_name("bills", bill.id.as_str(), &bill.name)?;
        if !bill_ids.insert(&bill.id) {
            return Err(ValidationError::DuplicateId {
                table: "bills",
                id: bill.id.to_string(),
            });
        }
        if let (Some(lo), Some(hi)) = (bill.trigger.min_gold, bill.trigger.max_gold) {
            if lo > hi {
                return Err(ValidationError::InvalidTrigger(bill.id.to_string()));
            }
        }
    }

    let mut event_ids = BTreeSet::new();
    for event in &raw.events {
        if !event_ids.insert(&event.id) {
            return Err(ValidationError::DuplicateId {
                table: "events",
                id: event.id.to_string(),
            });
        }
        check_event(event, &items, &archives)?;
    }

    for e in &raw.endings {
        require_name("endings", e.id.as_str(), &e.title)?;
    }
    let endings = index_unique("endings", raw.endings, |e| &e.id)?;
    for id in ending_ids::ALL {
        if !endings.contains_key(&EndingId::new(*id)) {
            return Err(ValidationError::MissingEnding(id.to_string()));
        }
    }

    Ok(ContentTables {
        classes,
        items,
        bills: raw.bills,
        events: raw.events,
        endings,
        archives,
    })
}
