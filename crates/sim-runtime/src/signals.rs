//! UI-facing side signals: notifications, feedback tags, monthly summaries and
//! the status of every engine operation.

use sim_core::{EndingId, GameState, ItemId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Gold,
    Hp,
    San,
    Info,
    Warning,
    Error,
}

/// Transient feedback for one discrete change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Signed change; 0 for info/warning/error.
    pub delta: i64,
    pub message: String,
}

/// Cosmetic effect hint for the last action. Never read back by logic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Feedback {
    Damage,
    Heal,
    #[default]
    Neutral,
}

/// Settlement of one month, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonthlySummary {
    /// The month that was closed.
    pub month: u32,
    pub income: i64,
    pub expenses: i64,
    pub notes: Vec<String>,
}

/// User-visible refusal. State is unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    InsufficientFunds { price: i64, gold: i64 },
    /// The organ buyer only deals with the desperate.
    OrganSaleLocked { gold: i64 },
}

/// Precondition that made an operation a no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    GameOver,
    NoActiveEvent,
    NoActiveBill,
    UnknownItem(ItemId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Applied,
    Rejected(Rejection),
    Ignored(Precondition),
}

/// Result of an engine operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub notifications: Vec<Notification>,
    pub feedback: Feedback,
    pub summary: Option<MonthlySummary>,
    /// Set when this operation ended the game.
    pub ending: Option<EndingId>,
}

impl Outcome {
    pub fn ignored(why: Precondition) -> Self {
        Self {
            status: Status::Ignored(why),
            notifications: Vec::new(),
            feedback: Feedback::Neutral,
            summary: None,
            ending: None,
        }
    }

    pub fn rejected(why: Rejection, message: impl Into<String>) -> Self {
        Self {
            status: Status::Rejected(why),
            notifications: vec![Notification {
                kind: NotificationKind::Error,
                delta: 0,
                message: message.into(),
            }],
            feedback: Feedback::Neutral,
            summary: None,
            ending: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == Status::Applied
    }
}

/// Applies stat changes to a state while recording the notifications they
/// produce. Vitals are clamped after every change and the recorded delta is
/// the one that actually landed.
#[derive(Debug)]
pub(crate) struct Ledger {
    threshold: i64,
    notifications: Vec<Notification>,
    damaged: bool,
    healed: bool,
}

impl Ledger {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold: threshold.max(1),
            notifications: Vec::new(),
            damaged: false,
            healed: false,
        }
    }

    /// Record a change that was already applied.
    pub fn record(&mut self, kind: NotificationKind, delta: i64, message: impl Into<String>) {
        if kind == NotificationKind::Hp {
            self.damaged |= delta < 0;
            self.healed |= delta > 0;
        }
        if delta.abs() >= self.threshold {
            self.notifications.push(Notification {
                kind,
                delta,
                message: message.into(),
            });
        }
    }

    pub fn message(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifications.push(Notification {
            kind,
            delta: 0,
            message: message.into(),
        });
    }

    pub fn gold(&mut self, state: &mut GameState, delta: i64, message: impl Into<String>) {
        state.gold = state.gold.saturating_add(delta);
        self.record(NotificationKind::Gold, delta, message);
    }

    pub fn hp(&mut self, state: &mut GameState, delta: i32, message: impl Into<String>) {
        let before = state.hp;
        state.hp = state.hp.saturating_add(delta);
        state.clamp_vitals();
        self.record(NotificationKind::Hp, i64::from(state.hp - before), message);
    }

    pub fn max_hp(&mut self, state: &mut GameState, delta: i32, message: impl Into<String>) {
        let before = state.max_hp;
        state.max_hp = state.max_hp.saturating_add(delta);
        state.clamp_vitals();
        self.record(NotificationKind::Hp, i64::from(state.max_hp - before), message);
    }

    pub fn san(&mut self, state: &mut GameState, delta: i32, message: impl Into<String>) {
        let before = state.sanity;
        state.sanity = state.sanity.saturating_add(delta);
        state.clamp_vitals();
        self.record(NotificationKind::San, i64::from(state.sanity - before), message);
    }

    pub fn finish(self, summary: Option<MonthlySummary>, ending: Option<EndingId>) -> Outcome {
        let feedback = if self.damaged {
            Feedback::Damage
        } else if self.healed {
            Feedback::Heal
        } else {
            Feedback::Neutral
        };
        Outcome {
            status: Status::Applied,
            notifications: self.notifications,
            feedback,
            summary,
            ending,
        }
    }
}
