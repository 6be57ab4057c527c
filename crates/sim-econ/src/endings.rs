//! Ending resolver: maps a state snapshot to a terminal outcome.
//!
//! Priority cascade, first match wins:
//! 1. death (`hp <= 0` or an explicit cause)
//! 2. nothing else before `min_month`
//! 3. hidden ending
//! 4. madness
//! 5. stance alignment
//! 6. survival by class

use sim_core::{ending_ids, ClassTier, DeathCause, EndingId, EndingRules, GameState};

/// Resolve the ending for `state`. `None` means the game goes on.
pub fn resolve_ending(
    state: &GameState,
    cause: Option<DeathCause>,
    rules: &EndingRules,
) -> Option<EndingId> {
    let id = death_ending(state, cause, rules)
        .or_else(|| {
            if state.month < rules.min_month {
                return None;
            }
            hidden_ending(state, rules)
                .or_else(|| madness_ending(state, rules))
                .or_else(|| stance_ending(state, rules))
                .or(Some(survival_ending(state, rules)))
        })?;
    Some(EndingId::new(id))
}

fn death_ending(
    state: &GameState,
    cause: Option<DeathCause>,
    rules: &EndingRules,
) -> Option<&'static str> {
    if state.hp > 0 && cause.is_none() {
        return None;
    }
    let id = match cause {
        Some(DeathCause::Dismantled) => ending_ids::DISMANTLED,
        Some(DeathCause::Cop) => ending_ids::SHOT_BY_POLICE,
        Some(DeathCause::Suicide) => ending_ids::LUCID_DEATH,
        Some(DeathCause::Hp) if state.sanity > rules.lucid_death_sanity => {
            ending_ids::LUCID_DEATH
        }
        _ if state.class_tier == ClassTier::Homeless => ending_ids::STARVED,
        _ => ending_ids::COLLAPSED,
    };
    Some(id)
}

fn hidden_ending(state: &GameState, rules: &EndingRules) -> Option<&'static str> {
    let archives = rules
        .hidden_archives
        .iter()
        .all(|a| state.unlocked_archives.iter().any(|u| u.as_str() == a));
    let insight = archives
        && state.has_marker(&rules.hidden_marker)
        && state.sanity >= rules.hidden_min_sanity;
    insight.then_some(ending_ids::TRUE_INSIGHT)
}

fn madness_ending(state: &GameState, rules: &EndingRules) -> Option<&'static str> {
    if state.sanity >= rules.madness_floor && state.sanity <= rules.madness_ceiling {
        return None;
    }
    if state.gold < rules.wealth_line {
        Some(ending_ids::MADNESS_POOR)
    } else {
        Some(ending_ids::MADNESS_RICH)
    }
}

// Precedence on ties: old, then red, then wolf. Key items tip red and wolf.
fn stance_ending(state: &GameState, rules: &EndingRules) -> Option<&'static str> {
    let s = state.stance;
    if s.old > 0 && s.old >= s.red && s.old >= s.wolf {
        return Some(ending_ids::OLD_STANCE);
    }
    if s.red > 0 && (s.red > s.wolf || state.has_marker(&rules.red_marker)) {
        return Some(ending_ids::RED_STANCE);
    }
    if s.wolf > 0 && (s.wolf > s.red || state.has_marker(&rules.wolf_marker)) {
        return Some(ending_ids::WOLF_STANCE);
    }
    None
}

fn survival_ending(state: &GameState, rules: &EndingRules) -> &'static str {
    match state.class_tier {
        ClassTier::Capitalist => ending_ids::PIG_HAPPINESS,
        ClassTier::Middle => ending_ids::MIDDLE_NIGHTMARE,
        ClassTier::Worker if state.gold < rules.wealth_line => ending_ids::MONTHLY_BATTERY,
        ClassTier::Worker | ClassTier::Homeless => ending_ids::SILENT_CONSUMABLE,
    }
}
