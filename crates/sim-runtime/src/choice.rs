//! Answering the current narrative event.

use sim_core::{Balance, ContentTables, DeathCause, GameState, OptionId};
use sim_econ::{choice_deltas, resolve_ending};
use tracing::{debug, info};

use crate::signals::{Ledger, NotificationKind, Outcome, Precondition};

/// Apply option `option` of the current event and consume the event.
///
/// Stat deltas come from the archetype matrix for the player's tier; the
/// event only contributes stance points, items, an archive and an optional
/// death cause.
pub fn resolve_choice(
    state: &mut GameState,
    content: &ContentTables,
    balance: &Balance,
    option: OptionId,
) -> Outcome {
    if state.is_terminal() {
        return Outcome::ignored(Precondition::GameOver);
    }
    let Some(event) = state.current_event.take() else {
        debug!(month = state.month, %option, "resolve_choice without an event");
        return Outcome::ignored(Precondition::NoActiveEvent);
    };
    let chosen = event.options.get(option);
    let mut ledger = Ledger::new(balance.notification_threshold);

    state.refresh_class(&balance.tiers);
    let profile = content.class(state.class_tier);
    let delta = choice_deltas(
        option,
        profile,
        state.sanity,
        &balance.choices,
        balance.pressure_divisor,
    );
    ledger.hp(state, delta.hp, chosen.label.clone());
    ledger.san(state, delta.san, chosen.label.clone());
    ledger.gold(state, delta.gold, chosen.label.clone());
    state.refresh_class(&balance.tiers);

    state.stance.add(&chosen.stance);

    for grant in &chosen.items {
        let name = content
            .item(&grant.item_id)
            .map_or(grant.item_id.as_str(), |i| i.name.as_str());
        if grant.count > 0 {
            state.grant_item(&grant.item_id, grant.count.unsigned_abs());
            ledger.message(NotificationKind::Info, format!("Obtained {name}"));
        } else if grant.count < 0 {
            let lost = state.take_item(&grant.item_id, grant.count.unsigned_abs());
            if lost > 0 {
                ledger.message(NotificationKind::Info, format!("Lost {name}"));
            }
        }
    }
    if !chosen.items.is_empty() {
        state.refresh_markers(content.items());
    }

    if let Some(archive) = &chosen.archive_id {
        if state.unlocked_archives.insert(archive.clone()) {
            let title = content
                .archive(archive)
                .map_or(archive.as_str(), |a| a.title.as_str());
            ledger.message(NotificationKind::Info, format!("Archive unlocked: {title}"));
        }
    }

    state.log(format!(
        "Month {}: {} -> {option} ({})",
        state.month, event.id, chosen.label
    ));

    let cause = chosen
        .death_cause
        .or_else(|| (state.hp <= 0).then_some(DeathCause::Hp));
    let ending = resolve_ending(state, cause, &balance.endings);
    if let Some(id) = &ending {
        state.log(format!("Month {}: ending {id}", state.month));
        info!(month = state.month, ending = %id, ?cause, "game over after choice");
    }
    state.ending = ending.clone();
    ledger.finish(None, ending)
}
