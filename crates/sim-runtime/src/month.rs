//! Month settlement.

use rand::Rng;
use sim_core::{Balance, ContentTables, DeathCause, GameState};
use sim_econ::{
    debt_hp_penalty, dismantlement_check, resolve_ending, salary, select_bill, select_event,
};
use tracing::{debug, info};

use crate::signals::{Ledger, MonthlySummary, NotificationKind, Outcome, Precondition};

/// Close the current month.
///
/// Order matters: pay by the old tier, take exposure damage, count debt,
/// dismantle or collect debt in flesh, re-derive the tier, then either die or
/// roll for a bill (events only when no bill fires), and finally tick the
/// clock and look for an ending.
pub fn advance_month<R: Rng + ?Sized>(
    state: &mut GameState,
    content: &ContentTables,
    balance: &Balance,
    rng: &mut R,
) -> Outcome {
    if state.is_terminal() {
        debug!(month = state.month, "advance_month on a finished game");
        return Outcome::ignored(Precondition::GameOver);
    }
    // unanswered prompts from last month lapse
    state.active_bill = None;
    state.current_event = None;

    let month = state.month;
    let mut ledger = Ledger::new(balance.notification_threshold);
    let mut notes = Vec::new();

    state.refresh_class(&balance.tiers);
    let profile = content.class(state.class_tier);
    let mut income = salary(profile.base_salary, state.sanity, &balance.salary_bands);
    let mut expenses = profile.monthly_cost;
    ledger.gold(state, income, format!("{} wages", profile.name));
    ledger.gold(state, -expenses, "Cost of living");

    if profile.exposure_hp > 0 {
        ledger.hp(state, -profile.exposure_hp, "Exposure");
        notes.push(format!("The street took {} HP.", profile.exposure_hp));
    }

    if state.gold < 0 {
        state.flags.debt_months += 1;
    } else {
        state.flags.debt_months = 0;
    }

    let closing_tier = state.class_tier;
    let dismantled = dismantlement_check(
        closing_tier,
        state.flags.debt_months,
        state.gold,
        false,
        balance,
    );
    if let Some(d) = dismantled {
        let (gold, max_hp, hp) = (state.gold, state.max_hp, state.hp);
        d.apply(state);
        ledger.record(NotificationKind::Gold, state.gold - gold, "Debt written off");
        ledger.record(
            NotificationKind::Hp,
            i64::from(state.max_hp - max_hp),
            "Organs repossessed",
        );
        ledger.record(NotificationKind::Hp, i64::from(state.hp - hp), "Surgery");
        notes.push("Your debts were settled in flesh.".to_string());
        state.log(format!(
            "Month {month}: dismantled, debt {gold} cleared, max HP {max_hp} -> {}",
            state.max_hp
        ));
        info!(month, debt = gold, max_hp = state.max_hp, "passive dismantlement");
    } else {
        let penalty = debt_hp_penalty(state.gold, balance.debt_hp_divisor);
        if penalty > 0 {
            ledger.hp(state, -penalty, "Debt stress");
            notes.push(format!("Owing {} cost you {penalty} HP.", -state.gold));
        }
    }

    state.clamp_vitals();
    state.refresh_class(&balance.tiers);

    if state.hp <= 0 {
        let cause = if dismantled.is_some() {
            DeathCause::Dismantled
        } else {
            DeathCause::Hp
        };
        let ending = resolve_ending(state, Some(cause), &balance.endings);
        if let Some(id) = &ending {
            state.log(format!("Month {month}: died ({cause:?}), ending {id}"));
            info!(month, ending = %id, ?cause, "game over");
        }
        state.ending = ending.clone();
        let summary = MonthlySummary {
            month,
            income,
            expenses,
            notes,
        };
        return ledger.finish(Some(summary), ending);
    }

    if dismantled.is_none() {
        if let Some(bill) = select_bill(state.gold, state.class_tier, content.bills(), balance, rng)
        {
            ledger.gold(state, bill.amount, bill.name.clone());
            if bill.amount < 0 {
                expenses += -bill.amount;
            } else {
                income += bill.amount;
            }
            // a bill that tips the balance into debt starts the count this month
            if state.gold < 0 && state.flags.debt_months == 0 {
                state.flags.debt_months = 1;
            } else if state.gold >= 0 {
                state.flags.debt_months = 0;
            }
            state.refresh_class(&balance.tiers);
            notes.push(format!("Bill: {} ({})", bill.name, bill.amount));
            state.log(format!("Month {month}: bill {} {}", bill.id, bill.amount));
            debug!(month, bill = %bill.id, amount = bill.amount, "bill fired");
            state.active_bill = Some(bill);
        } else if let Some(event) = select_event(
            state.class_tier,
            state.sanity,
            content.events(),
            &state.inventory,
            balance.event_chance,
            rng,
        ) {
            state.log(format!("Month {month}: event {}", event.id));
            debug!(month, event = %event.id, "event drawn");
            state.current_event = Some(event.clone());
        }
    }

    state.log(format!("Month {month}: +{income} / -{expenses}, gold {}", state.gold));
    state.month += 1;

    let ending = resolve_ending(state, None, &balance.endings);
    if let Some(id) = &ending {
        state.log(format!("Month {}: ending {id}", state.month));
        info!(month = state.month, ending = %id, "game finished");
    }
    state.ending = ending.clone();

    ledger.finish(
        Some(MonthlySummary {
            month,
            income,
            expenses,
            notes,
        }),
        ending,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Feedback, Status};
    use crate::testkit::{content, fresh};
    use proptest::prelude::*;
    use sim_core::{ClassTier, TierThresholds};
    use sim_econ::{seeded_rng, ScriptedRng};

    const QUIET: [u64; 2] = [ScriptedRng::MISS, ScriptedRng::MISS];

    #[test]
    fn quiet_month_pays_worker_wages() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        let out = advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert!(out.is_applied());
        assert_eq!(s.gold, 100 + 3200 - 2400);
        assert_eq!(s.month, 2);
        assert_eq!(s.class_tier, ClassTier::Worker);
        assert!(s.active_bill.is_none() && s.current_event.is_none());
        let summary = out.summary.unwrap();
        assert_eq!((summary.income, summary.expenses), (3200, 2400));
    }

    #[test]
    fn homeless_debt_spiral_is_dismantled() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.gold = -2500;
        s.refresh_class(&b.tiers);
        s.flags.debt_months = 3;
        assert_eq!(s.class_tier, ClassTier::Homeless);
        // no draws scripted: any bill or event roll would panic
        let out = advance_month(&mut s, &c, &b, &mut ScriptedRng::default());
        assert_eq!(s.gold, 0);
        assert_eq!(s.flags.debt_months, 0);
        assert_eq!(s.max_hp, 50);
        assert!(s.hp <= 50);
        assert!(s.active_bill.is_none() && s.current_event.is_none());
        assert_eq!(s.month, 2);
        assert_eq!(s.class_tier, ClassTier::Worker);
        assert!(out.notifications.iter().any(|n| n.message == "Debt written off"));
    }

    #[test]
    fn debt_is_collected_in_hp() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.gold = -3000;
        s.refresh_class(&b.tiers);
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        // homeless wage 50, exposure 10, then 1 HP per 10 owed
        assert_eq!(s.gold, -2950);
        assert_eq!(s.hp, 0);
        assert!(s.is_terminal());
    }

    #[test]
    fn dying_stops_the_clock_and_skips_rolls() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.gold = -3000;
        s.refresh_class(&b.tiers);
        let out = advance_month(&mut s, &c, &b, &mut ScriptedRng::default());
        assert_eq!(s.month, 1);
        assert_eq!(s.ending.as_ref().map(|e| e.as_str()), Some("ED-01"));
        assert_eq!(out.ending, s.ending);
        assert_eq!(out.feedback, Feedback::Damage);
    }

    #[test]
    fn debt_months_count_and_reset() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.gold = -500;
        s.hp = 100;
        s.refresh_class(&b.tiers);
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert_eq!(s.flags.debt_months, 1);
        s.hp = 100;
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert_eq!(s.flags.debt_months, 2);
        s.gold = 10;
        s.hp = 100;
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert_eq!(s.flags.debt_months, 0);
    }

    #[test]
    fn fired_bill_is_charged_and_blocks_event() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        // bill roll hits, first eligible bill is picked, no event roll follows
        let mut rng = ScriptedRng::new([ScriptedRng::HIT, ScriptedRng::HIT]);
        advance_month(&mut s, &c, &b, &mut rng);
        let bill = s.active_bill.clone().unwrap();
        assert_eq!(s.gold, 900 + bill.amount);
        assert!(s.current_event.is_none());
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn bill_that_tips_into_debt_starts_the_count() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        let mut rng = ScriptedRng::new([ScriptedRng::HIT, ScriptedRng::HIT]);
        advance_month(&mut s, &c, &b, &mut rng);
        assert_eq!(s.active_bill.as_ref().map(|b| b.id.as_str()), Some("BILL_ER"));
        assert_eq!(s.gold, -900);
        assert_eq!(s.flags.debt_months, 1);
        assert_eq!(s.class_tier, ClassTier::Homeless);
    }

    #[test]
    fn passive_dismantlement_uses_the_closing_tier() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        // a Worker at sanity 80 earns 1920 against 2400 of costs
        s.gold = 0;
        s.sanity = 80;
        s.flags.debt_months = 2;
        s.refresh_class(&b.tiers);
        assert_eq!(s.class_tier, ClassTier::Worker);
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert_eq!(s.gold, -480);
        assert_eq!(s.flags.debt_months, 3);
        assert_eq!(s.max_hp, 100);
        assert_eq!(s.hp, 100 - 48);
        assert_eq!(s.class_tier, ClassTier::Homeless);
    }

    #[test]
    fn event_drawn_when_no_bill() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        let mut rng = ScriptedRng::new([ScriptedRng::MISS, ScriptedRng::HIT, ScriptedRng::HIT]);
        advance_month(&mut s, &c, &b, &mut rng);
        assert!(s.active_bill.is_none());
        assert!(s.current_event.is_some());
    }

    #[test]
    fn stale_prompts_lapse_at_month_start() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.current_event = c.events().first().cloned();
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert!(s.current_event.is_none());
    }

    #[test]
    fn month_forty_ends_the_game() {
        let (c, b) = (content(), Balance::default());
        let mut s = fresh();
        s.month = 39;
        advance_month(&mut s, &c, &b, &mut ScriptedRng::new(QUIET));
        assert_eq!(s.month, 40);
        assert_eq!(s.ending.as_ref().map(|e| e.as_str()), Some("ED-06"));
        let before = s.clone();
        let out = advance_month(&mut s, &c, &b, &mut ScriptedRng::default());
        assert_eq!(out.status, Status::Ignored(Precondition::GameOver));
        assert_eq!(s, before);
    }

    proptest! {
        #[test]
        fn never_both_bill_and_event(seed in any::<u64>(), gold in -6_000i64..600_000, san in 0i32..=100) {
            let (c, b) = (content(), Balance::default());
            let mut s = fresh();
            s.gold = gold;
            s.sanity = san;
            s.refresh_class(&TierThresholds::default());
            let mut rng = seeded_rng(seed);
            for _ in 0..12 {
                advance_month(&mut s, &c, &b, &mut rng);
                prop_assert!(!(s.active_bill.is_some() && s.current_event.is_some()));
                prop_assert!(0 <= s.hp && s.hp <= s.max_hp);
                prop_assert!((0..=100).contains(&s.sanity));
                prop_assert_eq!(s.class_tier, b.tiers.tier_for(s.gold));
                prop_assert_eq!(s.gold < 0, s.flags.debt_months > 0);
            }
        }
    }
}
