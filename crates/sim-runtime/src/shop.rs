//! Storefront, purchases and bill acknowledgement.

use rand::Rng;
use sim_core::{Balance, ContentTables, DeathCause, GameState, Item, ItemId, SpecialItem};
use sim_econ::{dismantlement_check, resolve_ending, DismantleTrigger};
use tracing::{debug, info};

use crate::signals::{Ledger, NotificationKind, Outcome, Precondition, Rejection};

/// Items currently offered to the player.
pub fn shop_catalog<'a>(state: &GameState, content: &'a ContentTables) -> Vec<&'a Item> {
    content
        .items()
        .values()
        .filter(|item| item.required_class.map_or(true, |c| c == state.class_tier))
        .filter(|item| item.visible_below_gold.map_or(true, |limit| state.gold < limit))
        .collect()
}

/// Buy `id`. Special items are handled before the generic price check.
pub fn purchase_item<R: Rng + ?Sized>(
    state: &mut GameState,
    content: &ContentTables,
    balance: &Balance,
    id: &ItemId,
    rng: &mut R,
) -> Outcome {
    if state.is_terminal() {
        return Outcome::ignored(Precondition::GameOver);
    }
    let Some(item) = content.item(id) else {
        debug!(item = %id, "purchase of unknown item");
        return Outcome::ignored(Precondition::UnknownItem(id.clone()));
    };
    let month = state.month;
    let rules = &balance.shop;
    let mut ledger = Ledger::new(balance.notification_threshold);
    let mut cause = None;

    match item.special {
        Some(SpecialItem::SellOrgan) => {
            let Some(d) = dismantlement_check(
                state.class_tier,
                state.flags.debt_months,
                state.gold,
                true,
                balance,
            )
            .filter(|d| d.trigger == DismantleTrigger::Active) else {
                return Outcome::rejected(
                    Rejection::OrganSaleLocked { gold: state.gold },
                    "The buyer is not interested. Come back when you are desperate.",
                );
            };
            let (gold, max_hp, hp) = (state.gold, state.max_hp, state.hp);
            d.apply(state);
            ledger.record(NotificationKind::Gold, state.gold - gold, item.name.clone());
            ledger.record(
                NotificationKind::Hp,
                i64::from(state.max_hp - max_hp),
                "Max HP",
            );
            ledger.record(NotificationKind::Hp, i64::from(state.hp - hp), "Surgery");
            state.log(format!(
                "Month {month}: sold an organ, debt {gold} cleared, max HP {max_hp} -> {}",
                state.max_hp
            ));
            info!(month, debt = gold, max_hp = state.max_hp, trigger = ?d.trigger, "organ sale");
            if state.max_hp <= 0 {
                cause = Some(DeathCause::Dismantled);
            }
        }
        Some(SpecialItem::SellBlood) => {
            ledger.gold(state, rules.blood_gold, item.name.clone());
            ledger.hp(state, -rules.blood_hp, item.name.clone());
            state.log(format!("Month {month}: sold blood"));
        }
        Some(SpecialItem::Lottery) => {
            ledger.gold(state, -item.price, item.name.clone());
            ledger.san(state, rules.lottery_san, "Hope");
            if rng.gen_bool(rules.lottery_odds) {
                ledger.gold(state, rules.lottery_prize, "Jackpot!");
                state.log(format!("Month {month}: won the lottery"));
                info!(month, prize = rules.lottery_prize, "lottery win");
            } else {
                state.log(format!("Month {month}: lottery ticket lost"));
            }
        }
        None => {
            if item.price > 0 && state.gold < item.price {
                return Outcome::rejected(
                    Rejection::InsufficientFunds {
                        price: item.price,
                        gold: state.gold,
                    },
                    format!("Insufficient funds for {}", item.name),
                );
            }
            ledger.gold(state, -item.price, item.name.clone());
            let fx = item.effects;
            if fx.max_hp != 0 {
                // items never take the last point of max HP
                let target = state.max_hp.saturating_add(fx.max_hp).max(1);
                ledger.max_hp(state, target - state.max_hp, item.name.clone());
            }
            if fx.hp != 0 {
                ledger.hp(state, fx.hp, item.name.clone());
            }
            if fx.san != 0 {
                ledger.san(state, fx.san, item.name.clone());
            }
            state.inventory.push(item.id.clone());
            state.refresh_markers(content.items());
            state.log(format!("Month {month}: bought {} for {}", item.id, item.price));
        }
    }

    state.clamp_vitals();
    state.refresh_class(&balance.tiers);
    if cause.is_none() && state.hp <= 0 {
        cause = Some(DeathCause::Hp);
    }
    let ending = resolve_ending(state, cause, &balance.endings);
    if let Some(end) = &ending {
        state.log(format!("Month {month}: ending {end}"));
        info!(month, ending = %end, "game over after purchase");
    }
    state.ending = ending.clone();
    ledger.finish(None, ending)
}

/// Acknowledge the active bill. Its amount was charged when it fired.
pub fn dismiss_bill(state: &mut GameState) -> Outcome {
    if state.is_terminal() {
        return Outcome::ignored(Precondition::GameOver);
    }
    match state.active_bill.take() {
        Some(bill) => {
            state.log(format!("Month {}: acknowledged {}", state.month, bill.id));
            Ledger::new(1).finish(None, None)
        }
        None => Outcome::ignored(Precondition::NoActiveBill),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Status;
    use crate::testkit::{content, fresh};
    use proptest::prelude::*;
    use sim_econ::ScriptedRng;

    fn buy(s: &mut GameState, id: &str, rng: &mut ScriptedRng) -> Outcome {
        purchase_item(s, &content(), &Balance::default(), &ItemId::new(id), rng)
    }

    #[test]
    fn generic_purchase_charges_and_applies_effects() {
        let mut s = fresh();
        s.hp = 50;
        let out = buy(&mut s, "I01", &mut ScriptedRng::default());
        assert!(out.is_applied());
        assert_eq!((s.gold, s.hp), (95, 53));
        assert_eq!(s.inventory, vec![ItemId::new("I01")]);
    }

    #[test]
    fn insufficient_funds_is_rejected_without_change() {
        let mut s = fresh();
        let before = s.clone();
        let out = buy(&mut s, "I05", &mut ScriptedRng::default());
        assert_eq!(
            out.status,
            Status::Rejected(Rejection::InsufficientFunds { price: 400, gold: 100 })
        );
        assert_eq!(out.notifications[0].kind, NotificationKind::Error);
        assert_eq!(s, before);
    }

    #[test]
    fn unknown_item_is_ignored() {
        let mut s = fresh();
        let out = buy(&mut s, "NOPE", &mut ScriptedRng::default());
        assert_eq!(
            out.status,
            Status::Ignored(Precondition::UnknownItem(ItemId::new("NOPE")))
        );
    }

    #[test]
    fn key_item_sets_marker() {
        let mut s = fresh();
        buy(&mut s, "I10", &mut ScriptedRng::default());
        assert!(s.has_marker("red_book"));
    }

    #[test]
    fn blood_sale_is_unconditional() {
        let mut s = fresh();
        buy(&mut s, "D01", &mut ScriptedRng::default());
        assert_eq!((s.gold, s.hp), (140, 85));
        assert!(s.inventory.is_empty());
    }

    #[test]
    fn blood_sale_can_kill() {
        let mut s = fresh();
        s.hp = 10;
        let out = buy(&mut s, "D01", &mut ScriptedRng::default());
        assert_eq!(s.hp, 0);
        assert_eq!(s.ending.as_ref().map(|e| e.as_str()), Some("ED-02"));
        assert_eq!(out.ending, s.ending);
    }

    #[test]
    fn organ_sale_needs_deep_debt() {
        let mut s = fresh();
        s.gold = -1500;
        s.refresh_class(&Balance::default().tiers);
        let before = s.clone();
        let out = buy(&mut s, "D05", &mut ScriptedRng::default());
        assert!(matches!(out.status, Status::Rejected(Rejection::OrganSaleLocked { .. })));
        assert_eq!(s, before);

        s.gold = -2500;
        s.refresh_class(&Balance::default().tiers);
        let out = buy(&mut s, "D05", &mut ScriptedRng::default());
        assert!(out.is_applied());
        assert_eq!((s.gold, s.max_hp, s.flags.debt_months), (0, 50, 0));
        assert_eq!(s.class_tier, sim_core::ClassTier::Worker);
    }

    #[test]
    fn organ_sale_on_last_max_hp_is_fatal() {
        let mut s = fresh();
        s.gold = -2500;
        s.max_hp = 1;
        s.hp = 1;
        s.refresh_class(&Balance::default().tiers);
        buy(&mut s, "D05", &mut ScriptedRng::default());
        assert_eq!(s.ending.as_ref().map(|e| e.as_str()), Some("ED-03"));
    }

    #[test]
    fn organ_sale_ignores_the_passive_trigger() {
        let mut s = fresh();
        s.gold = -500;
        s.flags.debt_months = 3;
        s.refresh_class(&Balance::default().tiers);
        assert_eq!(s.class_tier, sim_core::ClassTier::Homeless);
        let out = buy(&mut s, "D05", &mut ScriptedRng::default());
        assert_eq!(
            out.status,
            Status::Rejected(Rejection::OrganSaleLocked { gold: -500 })
        );
        assert_eq!((s.gold, s.max_hp), (-500, 100));
    }

    #[test]
    fn lottery_charges_and_sometimes_pays() {
        let mut s = fresh();
        buy(&mut s, "I13", &mut ScriptedRng::new([ScriptedRng::MISS]));
        assert_eq!((s.gold, s.sanity), (90, 51));
        buy(&mut s, "I13", &mut ScriptedRng::new([ScriptedRng::HIT]));
        assert_eq!((s.gold, s.sanity), (5_080, 52));
    }

    #[test]
    fn catalog_respects_class_and_desperation() {
        let c = content();
        let mut s = fresh();
        let ids = |s: &GameState| -> Vec<String> {
            shop_catalog(s, &c).iter().map(|i| i.id.to_string()).collect()
        };
        let worker = ids(&s);
        assert!(worker.contains(&"I01".to_string()));
        assert!(!worker.contains(&"D05".to_string()));
        assert!(!worker.contains(&"I08".to_string()));
        s.gold = -2500;
        s.refresh_class(&Balance::default().tiers);
        assert!(ids(&s).contains(&"D05".to_string()));
        s.gold = 30_000;
        s.refresh_class(&Balance::default().tiers);
        assert!(ids(&s).contains(&"I08".to_string()));
    }

    #[test]
    fn bill_dismissal() {
        let mut s = fresh();
        assert_eq!(
            dismiss_bill(&mut s).status,
            Status::Ignored(Precondition::NoActiveBill)
        );
        s.active_bill = Some(sim_econ::fallback_bill(-50));
        assert!(dismiss_bill(&mut s).is_applied());
        assert!(s.active_bill.is_none());
        assert_eq!(s.gold, 100);
    }

    proptest! {
        #[test]
        fn purchases_keep_vitals_in_range(hp in 1i32..=100, san in 0i32..=100, gold in -5_000i64..300_000, pick in 0usize..13) {
            let c = content();
            let mut s = fresh();
            s.hp = hp;
            s.sanity = san;
            s.gold = gold;
            s.refresh_class(&Balance::default().tiers);
            let id = c.items().keys().nth(pick % c.items().len()).cloned().unwrap();
            let mut rng = ScriptedRng::new([ScriptedRng::MISS]);
            purchase_item(&mut s, &c, &Balance::default(), &id, &mut rng);
            prop_assert!(0 <= s.hp && s.hp <= s.max_hp);
            prop_assert!((0..=100).contains(&s.sanity));
        }
    }
}
