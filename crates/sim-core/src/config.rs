//! Simulation configuration. Every numeric rule constant lives here so that
//! balancing is data, not code.

use serde::{Deserialize, Serialize};

use crate::state::{ClassTier, SANITY_MAX};
use crate::ValidationError;

/// Simulation configuration parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    pub balance: Balance,
}

/// Lower gold bounds for each tier above Homeless.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub worker: i64,
    pub middle: i64,
    pub capitalist: i64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            worker: 0,
            middle: 25_000,
            capitalist: 500_000,
        }
    }
}

impl TierThresholds {
    /// Pure mapping from gold to tier.
    pub fn tier_for(&self, gold: i64) -> ClassTier {
        if gold < self.worker {
            ClassTier::Homeless
        } else if gold < self.middle {
            ClassTier::Worker
        } else if gold < self.capitalist {
            ClassTier::Middle
        } else {
            ClassTier::Capitalist
        }
    }
}

/// Salary efficiency applies while sanity is `<= max_sanity`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalaryBand {
    pub max_sanity: i32,
    pub efficiency: f64,
}

fn default_salary_bands() -> Vec<SalaryBand> {
    vec![
        SalaryBand { max_sanity: 30, efficiency: 1.1 },
        SalaryBand { max_sanity: 70, efficiency: 1.0 },
        SalaryBand { max_sanity: 90, efficiency: 0.6 },
        SalaryBand { max_sanity: SANITY_MAX, efficiency: 0.1 },
    ]
}

/// Constants of the four-option choice matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoiceMatrix {
    pub sell_out_gold_per_leverage: f64,
    pub sell_out_hp_per_pressure: f64,
    pub sell_out_san: i32,
    pub go_along_gold: i64,
    pub go_along_hp: i32,
    pub go_along_san: i32,
    pub relief_salary_share: f64,
    pub relief_hp: i32,
    pub relief_san: i32,
    /// Tier that pays double for relief.
    pub relief_doubled_for: ClassTier,
    pub wake_up_salary_share: f64,
    pub wake_up_hp_per_pressure: f64,
    pub wake_up_san: i32,
    /// Tier whose awakening counts double.
    pub wake_up_doubled_for: ClassTier,
}

impl Default for ChoiceMatrix {
    fn default() -> Self {
        Self {
            sell_out_gold_per_leverage: 300.0,
            sell_out_hp_per_pressure: 3.0,
            sell_out_san: -4,
            go_along_gold: 50,
            go_along_hp: 2,
            go_along_san: -2,
            relief_salary_share: 0.2,
            relief_hp: 8,
            relief_san: 2,
            relief_doubled_for: ClassTier::Middle,
            wake_up_salary_share: 0.4,
            wake_up_hp_per_pressure: 8.0,
            wake_up_san: 10,
            wake_up_doubled_for: ClassTier::Capitalist,
        }
    }
}

/// Parameters of the shop items that bypass the generic purchase path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopRules {
    pub blood_gold: i64,
    pub blood_hp: i32,
    pub lottery_odds: f64,
    pub lottery_prize: i64,
    pub lottery_san: i32,
}

impl Default for ShopRules {
    fn default() -> Self {
        Self {
            blood_gold: 40,
            blood_hp: 15,
            lottery_odds: 0.01,
            lottery_prize: 5_000,
            lottery_san: 1,
        }
    }
}

/// Thresholds consulted by the ending cascade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndingRules {
    /// No non-death ending fires before this month.
    pub min_month: u32,
    pub hidden_archives: Vec<String>,
    pub hidden_marker: String,
    pub hidden_min_sanity: i32,
    pub madness_floor: i32,
    pub madness_ceiling: i32,
    /// Gold splitting the madness and worker endings.
    pub wealth_line: i64,
    /// Dying of HP loss above this sanity counts as a lucid death.
    pub lucid_death_sanity: i32,
    pub red_marker: String,
    pub wolf_marker: String,
}

impl Default for EndingRules {
    fn default() -> Self {
        Self {
            min_month: 40,
            hidden_archives: vec!["No.16".to_string(), "No.05".to_string()],
            hidden_marker: "red_book".to_string(),
            hidden_min_sanity: 95,
            madness_floor: 10,
            madness_ceiling: 90,
            wealth_line: 1_000,
            lucid_death_sanity: 80,
            red_marker: "red_book".to_string(),
            wolf_marker: "crypto_key".to_string(),
        }
    }
}

/// All balancing constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    pub tiers: TierThresholds,
    #[serde(default = "default_salary_bands")]
    pub salary_bands: Vec<SalaryBand>,
    /// `pressure = 1 + sanity^2 / pressure_divisor`.
    pub pressure_divisor: f64,
    pub bill_chance: f64,
    pub bill_chance_in_debt: f64,
    pub fallback_bill_amount: i64,
    pub event_chance: f64,
    /// One HP lost per this much gold owed.
    pub debt_hp_divisor: i64,
    pub dismantle_debt_months: u32,
    /// Organ sale is only accepted below this gold.
    pub organ_sale_gold_limit: i64,
    /// Smallest absolute delta that produces a notification.
    pub notification_threshold: i64,
    pub choices: ChoiceMatrix,
    pub shop: ShopRules,
    pub endings: EndingRules,
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            tiers: TierThresholds::default(),
            salary_bands: default_salary_bands(),
            pressure_divisor: 2_000.0,
            bill_chance: 0.3,
            bill_chance_in_debt: 0.5,
            fallback_bill_amount: -50,
            event_chance: 0.7,
            debt_hp_divisor: 10,
            dismantle_debt_months: 3,
            organ_sale_gold_limit: -2_000,
            notification_threshold: 1,
            choices: ChoiceMatrix::default(),
            shop: ShopRules::default(),
            endings: EndingRules::default(),
        }
    }
}

fn check_probability(name: &'static str, p: f64) -> Result<(), ValidationError> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(ValidationError::InvalidProbability(name));
    }
    Ok(())
}

impl Balance {
    /// Reject configurations the formulas cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let t = &self.tiers;
        if !(t.worker < t.middle && t.middle < t.capitalist) {
            return Err(ValidationError::TierThresholdsNotIncreasing);
        }
        let mut last = -1;
        for band in &self.salary_bands {
            if band.max_sanity <= last || !band.efficiency.is_finite() || band.efficiency < 0.0 {
                return Err(ValidationError::InvalidSalaryBands);
            }
            last = band.max_sanity;
        }
        if last != SANITY_MAX {
            return Err(ValidationError::InvalidSalaryBands);
        }
        if !(self.pressure_divisor.is_finite() && self.pressure_divisor > 0.0) {
            return Err(ValidationError::NonPositive("pressure_divisor"));
        }
        if self.debt_hp_divisor <= 0 {
            return Err(ValidationError::NonPositive("debt_hp_divisor"));
        }
        check_probability("bill_chance", self.bill_chance)?;
        check_probability("bill_chance_in_debt", self.bill_chance_in_debt)?;
        check_probability("event_chance", self.event_chance)?;
        check_probability("shop.lottery_odds", self.shop.lottery_odds)?;
        let e = &self.endings;
        if e.madness_floor > e.madness_ceiling {
            return Err(ValidationError::InvalidRange("endings.madness_floor"));
        }
        Ok(())
    }
}
