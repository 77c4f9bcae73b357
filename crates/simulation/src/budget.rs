//! Tax income, service funding and the yearly reconciliation.
//!
//! Every week (phase 9) books 1/48th of the year's income and funded
//! maintenance into escrow; every `TAX_FREQ` weeks the escrow is settled
//! against `total_funds`.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::census::Census;
use crate::config::{
    CityConfig, DEFAULT_TAX_RATE, FIRE_STATION_MAINTENANCE, F_LEVELS, MAX_TAX_RATE,
    POLICE_STATION_MAINTENANCE, R_LEVELS, TAX_FREQ,
};
use crate::messages::{CityMessage, CityMessageEvent, CityNotification};

pub const MAX_ROAD_EFFECT: i32 = 32;
pub const MAX_POLICE_EFFECT: i32 = 1000;
pub const MAX_FIRE_EFFECT: i32 = 1000;

/// One settled year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct FinancialHistory {
    pub city_time: i32,
    pub tax_income: i32,
    pub operating_expenses: i32,
    pub total_funds: i32,
}

/// Census figures frozen at the last partial collection. The budget is
/// computed from these so that a half-finished map scan never leaks in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct BudgetBase {
    pub road_total: i32,
    pub rail_total: i32,
    pub total_pop: i32,
    pub fire_station_count: i32,
    pub police_count: i32,
}

#[derive(Resource, Debug, Clone, PartialEq, Encode, Decode)]
pub struct CityBudget {
    pub total_funds: i32,
    /// Income collected so far this year, in 1/48ths.
    pub tax_fund: i32,
    /// Prepaid maintenance, in negative 1/48ths.
    pub road_escrow: i32,
    pub fire_escrow: i32,
    pub police_escrow: i32,
    pub tax_rate: i32,
    pub road_percent: f64,
    pub fire_percent: f64,
    pub police_percent: f64,
    /// Net change in funds over the last settled year.
    pub cash_flow: i32,
    pub base: BudgetBase,
    /// Newest first.
    pub history: Vec<FinancialHistory>,
}

impl Default for CityBudget {
    fn default() -> Self {
        Self::with_funds(CityConfig::default().funds())
    }
}

impl CityBudget {
    pub fn with_funds(total_funds: i32) -> Self {
        Self {
            total_funds,
            tax_fund: 0,
            road_escrow: 0,
            fire_escrow: 0,
            police_escrow: 0,
            tax_rate: DEFAULT_TAX_RATE,
            road_percent: 1.0,
            fire_percent: 1.0,
            police_percent: 1.0,
            cash_flow: 0,
            base: BudgetBase::default(),
            history: Vec::new(),
        }
    }

    pub fn spend(&mut self, amount: i32) {
        self.total_funds -= amount;
    }

    pub fn set_tax_rate(&mut self, rate: i32) {
        self.tax_rate = rate.clamp(0, MAX_TAX_RATE);
    }

    pub fn set_road_percent(&mut self, pct: f64) {
        self.road_percent = pct.clamp(0.0, 1.0);
    }

    pub fn set_fire_percent(&mut self, pct: f64) {
        self.fire_percent = pct.clamp(0.0, 1.0);
    }

    pub fn set_police_percent(&mut self, pct: f64) {
        self.police_percent = pct.clamp(0.0, 1.0);
    }
}

impl crate::Saveable for CityBudget {
    const SAVE_KEY: &'static str = "city_budget";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

/// How well each service is funded, as consumed by the simulation.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FundingEffects {
    /// 0..=32. Below 30 roads and rails start to wear out.
    pub road_effect: i32,
    /// 0..=1000.
    pub police_effect: i32,
    /// 0..=1000.
    pub fire_effect: i32,
    pub tax_effect: i32,
}

impl Default for FundingEffects {
    fn default() -> Self {
        Self {
            road_effect: MAX_ROAD_EFFECT,
            police_effect: MAX_POLICE_EFFECT,
            fire_effect: MAX_FIRE_EFFECT,
            tax_effect: DEFAULT_TAX_RATE,
        }
    }
}

impl crate::Saveable for FundingEffects {
    const SAVE_KEY: &'static str = "funding_effects";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Budget computation
// ---------------------------------------------------------------------------

/// A full-year budget as it would look with the current figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BudgetNumbers {
    pub tax_rate: i32,
    pub tax_income: i32,
    pub previous_balance: i32,
    pub road_request: i32,
    pub road_funded: i32,
    pub road_percent: f64,
    pub fire_request: i32,
    pub fire_funded: i32,
    pub fire_percent: f64,
    pub police_request: i32,
    pub police_funded: i32,
    pub police_percent: f64,
}

/// Requests and funding for a full year. Cash on hand plus this year's
/// income is handed to roads, then fire, then police; the first category
/// that can't be paid in full gets whatever is left and the rest get nothing.
pub fn generate_budget(budget: &CityBudget, level: usize, land_value_average: i32) -> BudgetNumbers {
    let level = level.min(R_LEVELS.len() - 1);
    let base = &budget.base;
    let mut b = BudgetNumbers {
        tax_rate: budget.tax_rate.max(0),
        previous_balance: budget.total_funds,
        road_percent: budget.road_percent.max(0.0),
        fire_percent: budget.fire_percent.max(0.0),
        police_percent: budget.police_percent.max(0.0),
        ..Default::default()
    };

    b.tax_income = (base.total_pop as f64 * land_value_average as f64 / 120.0
        * b.tax_rate as f64
        * F_LEVELS[level])
        .round() as i32;

    b.road_request =
        ((base.road_total + base.rail_total * 2) as f64 * R_LEVELS[level]).round() as i32;
    b.fire_request = FIRE_STATION_MAINTENANCE * base.fire_station_count;
    b.police_request = POLICE_STATION_MAINTENANCE * base.police_count;

    b.road_funded = (b.road_request as f64 * b.road_percent).round() as i32;
    b.fire_funded = (b.fire_request as f64 * b.fire_percent).round() as i32;
    b.police_funded = (b.police_request as f64 * b.police_percent).round() as i32;

    // A city already in debt can't fund anything.
    let mut available = (budget.total_funds + b.tax_income).max(0);

    if available >= b.road_funded {
        available -= b.road_funded;
        if available >= b.fire_funded {
            available -= b.fire_funded;
            if available < b.police_funded {
                b.police_funded = available;
                b.police_percent = ratio(b.police_funded, b.police_request);
            }
        } else {
            b.fire_funded = available;
            b.fire_percent = ratio(b.fire_funded, b.fire_request);
            b.police_funded = 0;
            b.police_percent = 0.0;
        }
    } else {
        b.road_funded = available;
        b.road_percent = ratio(b.road_funded, b.road_request);
        b.fire_funded = 0;
        b.fire_percent = 0.0;
        b.police_funded = 0;
        b.police_percent = 0.0;
    }

    b
}

fn ratio(funded: i32, request: i32) -> f64 {
    if request == 0 {
        0.0
    } else {
        funded as f64 / request as f64
    }
}

/// Weekly booking: freeze the census base, escrow income and maintenance,
/// and refresh the funding effects.
pub fn collect_tax_partial(
    budget: &mut CityBudget,
    effects: &mut FundingEffects,
    census: &Census,
    level: usize,
    land_value_average: i32,
) -> BudgetNumbers {
    budget.base = BudgetBase {
        road_total: census.road_total,
        rail_total: census.rail_total,
        total_pop: census.total_pop,
        fire_station_count: census.fire_station_count,
        police_count: census.police_count,
    };

    let b = generate_budget(budget, level, land_value_average);

    budget.tax_fund += b.tax_income;
    budget.road_escrow -= b.road_funded;
    budget.fire_escrow -= b.fire_funded;
    budget.police_escrow -= b.police_funded;

    effects.tax_effect = b.tax_rate;
    effects.road_effect = effect(b.road_funded, b.road_request, MAX_ROAD_EFFECT);
    effects.police_effect = effect(b.police_funded, b.police_request, MAX_POLICE_EFFECT);
    effects.fire_effect = effect(b.fire_funded, b.fire_request, MAX_FIRE_EFFECT);

    b
}

fn effect(funded: i32, request: i32, max: i32) -> i32 {
    if request == 0 {
        max
    } else {
        (max as f64 * funded as f64 / request as f64).floor() as i32
    }
}

/// Yearly settlement. Returns the new history record.
pub fn collect_tax(budget: &mut CityBudget, city_time: i32) -> FinancialHistory {
    let revenue = budget.tax_fund / TAX_FREQ;
    let expenses = -(budget.road_escrow + budget.fire_escrow + budget.police_escrow) / TAX_FREQ;

    budget.cash_flow = revenue - expenses;
    budget.spend(-budget.cash_flow);

    let record = FinancialHistory {
        city_time,
        tax_income: revenue,
        operating_expenses: expenses,
        total_funds: budget.total_funds,
    };
    budget.history.insert(0, record);

    budget.tax_fund = 0;
    budget.road_escrow = 0;
    budget.fire_escrow = 0;
    budget.police_escrow = 0;

    record
}

/// Settle the year and report the outcome.
pub(crate) fn settle_year(
    budget: &mut CityBudget,
    city_time: i32,
    messages: &mut EventWriter<CityMessageEvent>,
    notify: &mut EventWriter<CityNotification>,
) {
    let record = collect_tax(budget, city_time);
    debug!(
        "tax collected at week {}: income {}, expenses {}, funds {}",
        city_time, record.tax_income, record.operating_expenses, record.total_funds
    );
    notify.send(CityNotification::FundsChanged);
    if budget.total_funds < 0 {
        messages.send(CityMessageEvent {
            message: CityMessage::OutOfFunds,
            location: None,
        });
    }
}
