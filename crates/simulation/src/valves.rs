use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::budget::FundingEffects;
use crate::census::{Census, History};
use crate::clock::SimClock;
use crate::config::{CityOptions, INDUSTRIAL_FACTOR, TAX_TABLE};
use crate::messages::CityNotification;

pub const RES_VALVE_RANGE: i32 = 2000;
pub const COM_VALVE_RANGE: i32 = 1500;
pub const IND_VALVE_RANGE: i32 = 1500;

const BIRTH_RATE: f64 = 0.02;

/// Citywide demand signals. Positive means growth pressure.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Valves {
    pub res: i32,
    pub com: i32,
    pub ind: i32,
    /// Residents want a stadium; positive residential demand is held at 0.
    pub res_cap: bool,
    /// Commerce wants an airport.
    pub com_cap: bool,
    /// Industry wants a seaport.
    pub ind_cap: bool,
}

impl Valves {
    pub fn clear_caps(&mut self) {
        self.res_cap = false;
        self.com_cap = false;
        self.ind_cap = false;
    }

    pub fn clamp(&mut self) {
        self.res = self.res.clamp(-RES_VALVE_RANGE, RES_VALVE_RANGE);
        self.com = self.com.clamp(-COM_VALVE_RANGE, COM_VALVE_RANGE);
        self.ind = self.ind.clamp(-IND_VALVE_RANGE, IND_VALVE_RANGE);
    }
}

impl crate::Saveable for Valves {
    const SAVE_KEY: &'static str = "valves";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

/// One valve update from the employment, migration and labour-base model.
///
/// Reads the previous history sample (index 1) for the employment and labour
/// ratios. Also refreshes `census.total_pop`.
pub fn set_valves(
    valves: &mut Valves,
    census: &mut Census,
    history: &History,
    tax_effect: i32,
    level: usize,
) {
    let norm_res_pop = census.res_pop as f64 / 8.0;
    let com_pop = census.com_pop as f64;
    let ind_pop = census.ind_pop as f64;
    census.total_pop = (norm_res_pop + com_pop + ind_pop) as i32;

    let prev_jobs = (history.com[1] + history.ind[1]) as f64;
    let employment = if norm_res_pop != 0.0 {
        prev_jobs / norm_res_pop
    } else {
        1.0
    };

    let migration = norm_res_pop * (employment - 1.0);
    let births = norm_res_pop * BIRTH_RATE;
    let projected_res_pop = norm_res_pop + migration + births;

    let labor_base = if prev_jobs != 0.0 {
        history.res[1] as f64 / prev_jobs
    } else {
        1.0
    }
    .clamp(0.0, 1.3);

    let internal_market = (norm_res_pop + com_pop + ind_pop) / 3.7;
    let projected_com_pop = internal_market * labor_base;

    let level = level.min(INDUSTRIAL_FACTOR.len() - 1);
    let projected_ind_pop = (ind_pop * labor_base * INDUSTRIAL_FACTOR[level]).max(5.0);

    let res_ratio = if norm_res_pop != 0.0 {
        projected_res_pop / norm_res_pop
    } else {
        1.3
    };
    let com_ratio = if census.com_pop != 0 {
        projected_com_pop / com_pop
    } else {
        projected_com_pop
    };
    let ind_ratio = if census.ind_pop != 0 {
        projected_ind_pop / ind_pop
    } else {
        projected_ind_pop
    };

    let bias = TAX_TABLE[(tax_effect.max(0) as usize + level).min(20)] as f64;
    let velocity = |ratio: f64| ((ratio.min(2.0) - 1.0) * 600.0 + bias) as i32;

    valves.res += velocity(res_ratio);
    valves.com += velocity(com_ratio);
    valves.ind += velocity(ind_ratio);
    valves.clamp();

    if valves.res_cap && valves.res > 0 {
        valves.res = 0;
    }
    if valves.com_cap && valves.com > 0 {
        valves.com = 0;
    }
    if valves.ind_cap && valves.ind > 0 {
        valves.ind = 0;
    }
}

/// Phase 0, every other week.
pub(crate) fn update_valves(
    clock: Res<SimClock>,
    options: Res<CityOptions>,
    effects: Res<FundingEffects>,
    history: Res<History>,
    mut census: ResMut<Census>,
    mut valves: ResMut<Valves>,
    mut notify: EventWriter<CityNotification>,
) {
    if clock.scycle % 2 != 0 {
        return;
    }
    set_valves(
        &mut valves,
        &mut census,
        &history,
        effects.tax_effect,
        options.level(),
    );
    notify.send(CityNotification::DemandChanged);
}
