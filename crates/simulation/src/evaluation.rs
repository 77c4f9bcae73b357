//! Yearly city evaluation: assessed value, population class, top problems,
//! the 0..1000 score and a 100-citizen approval poll.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::budget::{CityBudget, FundingEffects, MAX_FIRE_EFFECT, MAX_POLICE_EFFECT, MAX_ROAD_EFFECT};
use crate::census::Census;
use crate::sim_rng::SimRng;
use crate::sub_maps::DensityMaps;
use crate::valves::Valves;

const MAX_SCORE: f64 = 1000.0;
const MAX_TOP_PROBLEMS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub enum CityProblem {
    Crime,
    Pollution,
    Housing,
    Taxes,
    Traffic,
    Unemployment,
    Fire,
}

impl CityProblem {
    pub const ALL: [CityProblem; 7] = [
        CityProblem::Crime,
        CityProblem::Pollution,
        CityProblem::Housing,
        CityProblem::Taxes,
        CityProblem::Traffic,
        CityProblem::Unemployment,
        CityProblem::Fire,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub enum CityClass {
    #[default]
    Village,
    Town,
    City,
    Capital,
    Metropolis,
    Megalopolis,
}

impl CityClass {
    pub fn from_population(pop: i32) -> Self {
        match pop {
            p if p > 500_000 => CityClass::Megalopolis,
            p if p > 100_000 => CityClass::Metropolis,
            p if p > 50_000 => CityClass::Capital,
            p if p > 10_000 => CityClass::City,
            p if p > 2_000 => CityClass::Town,
            _ => CityClass::Village,
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    /// Out-of-range values read from old save files become `Village`.
    pub fn from_index(i: i32) -> Self {
        match i {
            1 => CityClass::Town,
            2 => CityClass::City,
            3 => CityClass::Capital,
            4 => CityClass::Metropolis,
            5 => CityClass::Megalopolis,
            _ => CityClass::Village,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CityEvaluation {
    pub yes: i32,
    pub no: i32,
    pub assessed_value: i32,
    pub score: i32,
    pub delta_score: i32,
    pub population: i32,
    pub delta_population: i32,
    pub class: CityClass,
    /// Most pressing first, at most four.
    pub problem_order: Vec<CityProblem>,
    /// Indexed by `CityProblem as usize`.
    pub problem_votes: [i32; 7],
}

impl Default for CityEvaluation {
    fn default() -> Self {
        Self {
            yes: 0,
            no: 0,
            assessed_value: 0,
            score: 500,
            delta_score: 0,
            population: 0,
            delta_population: 0,
            class: CityClass::Village,
            problem_order: Vec::new(),
            problem_votes: [0; 7],
        }
    }
}

impl CityEvaluation {
    pub fn votes_for(&self, problem: CityProblem) -> i32 {
        self.problem_votes[problem.index()]
    }

    /// Everything back to the empty-city state, keeping the population figures.
    fn reset(&mut self) {
        self.yes = 0;
        self.no = 0;
        self.assessed_value = 0;
        self.class = CityClass::Village;
        self.score = 500;
        self.delta_score = 0;
        self.problem_votes = [0; 7];
        self.problem_order.clear();
    }
}

impl crate::Saveable for CityEvaluation {
    const SAVE_KEY: &'static str = "city_evaluation";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

/// Everything the evaluation reads, gathered by the caller.
pub struct EvaluationInputs<'a> {
    pub census: &'a Census,
    pub budget: &'a CityBudget,
    pub effects: &'a FundingEffects,
    pub valves: &'a Valves,
}

/// Run one evaluation. `density.traffic_average` is refreshed as a side effect.
pub fn evaluate_city(
    eval: &mut CityEvaluation,
    inputs: &EvaluationInputs,
    density: &mut DensityMaps,
    map_width: usize,
    map_height: usize,
    rng: &mut SimRng,
) {
    let census = inputs.census;
    if census.total_pop == 0 {
        eval.reset();
        return;
    }

    eval.assessed_value = assessed_value(census);

    let old_pop = eval.population;
    eval.population = census.city_population;
    eval.delta_population = eval.population - old_pop;
    eval.class = CityClass::from_population(eval.population);

    let table = problem_table(inputs, density, map_width, map_height);
    eval.problem_votes = vote_problems(&table, rng);
    eval.problem_order = top_problems(&eval.problem_votes);

    let old_score = eval.score;
    let target = target_score(&table, inputs, eval.population, eval.delta_population);
    eval.score = ((old_score as f64 + target) / 2.0).round() as i32;
    eval.delta_score = eval.score - old_score;

    eval.yes = 0;
    eval.no = 0;
    for _ in 0..100 {
        if rng.next_int(1001) < eval.score {
            eval.yes += 1;
        } else {
            eval.no += 1;
        }
    }
}

pub fn assessed_value(census: &Census) -> i32 {
    let z = census.road_total * 5
        + census.rail_total * 10
        + census.police_count * 1000
        + census.fire_station_count * 1000
        + census.hospital_count * 400
        + census.stadium_count * 3000
        + census.seaport_count * 5000
        + census.airport_count * 10000
        + census.coal_count * 3000
        + census.nuclear_count * 6000;
    z.saturating_mul(1000)
}

fn problem_table(
    inputs: &EvaluationInputs,
    density: &mut DensityMaps,
    map_width: usize,
    map_height: usize,
) -> [i32; 7] {
    let census = inputs.census;
    let mut table = [0; 7];
    table[CityProblem::Crime.index()] = density.crime_average;
    table[CityProblem::Pollution.index()] = density.pollution_average;
    table[CityProblem::Housing.index()] = (density.land_value_average as f64 * 0.7).round() as i32;
    table[CityProblem::Taxes.index()] = inputs.budget.tax_rate * 10;
    table[CityProblem::Traffic.index()] = average_traffic(density, map_width, map_height);
    table[CityProblem::Unemployment.index()] = unemployment(census);
    table[CityProblem::Fire.index()] = fire_severity(census);
    table
}

/// Mean traffic over developed land, scaled by 2.4.
pub fn average_traffic(density: &mut DensityMaps, map_width: usize, map_height: usize) -> i32 {
    let mut count = 1i64;
    let mut total = 0i64;
    for y in 0..map_height as i32 {
        for x in 0..map_width as i32 {
            if density.land_value_at(x, y) != 0 {
                total += density.traffic_at(x, y) as i64;
                count += 1;
            }
        }
    }
    density.traffic_average = (total as f64 / count as f64 * 2.4).round() as i32;
    density.traffic_average
}

pub fn unemployment(census: &Census) -> i32 {
    let jobs = (census.com_pop + census.ind_pop) * 8;
    if jobs == 0 {
        return 0;
    }
    let r = census.res_pop as f64 / jobs as f64;
    (((r - 1.0) * 255.0).floor() as i32).min(255)
}

pub fn fire_severity(census: &Census) -> i32 {
    (census.fire_pop * 5).min(255)
}

fn vote_problems(table: &[i32; 7], rng: &mut SimRng) -> [i32; 7] {
    let mut votes = [0; 7];
    let mut count = 0;
    for i in 0..600 {
        if rng.next_int(301) < table[i % 7] {
            votes[i % 7] += 1;
            count += 1;
            if count >= 100 {
                break;
            }
        }
    }
    votes
}

fn top_problems(votes: &[i32; 7]) -> Vec<CityProblem> {
    let mut order = CityProblem::ALL;
    // stable: ties keep enum order
    order.sort_by(|a, b| votes[b.index()].cmp(&votes[a.index()]));
    order
        .into_iter()
        .take_while(|p| votes[p.index()] != 0)
        .take(MAX_TOP_PROBLEMS)
        .collect()
}

fn clamp_score(z: f64) -> f64 {
    z.clamp(0.0, MAX_SCORE)
}

/// The unsmoothed score this year's figures would earn.
fn target_score(
    table: &[i32; 7],
    inputs: &EvaluationInputs,
    city_pop: i32,
    delta_pop: i32,
) -> f64 {
    let census = inputs.census;
    let effects = inputs.effects;
    let valves = inputs.valves;

    let x = (table.iter().sum::<i32>() / 3).min(256);
    let mut z = clamp_score(((256 - x) * 4) as f64);

    for cap in [valves.res_cap, valves.com_cap, valves.ind_cap] {
        if cap {
            z *= 0.85;
        }
    }
    if effects.road_effect < MAX_ROAD_EFFECT {
        z -= (MAX_ROAD_EFFECT - effects.road_effect) as f64;
    }
    if effects.police_effect < MAX_POLICE_EFFECT {
        z *= 0.9 + effects.police_effect as f64 / 10000.1;
    }
    if effects.fire_effect < MAX_FIRE_EFFECT {
        z *= 0.9 + effects.fire_effect as f64 / 10000.1;
    }
    for valve in [valves.res, valves.com, valves.ind] {
        if valve < -1000 {
            z *= 0.85;
        }
    }

    let mut growth = 1.0;
    if (city_pop != 0 || delta_pop != 0) && delta_pop != city_pop {
        if delta_pop > 0 {
            growth = delta_pop as f64 / city_pop as f64 + 1.0;
        } else if delta_pop < 0 {
            growth = 0.95 + delta_pop as f64 / (city_pop - delta_pop) as f64;
        }
    }
    z *= growth;
    z -= fire_severity(census) as f64;
    z -= inputs.budget.tax_rate as f64;

    let zones = census.powered_zone_count + census.unpowered_zone_count;
    if zones != 0 {
        z *= census.powered_zone_count as f64 / zones as f64;
    }

    clamp_score(z)
}
