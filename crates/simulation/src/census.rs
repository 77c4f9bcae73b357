//! Per-cycle census counters and the long-running population history.
//!
//! Phase 0 zeroes the counters; the map scan (phases 1-8) accumulates them;
//! phase 9 folds them into `History` every `CENSUS_RATE` weeks.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::grid::GridPos;

/// Entries per history series: 120 short-range plus 120 long-range.
pub const HISTORY_LENGTH: usize = 240;
const SHORT_RANGE: usize = 120;

#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Census {
    pub powered_zone_count: i32,
    pub unpowered_zone_count: i32,
    pub fire_pop: i32,
    pub road_total: i32,
    pub rail_total: i32,
    pub res_pop: i32,
    pub com_pop: i32,
    pub ind_pop: i32,
    pub res_zone_count: i32,
    pub com_zone_count: i32,
    pub ind_zone_count: i32,
    pub hospital_count: i32,
    pub church_count: i32,
    pub police_count: i32,
    pub fire_station_count: i32,
    pub stadium_count: i32,
    pub coal_count: i32,
    pub nuclear_count: i32,
    pub seaport_count: i32,
    pub airport_count: i32,
    /// Plants found this cycle, consumed by the power scan.
    pub power_plants: Vec<GridPos>,

    /// `res/8 + com + ind`, refreshed by the valve update.
    pub total_pop: i32,
    /// Headline population, refreshed every 4 weeks by the growth check.
    pub city_population: i32,
    /// -1 too many, 0 enough, 1 too few.
    pub need_hospital: i32,
    pub need_church: i32,
    pub crime_ramp: i32,
    pub(crate) pollute_ramp: i32,
    pub center_of_mass: GridPos,
}

impl Default for Census {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Census {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            powered_zone_count: 0,
            unpowered_zone_count: 0,
            fire_pop: 0,
            road_total: 0,
            rail_total: 0,
            res_pop: 0,
            com_pop: 0,
            ind_pop: 0,
            res_zone_count: 0,
            com_zone_count: 0,
            ind_zone_count: 0,
            hospital_count: 0,
            church_count: 0,
            police_count: 0,
            fire_station_count: 0,
            stadium_count: 0,
            coal_count: 0,
            nuclear_count: 0,
            seaport_count: 0,
            airport_count: 0,
            power_plants: Vec::new(),
            total_pop: 0,
            city_population: 0,
            need_hospital: 0,
            need_church: 0,
            crime_ramp: 0,
            pollute_ramp: 0,
            center_of_mass: GridPos::new(width.div_ceil(2) as i32, height.div_ceil(2) as i32),
        }
    }

    /// Zero the per-cycle counters. Ramps, needs and centre of mass survive.
    pub fn clear(&mut self) {
        self.powered_zone_count = 0;
        self.unpowered_zone_count = 0;
        self.fire_pop = 0;
        self.road_total = 0;
        self.rail_total = 0;
        self.res_pop = 0;
        self.com_pop = 0;
        self.ind_pop = 0;
        self.res_zone_count = 0;
        self.com_zone_count = 0;
        self.ind_zone_count = 0;
        self.hospital_count = 0;
        self.church_count = 0;
        self.police_count = 0;
        self.fire_station_count = 0;
        self.stadium_count = 0;
        self.coal_count = 0;
        self.nuclear_count = 0;
        self.seaport_count = 0;
        self.airport_count = 0;
        self.power_plants.clear();
    }

    pub fn total_zone_count(&self) -> i32 {
        self.res_zone_count + self.com_zone_count + self.ind_zone_count
    }

    /// The classic headline figure: every residential unit houses 20 people
    /// and every job tile represents 8 of them.
    pub fn population(&self) -> i32 {
        (self.res_pop + 8 * (self.com_pop + self.ind_pop)) * 20
    }

    pub fn pollute_ramp(&self) -> i32 {
        self.pollute_ramp
    }

    pub fn set_ramps(&mut self, crime: i32, pollution: i32) {
        self.crime_ramp = crime;
        self.pollute_ramp = pollution;
    }
}

impl crate::Saveable for Census {
    const SAVE_KEY: &'static str = "census";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Graph data: entries 0..120 are sampled every 4 weeks, 120..240 every 48.
/// Index 0 (and 120) is the newest sample.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct History {
    pub res: Vec<i32>,
    pub com: Vec<i32>,
    pub ind: Vec<i32>,
    pub crime: Vec<i32>,
    pub pollution: Vec<i32>,
    pub money: Vec<i32>,
    /// City time of the newest sample.
    pub city_time: i32,
}

impl Default for History {
    fn default() -> Self {
        let series = vec![0; HISTORY_LENGTH];
        Self {
            res: series.clone(),
            com: series.clone(),
            ind: series.clone(),
            crime: series.clone(),
            pollution: series.clone(),
            money: series,
            city_time: 0,
        }
    }
}

impl History {
    fn series_mut(&mut self) -> [&mut Vec<i32>; 6] {
        [
            &mut self.res,
            &mut self.com,
            &mut self.ind,
            &mut self.crime,
            &mut self.pollution,
            &mut self.money,
        ]
    }

    /// Shift `range` one slot toward the end, dropping its last entry.
    fn shift(&mut self, start: usize) {
        for s in self.series_mut() {
            s.copy_within(start..start + SHORT_RANGE - 1, start + 1);
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.all().iter().all(|s| s.len() == HISTORY_LENGTH)
    }

    /// The six series in record order (res, com, ind, crime, pollution, money).
    pub fn all(&self) -> [&Vec<i32>; 6] {
        [
            &self.res,
            &self.com,
            &self.ind,
            &self.crime,
            &self.pollution,
            &self.money,
        ]
    }
}

impl crate::Saveable for History {
    const SAVE_KEY: &'static str = "history";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Census sampling
// ---------------------------------------------------------------------------

/// Short-range sample, every `CENSUS_RATE` weeks.
pub fn take_census(
    census: &mut Census,
    history: &mut History,
    crime_average: i32,
    pollution_average: i32,
    cash_flow: i32,
    city_time: i32,
) {
    history.shift(0);

    history.res[0] = census.res_pop / 8;
    history.com[0] = census.com_pop;
    history.ind[0] = census.ind_pop;

    census.crime_ramp += (crime_average - census.crime_ramp) / 4;
    history.crime[0] = census.crime_ramp.min(255);

    census.pollute_ramp += (pollution_average - census.pollute_ramp) / 4;
    history.pollution[0] = census.pollute_ramp.min(255);

    history.money[0] = (cash_flow / 20 + 128).clamp(0, 255);
    history.city_time = city_time;

    census.need_hospital = (census.res_pop / 256).cmp(&census.hospital_count) as i32;
    census.need_church = (census.res_pop / 256).cmp(&census.church_count) as i32;
}

/// Long-range sample, every 48 weeks. Reuses the newest short-range values
/// for crime, pollution and money.
pub fn take_census_long(census: &Census, history: &mut History) {
    history.shift(SHORT_RANGE);

    history.res[SHORT_RANGE] = census.res_pop / 8;
    history.com[SHORT_RANGE] = census.com_pop;
    history.ind[SHORT_RANGE] = census.ind_pop;
    history.crime[SHORT_RANGE] = history.crime[0];
    history.pollution[SHORT_RANGE] = history.pollution[0];
    history.money[SHORT_RANGE] = history.money[0];
}
