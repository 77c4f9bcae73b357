//! Advisor messages polled once a week (phase 10) on a 64-week rotation,
//! plus the population milestone check.

use bevy::prelude::*;

use crate::budget::{CityBudget, FundingEffects};
use crate::census::Census;
use crate::clock::SimClock;
use crate::config::CENSUS_RATE;
use crate::messages::{CityMessage, CityMessageEvent};
use crate::sub_maps::DensityMaps;
use crate::valves::Valves;

const MILESTONES: [(i32, CityMessage); 5] = [
    (500_000, CityMessage::Pop500kReached),
    (100_000, CityMessage::Pop100kReached),
    (50_000, CityMessage::Pop50kReached),
    (10_000, CityMessage::Pop10kReached),
    (2_000, CityMessage::Pop2kReached),
];

/// Refresh `city_population` every `CENSUS_RATE` weeks and report the
/// largest milestone crossed upward. A city at 0 reports nothing, so loading
/// or founding a city never announces a milestone.
pub fn check_growth(census: &mut Census, city_time: i32) -> Option<CityMessage> {
    if city_time % CENSUS_RATE != 0 {
        return None;
    }
    let new_pop = census.population();
    let old_pop = census.city_population;
    census.city_population = new_pop;
    if old_pop == 0 {
        return None;
    }
    MILESTONES
        .iter()
        .find(|&&(threshold, _)| old_pop < threshold && new_pop >= threshold)
        .map(|&(_, message)| message)
}

pub struct AdvisorInputs<'a> {
    pub census: &'a Census,
    pub density: &'a DensityMaps,
    pub effects: &'a FundingEffects,
    pub budget: &'a CityBudget,
}

/// The advisor slot for `city_time % 64`. Slots 26, 28 and 30 also set the
/// stadium, seaport and airport demand caps.
pub fn advisor_message(
    city_time: i32,
    inputs: &AdvisorInputs,
    valves: &mut Valves,
) -> Option<CityMessage> {
    let c = inputs.census;
    let total_zones = c.total_zone_count();
    let plants = c.nuclear_count + c.coal_count;

    let (fire, message) = match city_time % 64 {
        1 => (total_zones / 4 >= c.res_zone_count, CityMessage::NeedRes),
        5 => (total_zones / 8 >= c.com_zone_count, CityMessage::NeedCom),
        10 => (total_zones / 8 >= c.ind_zone_count, CityMessage::NeedInd),
        14 => (
            total_zones > 10 && total_zones * 2 > c.road_total,
            CityMessage::NeedRoads,
        ),
        18 => (
            total_zones > 50 && total_zones > c.rail_total,
            CityMessage::NeedRails,
        ),
        22 => (total_zones > 10 && plants == 0, CityMessage::NeedPower),
        26 => {
            valves.res_cap = c.res_pop > 500 && c.stadium_count == 0;
            (valves.res_cap, CityMessage::NeedStadium)
        }
        28 => {
            valves.ind_cap = c.ind_pop > 70 && c.seaport_count == 0;
            (valves.ind_cap, CityMessage::NeedSeaport)
        }
        30 => {
            valves.com_cap = c.com_pop > 100 && c.airport_count == 0;
            (valves.com_cap, CityMessage::NeedAirport)
        }
        32 => {
            let zones = c.powered_zone_count + c.unpowered_zone_count;
            (
                zones != 0 && (c.powered_zone_count as f64 / zones as f64) < 0.7,
                CityMessage::Blackouts,
            )
        }
        35 => (inputs.density.pollution_average > 60, CityMessage::HighPollution),
        42 => (inputs.density.crime_average > 100, CityMessage::HighCrime),
        45 => (
            c.total_pop > 60 && c.fire_station_count == 0,
            CityMessage::NeedFireStation,
        ),
        48 => (c.total_pop > 60 && c.police_count == 0, CityMessage::NeedPolice),
        51 => (inputs.budget.tax_rate > 12, CityMessage::HighTaxes),
        54 => (
            inputs.effects.road_effect < 20 && c.road_total > 30,
            CityMessage::RoadsNeedFunding,
        ),
        57 => (
            inputs.effects.fire_effect < 700 && c.total_pop > 20,
            CityMessage::FireNeedFunding,
        ),
        60 => (
            inputs.effects.police_effect < 700 && c.total_pop > 20,
            CityMessage::PoliceNeedFunding,
        ),
        63 => (inputs.density.traffic_average > 60, CityMessage::HighTraffic),
        _ => return None,
    };
    fire.then_some(message)
}

/// Phase 10.
pub(crate) fn do_messages(
    clock: Res<SimClock>,
    density: Res<DensityMaps>,
    effects: Res<FundingEffects>,
    budget: Res<CityBudget>,
    mut census: ResMut<Census>,
    mut valves: ResMut<Valves>,
    mut messages: EventWriter<CityMessageEvent>,
) {
    if let Some(message) = check_growth(&mut census, clock.city_time) {
        info!("population milestone: {:?}", message);
        messages.send(CityMessageEvent {
            message,
            location: None,
        });
    }

    let inputs = AdvisorInputs {
        census: &census,
        density: &density,
        effects: &effects,
        budget: &budget,
    };
    if let Some(message) = advisor_message(clock.city_time, &inputs, &mut valves) {
        messages.send(CityMessageEvent {
            message,
            location: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(week: i32, census: &Census, valves: &mut Valves) -> Option<CityMessage> {
        let density = DensityMaps::new(16, 16);
        let effects = FundingEffects::default();
        let budget = CityBudget::with_funds(0);
        let inputs = AdvisorInputs {
            census,
            density: &density,
            effects: &effects,
            budget: &budget,
        };
        advisor_message(week, &inputs, valves)
    }

    #[test]
    fn test_growth_milestone_reported_once() {
        let mut census = Census::new(16, 16);
        census.city_population = 1900;
        census.res_pop = 100;
        assert_eq!(check_growth(&mut census, 8), Some(CityMessage::Pop2kReached));
        assert_eq!(census.city_population, 2000);
        assert_eq!(check_growth(&mut census, 12), None);
    }

    #[test]
    fn test_growth_skips_off_weeks_and_empty_start() {
        let mut census = Census::new(16, 16);
        census.res_pop = 1000;
        assert_eq!(check_growth(&mut census, 5), None);
        assert_eq!(census.city_population, 0);
        assert_eq!(check_growth(&mut census, 4), None);
        assert_eq!(census.city_population, 20_000);
    }

    #[test]
    fn test_largest_milestone_wins() {
        let mut census = Census::new(16, 16);
        census.city_population = 1000;
        census.res_pop = 30_000;
        assert_eq!(
            check_growth(&mut census, 4),
            Some(CityMessage::Pop500kReached)
        );
    }

    #[test]
    fn test_need_residential_slot() {
        let census = Census {
            com_zone_count: 4,
            ind_zone_count: 4,
            ..Census::new(16, 16)
        };
        let mut valves = Valves::default();
        assert_eq!(poll(1, &census, &mut valves), Some(CityMessage::NeedRes));
        assert_eq!(poll(65, &census, &mut valves), Some(CityMessage::NeedRes));
        assert_eq!(poll(2, &census, &mut valves), None);
    }

    #[test]
    fn test_stadium_slot_sets_and_clears_cap() {
        let mut census = Census {
            res_pop: 600,
            ..Census::new(16, 16)
        };
        let mut valves = Valves::default();
        assert_eq!(poll(26, &census, &mut valves), Some(CityMessage::NeedStadium));
        assert!(valves.res_cap);
        census.stadium_count = 1;
        assert_eq!(poll(26, &census, &mut valves), None);
        assert!(!valves.res_cap);
    }

    #[test]
    fn test_blackouts_slot() {
        let census = Census {
            powered_zone_count: 6,
            unpowered_zone_count: 4,
            ..Census::new(16, 16)
        };
        let mut valves = Valves::default();
        assert_eq!(poll(32, &census, &mut valves), Some(CityMessage::Blackouts));
    }
}
