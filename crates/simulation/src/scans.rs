//! Whole-map analysis passes (phases 12-15) and the bookkeeping phases
//! around the map scan (0, 9 and 10).
//!
//! The analysis passes rebuild the density and coverage overlays from the
//! tile grid. They run in a fixed order: pollution and land value, crime,
//! population density, then fire coverage, so each pass sees the previous
//! pass of this week and the later passes of last week.

use bevy::prelude::*;

use crate::budget::{collect_tax_partial, settle_year, CityBudget, FundingEffects};
use crate::census::{take_census, take_census_long, Census, History};
use crate::clock::SimClock;
use crate::config::{CityOptions, CENSUS_RATE, TAX_FREQ};
use crate::evaluation::{evaluate_city, CityEvaluation, EvaluationInputs};
use crate::grid::{GridPos, TileMap};
use crate::messages::{CityMessageEvent, CityNotification};
use crate::sim_rng::SimRng;
use crate::sub_maps::{CoverageMaps, DensityMaps};
use crate::tile_catalog::{
    commercial_zone_pop, industrial_zone_pop, is_constructed, residential_zone_pop, TileCatalog,
};
use crate::tile_constants::{COMBASE, DIRT, INDBASE, LOMASK, PORTBASE, RESCLR, RUBBLE};
use crate::valves::Valves;
use crate::zones::do_free_pop;

/// Manhattan distance from a half-resolution cell to the centre of mass,
/// capped at 32.
pub fn distance_to_center(center: GridPos, hx: i32, hy: i32) -> i32 {
    let z = (hx - center.x / 2).abs() + (hy - center.y / 2).abs();
    z.min(32)
}

// ---------------------------------------------------------------------------
// Phase 12: pollution, terrain and land value
// ---------------------------------------------------------------------------

pub fn pollution_terrain_land_value_scan(
    map: &TileMap,
    catalog: &TileCatalog,
    density: &mut DensityMaps,
    center: GridPos,
    rng: &mut SimRng,
) {
    let mut natural = density.terrain.like();
    let mut raw_pollution = density.pollution.like();
    let (hw, hh) = (density.pollution.width as i32, density.pollution.height as i32);

    let mut lv_total = 0;
    let mut lv_count = 0;
    for hx in 0..hw {
        for hy in 0..hh {
            let mut level = 0;
            let mut developed = false;
            for mx in 2 * hx..=2 * hx + 1 {
                for my in 2 * hy..=2 * hy + 1 {
                    let tile = map.tile(mx, my);
                    if tile == DIRT {
                        continue;
                    }
                    if tile < RUBBLE {
                        natural.add(hx / 2, hy / 2, 15);
                        continue;
                    }
                    level += catalog.pollution(tile);
                    if is_constructed(tile) {
                        developed = true;
                    }
                }
            }

            if level < 0 {
                level = 250;
            }
            raw_pollution.set(hx, hy, level.min(255));

            if !developed {
                density.land_value.set(hx, hy, 0);
                continue;
            }
            // reads last week's pollution, crime and terrain
            let mut value = (34 - distance_to_center(center, hx, hy)) * 4;
            value += density.terrain.get(hx / 2, hy / 2);
            value -= density.pollution.get(hx, hy);
            if density.crime.get(hx, hy) > 190 {
                value -= 20;
            }
            let value = value.clamp(1, 250);
            density.land_value.set(hx, hy, value);
            lv_total += value;
            lv_count += 1;
        }
    }
    density.land_value_average = if lv_count != 0 { lv_total / lv_count } else { 0 };

    let smoothed = raw_pollution.smooth_sum().smooth_sum();
    let mut total = 0;
    let mut count = 0;
    let mut max = 0;
    for hx in 0..hw {
        for hy in 0..hh {
            let z = smoothed.get(hx, hy);
            if z == 0 {
                continue;
            }
            count += 1;
            total += z;
            if z > max || (z == max && rng.chance(4)) {
                max = z;
                density.pollution_max = GridPos::new(2 * hx, 2 * hy);
            }
        }
    }
    density.pollution = smoothed;
    density.pollution_average = if count != 0 { total / count } else { 0 };

    density.terrain = natural.smooth_terrain();
}

// ---------------------------------------------------------------------------
// Phase 13: crime
// ---------------------------------------------------------------------------

pub fn crime_scan(density: &mut DensityMaps, coverage: &mut CoverageMaps, rng: &mut SimRng) {
    coverage.police = coverage
        .police
        .smooth_fire_police()
        .smooth_fire_police()
        .smooth_fire_police();
    coverage.police_effect.copy_from(&coverage.police);

    let (hw, hh) = (
        density.land_value.width as i32,
        density.land_value.height as i32,
    );
    let mut count = 0;
    let mut total = 0;
    let mut max = 0;
    for hy in 0..hh {
        for hx in 0..hw {
            let value = density.land_value.get(hx, hy);
            if value == 0 {
                density.crime.set(hx, hy, 0);
                continue;
            }
            count += 1;
            let z = (128 - value + density.population.get(hx, hy)).min(300);
            let z = (z - coverage.police.get(hx / 4, hy / 4)).clamp(0, 250);
            density.crime.set(hx, hy, z);
            total += z;
            if z > max || (z == max && rng.chance(4)) {
                max = z;
                density.crime_max = GridPos::new(2 * hx, 2 * hy);
            }
        }
    }
    density.crime_average = if count != 0 { total / count } else { 0 };
}

// ---------------------------------------------------------------------------
// Phase 14: population density, commercial rate, centre of mass
// ---------------------------------------------------------------------------

/// Population weight of a zone centre, with jobs counted 8:1.
fn zone_density(map: &TileMap, x: i32, y: i32, tile: u16) -> i32 {
    if tile == RESCLR {
        do_free_pop(map, x, y)
    } else if tile < COMBASE {
        residential_zone_pop(tile)
    } else if tile < INDBASE {
        commercial_zone_pop(tile) * 8
    } else if tile < PORTBASE {
        industrial_zone_pop(tile) * 8
    } else {
        0
    }
}

pub fn population_density_scan(
    map: &TileMap,
    catalog: &TileCatalog,
    density: &mut DensityMaps,
    coverage: &mut CoverageMaps,
    census: &mut Census,
) {
    let mut raw = density.population.like();
    let (mut x_total, mut y_total, mut zones) = (0i64, 0i64, 0i64);
    for (x, y, cell) in map.iter() {
        let tile = cell & LOMASK;
        if !catalog.is_zone_center(tile) {
            continue;
        }
        let den = (zone_density(map, x, y, tile) * 8).min(254);
        raw.set_world(x, y, den);
        x_total += x as i64;
        y_total += y as i64;
        zones += 1;
    }

    let smoothed = raw.smooth_sum().smooth_sum().smooth_sum();
    density.population.copy_from(&smoothed);
    density.population.map_in_place(|z| 2 * z);

    // commercial demand falls off with distance from last week's centre
    let center = census.center_of_mass;
    let (cw, ch) = (coverage.com_rate.width as i32, coverage.com_rate.height as i32);
    for by in 0..ch {
        for bx in 0..cw {
            let z = 64 - distance_to_center(center, bx * 4, by * 4) / 4;
            coverage.com_rate.set(bx, by, z);
        }
    }

    census.center_of_mass = if zones == 0 {
        GridPos::new(map.width.div_ceil(2) as i32, map.height.div_ceil(2) as i32)
    } else {
        GridPos::new((x_total / zones) as i32, (y_total / zones) as i32)
    };
}

// ---------------------------------------------------------------------------
// Phase 15: fire coverage
// ---------------------------------------------------------------------------

pub fn fire_analysis(coverage: &mut CoverageMaps) {
    coverage.fire_station = coverage
        .fire_station
        .smooth_fire_police()
        .smooth_fire_police()
        .smooth_fire_police();
    coverage.fire_rate.copy_from(&coverage.fire_station);
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Phase 0, first: a new week begins.
pub(crate) fn begin_week(mut clock: ResMut<SimClock>) {
    clock.new_week();
}

/// Phase 0, after the valves have read last week's counts.
pub(crate) fn reset_census(mut census: ResMut<Census>, mut coverage: ResMut<CoverageMaps>) {
    census.clear();
    coverage.fire_station.fill(0);
    coverage.police.fill(0);
}

#[derive(bevy::ecs::system::SystemParam)]
pub(crate) struct WeeklyBooks<'w> {
    clock: Res<'w, SimClock>,
    options: Res<'w, CityOptions>,
    map: Res<'w, TileMap>,
    valves: Res<'w, Valves>,
    census: ResMut<'w, Census>,
    history: ResMut<'w, History>,
    density: ResMut<'w, DensityMaps>,
    budget: ResMut<'w, CityBudget>,
    effects: ResMut<'w, FundingEffects>,
    evaluation: ResMut<'w, CityEvaluation>,
    rng: ResMut<'w, SimRng>,
    messages: EventWriter<'w, CityMessageEvent>,
    notify: EventWriter<'w, CityNotification>,
}

/// Phase 9: census samples, weekly tax booking and the yearly settlement.
pub(crate) fn census_and_taxes(mut books: WeeklyBooks) {
    let books = &mut books;
    let city_time = books.clock.city_time;

    if city_time % CENSUS_RATE == 0 {
        let (crime, pollution) = (books.density.crime_average, books.density.pollution_average);
        take_census(
            &mut books.census,
            &mut books.history,
            crime,
            pollution,
            books.budget.cash_flow,
            city_time,
        );
        if city_time % (CENSUS_RATE * 12) == 0 {
            take_census_long(&books.census, &mut books.history);
        }
        books.notify.send(CityNotification::CensusChanged);
    }

    let level = books.options.level();
    let lv_average = books.density.land_value_average;
    collect_tax_partial(
        &mut books.budget,
        &mut books.effects,
        &books.census,
        level,
        lv_average,
    );

    if city_time % TAX_FREQ == 0 {
        settle_year(
            &mut books.budget,
            city_time,
            &mut books.messages,
            &mut books.notify,
        );
        let inputs = EvaluationInputs {
            census: &books.census,
            budget: &books.budget,
            effects: &books.effects,
            valves: &books.valves,
        };
        let (w, h) = (books.map.width, books.map.height);
        evaluate_city(
            &mut books.evaluation,
            &inputs,
            &mut books.density,
            w,
            h,
            &mut books.rng,
        );
        debug!(
            "evaluation at week {}: score {}, approval {}/{}",
            city_time, books.evaluation.score, books.evaluation.yes, books.evaluation.no
        );
        books.notify.send(CityNotification::EvaluationChanged);
    }
}

/// Phase 10: fade the growth and traffic memories.
pub(crate) fn decay_memories(
    clock: Res<SimClock>,
    mut density: ResMut<DensityMaps>,
    mut coverage: ResMut<CoverageMaps>,
) {
    if clock.scycle % 5 == 0 {
        coverage.decay_rate_of_growth();
    }
    density.decay_traffic();
}

/// Phase 12.
pub(crate) fn pollution_scan_system(
    map: Res<TileMap>,
    catalog: Res<TileCatalog>,
    census: Res<Census>,
    mut density: ResMut<DensityMaps>,
    mut rng: ResMut<SimRng>,
) {
    pollution_terrain_land_value_scan(
        &map,
        &catalog,
        &mut density,
        census.center_of_mass,
        &mut rng,
    );
}

/// Phase 13.
pub(crate) fn crime_scan_system(
    mut density: ResMut<DensityMaps>,
    mut coverage: ResMut<CoverageMaps>,
    mut rng: ResMut<SimRng>,
) {
    crime_scan(&mut density, &mut coverage, &mut rng);
}

/// Phase 14.
pub(crate) fn population_density_system(
    map: Res<TileMap>,
    catalog: Res<TileCatalog>,
    mut density: ResMut<DensityMaps>,
    mut coverage: ResMut<CoverageMaps>,
    mut census: ResMut<Census>,
) {
    population_density_scan(&map, &catalog, &mut density, &mut coverage, &mut census);
}

/// Phase 15, before the disaster roll.
pub(crate) fn fire_analysis_system(mut coverage: ResMut<CoverageMaps>) {
    fire_analysis(&mut coverage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_constants::{COMCLR, HOUSE, POWERPLANT, RIVER, ROADS, WOODS};

    fn plop_at(map: &mut TileMap, x: i32, y: i32, center: u16) {
        let catalog = TileCatalog::standard();
        let building = catalog.building(center).unwrap();
        for (i, &member) in building.members.iter().enumerate() {
            let (dx, dy) = building.member_offset(i);
            map.set(x + dx, y + dy, member).unwrap();
        }
    }

    #[test]
    fn test_distance_to_center_caps_at_32() {
        let center = GridPos::new(60, 50);
        assert_eq!(distance_to_center(center, 30, 25), 0);
        assert_eq!(distance_to_center(center, 33, 21), 7);
        assert_eq!(distance_to_center(center, 0, 0), 32);
    }

    #[test]
    fn test_empty_map_has_no_land_value() {
        let map = TileMap::new(32, 32);
        let catalog = TileCatalog::standard();
        let mut density = DensityMaps::new(32, 32);
        let mut rng = SimRng::from_seed_u64(1);
        pollution_terrain_land_value_scan(
            &map,
            &catalog,
            &mut density,
            GridPos::new(16, 16),
            &mut rng,
        );
        assert!(density.land_value.values().iter().all(|&v| v == 0));
        assert_eq!(density.land_value_average, 0);
        assert_eq!(density.pollution_average, 0);
    }

    #[test]
    fn test_land_value_near_center_and_water() {
        let mut map = TileMap::new(32, 32);
        map.set(16, 16, ROADS).unwrap();
        map.set(2, 2, ROADS).unwrap();
        for x in 12..20 {
            map.set(x, 20, RIVER).unwrap();
            map.set(x, 21, WOODS).unwrap();
        }
        let catalog = TileCatalog::standard();
        let mut density = DensityMaps::new(32, 32);
        let mut rng = SimRng::from_seed_u64(1);
        let center = GridPos::new(16, 16);
        // first pass builds the terrain map, the second uses it
        pollution_terrain_land_value_scan(&map, &catalog, &mut density, center, &mut rng);
        let first = density.land_value_at(16, 16);
        assert_eq!(first, 34 * 4);
        pollution_terrain_land_value_scan(&map, &catalog, &mut density, center, &mut rng);
        assert!(density.land_value_at(16, 16) > first);
        // 14 half-cells from the centre
        assert_eq!(density.land_value_at(2, 2), (34 - 14) * 4);
    }

    #[test]
    fn test_pollution_spreads_and_tracks_max() {
        let mut map = TileMap::new(32, 32);
        plop_at(&mut map, 20, 8, POWERPLANT);
        let catalog = TileCatalog::standard();
        let mut density = DensityMaps::new(32, 32);
        let mut rng = SimRng::from_seed_u64(4);
        pollution_terrain_land_value_scan(
            &map,
            &catalog,
            &mut density,
            GridPos::new(16, 16),
            &mut rng,
        );
        assert!(density.pollution_at(20, 8) > 0);
        assert!(density.pollution_average > 0);
        let max = density.pollution_max;
        assert!((max.x - 20).abs() <= 6 && (max.y - 8).abs() <= 6);
        assert_eq!(density.pollution_at(0, 31), 0);
    }

    #[test]
    fn test_crime_falls_with_police() {
        let mut density = DensityMaps::new(32, 32);
        let mut coverage = CoverageMaps::new(32, 32);
        let mut rng = SimRng::from_seed_u64(1);
        density.land_value.set(4, 4, 100);
        crime_scan(&mut density, &mut coverage, &mut rng);
        assert_eq!(density.crime.get(4, 4), 28);
        assert_eq!(density.crime_average, 28);

        coverage.police.set(1, 1, 1000);
        crime_scan(&mut density, &mut coverage, &mut rng);
        assert_eq!(density.crime.get(4, 4), 0);
        assert!(coverage.police_coverage_at(8, 8) > 0);
    }

    #[test]
    fn test_population_density_and_center_of_mass() {
        let mut map = TileMap::new(32, 32);
        plop_at(&mut map, 8, 8, COMCLR);
        plop_at(&mut map, 20, 8, RESCLR);
        map.set(19, 7, HOUSE).unwrap();
        map.set(21, 9, HOUSE).unwrap();
        let catalog = TileCatalog::standard();
        let mut density = DensityMaps::new(32, 32);
        let mut coverage = CoverageMaps::new(32, 32);
        let mut census = Census::new(32, 32);
        population_density_scan(&map, &catalog, &mut density, &mut coverage, &mut census);

        assert_eq!(census.center_of_mass, GridPos::new(14, 8));
        assert!(density.population_at(20, 8) > 0);
        // an empty commercial lot weighs nothing
        assert_eq!(density.population_at(8, 8), 0);
        // commercial rate still centres on the default (16, 16)
        assert_eq!(coverage.com_rate.get_world(14, 8), 62);
        assert_eq!(coverage.com_rate.get_world(16, 16), 64);
    }

    #[test]
    fn test_empty_map_center_is_middle() {
        let map = TileMap::new(33, 20);
        let catalog = TileCatalog::standard();
        let mut density = DensityMaps::new(33, 20);
        let mut coverage = CoverageMaps::new(33, 20);
        let mut census = Census::new(33, 20);
        census.center_of_mass = GridPos::new(1, 1);
        population_density_scan(&map, &catalog, &mut density, &mut coverage, &mut census);
        assert_eq!(census.center_of_mass, GridPos::new(17, 10));
    }

    #[test]
    fn test_fire_analysis_copies_smoothed_map() {
        let mut coverage = CoverageMaps::new(64, 64);
        coverage.fire_station.set(3, 3, 800);
        fire_analysis(&mut coverage);
        assert_eq!(coverage.fire_rate, coverage.fire_station);
        assert!(coverage.fire_coverage_at(3 * 8, 3 * 8) > 0);
        assert!(coverage.fire_coverage_at(3 * 8, 3 * 8) < 800);
    }
}
