//! Zone centres met by the map scan: residential, commercial and industrial
//! growth, plus the fixed-size service buildings.
//!
//! Every zone first refreshes its power state (swapping its footprint to the
//! powered or unpowered tiles when that changes) and is counted in the
//! census. The kind-specific behaviour then runs.

mod growth;
mod services;

use crate::grid::TileMap;
use crate::map_scan::CityScan;
use crate::sub_maps::{CoverageMaps, DensityMaps};
use crate::tile_catalog::{is_indestructible, is_indestructible2, TileBehavior, TileCatalog};
use crate::tile_constants::{HHTHR, LHTHR, NUCLEAR, POWERPLANT};

/// A zone centre being scanned. `tile` is the value seen when the scan
/// reached it and is refreshed when the zone is replaced in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Zone {
    pub x: i32,
    pub y: i32,
    pub tile: u16,
}

pub fn do_zone(scan: &mut CityScan, x: i32, y: i32, tile: u16, behavior: TileBehavior) {
    let zone = Zone { x, y, tile };
    match behavior {
        TileBehavior::Residential => growth::do_residential(scan, zone),
        TileBehavior::Commercial => growth::do_commercial(scan, zone),
        TileBehavior::Industrial => growth::do_industrial(scan, zone),
        TileBehavior::HospitalChurch => services::do_hospital_church(scan, zone),
        TileBehavior::Coal => services::do_coal_power(scan, zone),
        TileBehavior::Nuclear => services::do_nuclear_power(scan, zone),
        TileBehavior::FireStation => services::do_fire_station(scan, zone),
        TileBehavior::PoliceStation => services::do_police_station(scan, zone),
        TileBehavior::StadiumEmpty => services::do_stadium_empty(scan, zone),
        TileBehavior::StadiumFull => services::do_stadium_full(scan, zone),
        TileBehavior::Airport => services::do_airport(scan, zone),
        TileBehavior::Seaport => services::do_seaport(scan, zone),
        terrain => unreachable!("{terrain:?} is not a zone behaviour"),
    }
}

// ---------------------------------------------------------------------------
// Shared zone mechanics
// ---------------------------------------------------------------------------

/// Refresh the zone's power state and count it as powered or unpowered.
pub(crate) fn check_zone_power(scan: &mut CityScan, zone: Zone) -> bool {
    let powered = set_zone_power(scan, zone);
    if powered {
        scan.census.powered_zone_count += 1;
    } else {
        scan.census.unpowered_zone_count += 1;
    }
    powered
}

/// Plants power themselves; everything else needs the power scan to have
/// reached its centre.
pub(crate) fn set_zone_power(scan: &mut CityScan, zone: Zone) -> bool {
    let Zone { x, y, tile } = zone;
    let was_powered = scan.map.is_powered(x, y);
    let powered = tile == NUCLEAR || tile == POWERPLANT || scan.power.has_power(x, y);

    if powered && !was_powered {
        scan.map.mark_power(x, y, true);
        let size = scan.footprint(tile);
        scan.power_zone(x, y, size);
    } else if !powered && was_powered {
        scan.map.mark_power(x, y, false);
        let size = scan.footprint(tile);
        scan.shutdown_zone(x, y, size);
    }
    powered
}

/// Replace the zone with the building whose centre is `base`. Nothing
/// happens if the footprint leaves the map or covers fire, flood or fallout.
/// Returns the zone as it stands afterwards.
pub(crate) fn zone_plop(scan: &mut CityScan, zone: Zone, base: u16) -> Zone {
    let Some(building) = scan.catalog.building(base) else {
        panic!("zone centre {base} has no building footprint in the tile catalog");
    };
    let (width, height) = (building.width as i32, building.height as i32);
    let members = building.members.clone();

    for y in zone.y - 1..zone.y - 1 + height {
        for x in zone.x - 1..zone.x - 1 + width {
            if !scan.map.in_bounds(x, y) || is_indestructible2(scan.tile(x, y)) {
                return zone;
            }
        }
    }

    let mut members = members.into_iter();
    for y in zone.y - 1..zone.y - 1 + height {
        for x in zone.x - 1..zone.x - 1 + width {
            if let Some(member) = members.next() {
                scan.map.put(x, y, member);
            }
        }
    }

    let replaced = Zone {
        tile: scan.tile(zone.x, zone.y),
        ..zone
    };
    set_zone_power(scan, replaced);
    replaced
}

/// Rebuild footprint members lost to damage. Rubble, fire, flood, fallout,
/// animated tiles and zone centres are left alone.
pub(crate) fn repair_zone(scan: &mut CityScan, zone: Zone, center: u16, size: i32) {
    let mut member = center as i32 - 1 - size;
    for dy in 0..size {
        for dx in 0..size {
            let (xx, yy) = (zone.x - 1 + dx, zone.y - 1 + dy);
            let current = member as u16;
            member += 1;
            if !scan.map.in_bounds(xx, yy) {
                continue;
            }
            let t = scan.tile(xx, yy);
            if scan.catalog.is_zone_center(t) || scan.catalog.is_animated(t) {
                continue;
            }
            if !is_indestructible(t) {
                scan.map.put(xx, yy, current);
            }
        }
    }
}

/// Record growth (+) or decline (-) on the rate-of-growth map. One unit is
/// one little house; 8 is a full zone step.
pub(crate) fn adjust_rog(scan: &mut CityScan, zone: Zone, amount: i32) {
    scan.coverage
        .rate_of_growth
        .add_world(zone.x, zone.y, 4 * amount);
}

/// Land value class 0..=3 from land value minus pollution.
pub(crate) fn cr_value(scan: &CityScan, zone: Zone) -> i32 {
    let value =
        scan.density.land_value_at(zone.x, zone.y) - scan.density.pollution_at(zone.x, zone.y);
    match value {
        v if v < 30 => 0,
        v if v < 80 => 1,
        v if v < 150 => 2,
        _ => 3,
    }
}

/// Little houses in the 3×3 block around a bare residential lot.
pub fn do_free_pop(map: &TileMap, x: i32, y: i32) -> i32 {
    let mut count = 0;
    for xx in x - 1..=x + 1 {
        for yy in y - 1..=y + 1 {
            if map.in_bounds(xx, yy) && (LHTHR..=HHTHR).contains(&map.tile(xx, yy)) {
                count += 1;
            }
        }
    }
    count
}

// ---------------------------------------------------------------------------
// Zone query
// ---------------------------------------------------------------------------

/// What the query tool reports for a cell. Each indicator is a 1-based
/// index into the classic status string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneStatus {
    /// Building description number, -1 for undescribed tiles.
    pub building: i32,
    pub pop_density: i32,
    pub land_value: i32,
    pub crime: i32,
    pub pollution: i32,
    pub growth_rate: i32,
}

pub fn query_zone_status(
    map: &TileMap,
    catalog: &TileCatalog,
    density: &DensityMaps,
    coverage: &CoverageMaps,
    x: i32,
    y: i32,
) -> Option<ZoneStatus> {
    let tile = map.get(x, y)?;

    let pop_density = density.population_at(x, y) / 64 % 4 + 1;
    let land_value = match density.land_value_at(x, y) {
        v if v < 30 => 4,
        v if v < 80 => 5,
        v if v < 150 => 6,
        _ => 7,
    } + 1;
    let crime = density.crime_at(x, y) / 64 % 4 + 8 + 1;
    let pollution = (density.pollution_at(x, y) / 64 % 4 + 12).max(13) + 1;
    let growth_rate = match coverage.rate_of_growth.get_world(x, y) {
        r if r < 0 => 16,
        0 => 17,
        r if r <= 100 => 18,
        _ => 19,
    } + 1;

    Some(ZoneStatus {
        building: catalog.description(tile),
        pop_density,
        land_value,
        crime,
        pollution,
        growth_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_scan::test_support::{scan_app, with_scan};
    use crate::tile_constants::*;

    fn plop_at(map: &mut TileMap, x: i32, y: i32, center: u16) {
        let catalog = TileCatalog::standard();
        let building = catalog.building(center).unwrap();
        for (i, &member) in building.members.iter().enumerate() {
            let (dx, dy) = building.member_offset(i);
            map.set(x + dx, y + dy, member).unwrap();
        }
    }

    #[test]
    fn test_free_pop_counts_little_houses() {
        let mut map = TileMap::new(16, 16);
        map.set(4, 4, RESCLR).unwrap();
        map.set(3, 3, HOUSE).unwrap();
        map.set(5, 5, HOUSE + 11).unwrap();
        map.set(6, 6, HOUSE).unwrap();
        assert_eq!(do_free_pop(&map, 4, 4), 2);
    }

    #[test]
    fn test_zone_plop_blocked_by_fire() {
        let mut map = TileMap::new(16, 16);
        plop_at(&mut map, 5, 5, RESCLR);
        map.set(6, 6, FIRE).unwrap();
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 5,
            y: 5,
            tile: RESCLR,
        };
        let after = with_scan(&mut app, move |scan| zone_plop(scan, zone, COMCLR));
        assert_eq!(after.tile, RESCLR);
        assert_eq!(app.world().resource::<TileMap>().tile(6, 6), FIRE);
    }

    #[test]
    fn test_zone_plop_off_map_is_ignored() {
        let mut map = TileMap::new(16, 16);
        map.set(0, 0, RESCLR).unwrap();
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 0,
            y: 0,
            tile: RESCLR,
        };
        let after = with_scan(&mut app, move |scan| zone_plop(scan, zone, INDCLR));
        assert_eq!(after.tile, RESCLR);
    }

    #[test]
    fn test_zone_plop_replaces_footprint() {
        let mut map = TileMap::new(16, 16);
        plop_at(&mut map, 5, 5, RESCLR);
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 5,
            y: 5,
            tile: RESCLR,
        };
        let after = with_scan(&mut app, move |scan| zone_plop(scan, zone, COMCLR));
        assert_eq!(after.tile, COMCLR);
        let map = app.world().resource::<TileMap>();
        assert_eq!(map.tile(4, 4), COMBASE);
        assert_eq!(map.tile(6, 6), COMBASE + 8);
    }

    #[test]
    fn test_plants_are_always_powered() {
        let mut map = TileMap::new(16, 16);
        plop_at(&mut map, 5, 5, POWERPLANT);
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 5,
            y: 5,
            tile: POWERPLANT,
        };
        assert!(with_scan(&mut app, move |scan| check_zone_power(scan, zone)));
        assert!(app.world().resource::<TileMap>().is_powered(5, 5));
        let census = app.world().resource::<crate::census::Census>();
        assert_eq!(census.powered_zone_count, 1);
    }

    #[test]
    fn test_zone_loses_power_when_scan_misses_it() {
        let mut map = TileMap::new(16, 16);
        plop_at(&mut map, 5, 5, COMCLR);
        map.set_power(5, 5, true).unwrap();
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 5,
            y: 5,
            tile: COMCLR,
        };
        assert!(!with_scan(&mut app, move |scan| check_zone_power(scan, zone)));
        assert!(!app.world().resource::<TileMap>().is_powered(5, 5));
        let census = app.world().resource::<crate::census::Census>();
        assert_eq!(census.unpowered_zone_count, 1);
    }

    #[test]
    fn test_repair_zone_skips_rubble_and_centre() {
        let mut map = TileMap::new(16, 16);
        plop_at(&mut map, 5, 5, FIRESTATION);
        map.set(4, 4, DIRT).unwrap();
        map.set(6, 6, RUBBLE).unwrap();
        let mut app = scan_app(map, 1);
        let zone = Zone {
            x: 5,
            y: 5,
            tile: FIRESTATION,
        };
        with_scan(&mut app, move |scan| repair_zone(scan, zone, FIRESTATION, 3));
        let map = app.world().resource::<TileMap>();
        assert_eq!(map.tile(4, 4), FIRESTBASE);
        assert_eq!(map.tile(6, 6), RUBBLE);
        assert_eq!(map.tile(5, 5), FIRESTATION);
    }

    #[test]
    fn test_query_zone_status_bands() {
        let mut map = TileMap::new(16, 16);
        map.set(2, 2, RESCLR).unwrap();
        let mut density = DensityMaps::new(16, 16);
        let mut coverage = CoverageMaps::new(16, 16);
        density.land_value.set_world(2, 2, 100);
        density.population.set_world(2, 2, 130);
        coverage.rate_of_growth.set_world(2, 2, -5);
        let catalog = TileCatalog::standard();

        let status = query_zone_status(&map, &catalog, &density, &coverage, 2, 2).unwrap();
        assert_eq!(status.pop_density, 3);
        assert_eq!(status.land_value, 7);
        assert_eq!(status.crime, 9);
        assert_eq!(status.pollution, 14);
        assert_eq!(status.growth_rate, 17);
        assert!(query_zone_status(&map, &catalog, &density, &coverage, 16, 2).is_none());
    }
}
