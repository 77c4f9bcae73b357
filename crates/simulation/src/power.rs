//! Power distribution: a capacity-limited walk outward from every plant
//! through conductive tiles.

use bevy::prelude::*;

use crate::census::Census;
use crate::grid::{GridPos, TileMap};
use crate::messages::{CityMessage, CityMessageEvent};
use crate::sub_maps::PowerMap;
use crate::tile_catalog::TileCatalog;
use crate::tile_constants::{LOMASK, NUCLEAR, POWERPLANT};

/// Cells a coal plant can energise per scan.
pub const COAL_CAPACITY: i32 = 700;
/// Cells a nuclear plant can energise per scan.
pub const NUCLEAR_CAPACITY: i32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerScanResult {
    /// Cells walked, including those revisited at branch points.
    pub conducted: i32,
    pub capacity: i32,
    /// The walk ran out of capacity before reaching every connected cell.
    pub brownout: bool,
}

/// Walk power outward from `plants`, consuming the stack. Capacity is shared
/// by every plant; once it runs out the scan stops where it is.
pub fn power_scan(
    map: &TileMap,
    catalog: &TileCatalog,
    plants: &mut Vec<GridPos>,
    coal_count: i32,
    nuclear_count: i32,
    power: &mut PowerMap,
) -> PowerScanResult {
    power.clear();
    let capacity = coal_count * COAL_CAPACITY + nuclear_count * NUCLEAR_CAPACITY;
    let mut conducted = 0;

    let can_conduct = |power: &PowerMap, p: GridPos| {
        if !map.in_bounds(p.x, p.y) {
            return false;
        }
        let t = map.tile(p.x, p.y);
        catalog.is_conductive(t) && t != NUCLEAR && t != POWERPLANT && !power.has_power(p.x, p.y)
    };

    while let Some(start) = plants.pop() {
        let mut pos = start;
        // 4 means "stay put" on the first step
        let mut dir = 4;
        loop {
            conducted += 1;
            if conducted > capacity {
                return PowerScanResult {
                    conducted,
                    capacity,
                    brownout: true,
                };
            }
            pos = pos.step(dir);
            power.set(pos.x, pos.y, true);

            let mut branches = 0;
            for d in 0..4 {
                if branches >= 2 {
                    break;
                }
                if can_conduct(power, pos.step(d)) {
                    branches += 1;
                    dir = d;
                }
            }
            if branches > 1 {
                plants.push(pos);
            }
            if branches == 0 {
                break;
            }
        }
    }

    PowerScanResult {
        conducted,
        capacity,
        brownout: false,
    }
}

/// Find every plant centre on the map, refreshing the census plant counts
/// and work stack. Used after loads and edits, when no map scan has run.
pub fn collect_plants(map: &TileMap, census: &mut Census) {
    census.coal_count = 0;
    census.nuclear_count = 0;
    census.power_plants.clear();
    for (x, y, cell) in map.iter() {
        match cell & LOMASK {
            POWERPLANT => census.coal_count += 1,
            NUCLEAR => census.nuclear_count += 1,
            _ => continue,
        }
        census.power_plants.push(GridPos::new(x, y));
    }
}

/// Recount the plants and redo the power scan from scratch.
pub fn check_power_map(
    map: &TileMap,
    catalog: &TileCatalog,
    census: &mut Census,
    power: &mut PowerMap,
) -> PowerScanResult {
    collect_plants(map, census);
    let (coal, nuclear) = (census.coal_count, census.nuclear_count);
    power_scan(map, catalog, &mut census.power_plants, coal, nuclear, power)
}

/// Phase 11.
pub(crate) fn power_scan_system(
    map: Res<TileMap>,
    catalog: Res<TileCatalog>,
    mut census: ResMut<Census>,
    mut power: ResMut<PowerMap>,
    mut messages: EventWriter<CityMessageEvent>,
) {
    let census = &mut *census;
    let result = power_scan(
        &map,
        &catalog,
        &mut census.power_plants,
        census.coal_count,
        census.nuclear_count,
        &mut power,
    );
    if result.brownout {
        warn!(
            "brownout: {} plants supply {} cells, grid needs more",
            census.coal_count + census.nuclear_count,
            result.capacity
        );
        messages.send(CityMessageEvent {
            message: CityMessage::BrownoutsReport,
            location: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_constants::{POWERBASE, RESCLR, ROADS};

    fn plop_at(map: &mut TileMap, x: i32, y: i32, center: u16) {
        let catalog = TileCatalog::standard();
        let building = catalog.building(center).unwrap();
        for (i, &member) in building.members.iter().enumerate() {
            let (dx, dy) = building.member_offset(i);
            map.set(x + dx, y + dy, member).unwrap();
        }
    }

    fn scan(map: &TileMap, power: &mut PowerMap) -> PowerScanResult {
        let catalog = TileCatalog::standard();
        let mut census = Census::new(map.width, map.height);
        check_power_map(map, &catalog, &mut census, power)
    }

    #[test]
    fn test_plant_powers_wired_zone() {
        let mut map = TileMap::new(32, 32);
        plop_at(&mut map, 5, 5, POWERPLANT);
        for x in 8..12 {
            map.set(x, 5, POWERBASE).unwrap();
        }
        plop_at(&mut map, 13, 5, RESCLR);
        let mut power = PowerMap::new(32, 32);
        let result = scan(&map, &mut power);

        assert!(!result.brownout);
        assert_eq!(result.capacity, COAL_CAPACITY);
        assert!(power.has_power(5, 5));
        assert!(power.has_power(10, 5));
        assert!(power.has_power(13, 5));
        assert!(power.has_power(14, 6));
        // roads do not conduct
        assert!(!power.has_power(5, 10));
    }

    #[test]
    fn test_unconnected_zone_stays_dark() {
        let mut map = TileMap::new(32, 32);
        plop_at(&mut map, 5, 5, POWERPLANT);
        map.set(8, 5, ROADS).unwrap();
        plop_at(&mut map, 10, 5, RESCLR);
        let mut power = PowerMap::new(32, 32);
        scan(&map, &mut power);
        assert!(power.has_power(6, 6));
        assert!(!power.has_power(10, 5));
    }

    #[test]
    fn test_brownout_past_capacity() {
        // one coal plant and a wire run far longer than 700 cells
        let mut map = TileMap::new(200, 200);
        plop_at(&mut map, 2, 2, POWERPLANT);
        for y in 0..200 {
            for x in 5..200 {
                if x % 2 == 1 || y == 0 || y == 199 {
                    map.set(x, y, POWERBASE).unwrap();
                }
            }
        }
        let mut power = PowerMap::new(200, 200);
        let result = scan(&map, &mut power);
        assert!(result.brownout);
        assert!(power.powered_count() <= COAL_CAPACITY as usize);
    }

    #[test]
    fn test_no_plants_no_power() {
        let mut map = TileMap::new(16, 16);
        map.set(3, 3, POWERBASE).unwrap();
        let mut power = PowerMap::new(16, 16);
        let result = scan(&map, &mut power);
        assert!(!result.brownout);
        assert_eq!(power.powered_count(), 0);
    }

    #[test]
    fn test_collect_plants_counts_both_kinds() {
        let mut map = TileMap::new(32, 32);
        plop_at(&mut map, 5, 5, POWERPLANT);
        plop_at(&mut map, 20, 20, NUCLEAR);
        let mut census = Census::new(32, 32);
        collect_plants(&map, &mut census);
        assert_eq!(census.coal_count, 1);
        assert_eq!(census.nuclear_count, 1);
        assert_eq!(census.power_plants.len(), 2);
    }
}
