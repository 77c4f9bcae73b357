//! Fixed-size buildings: power plants, emergency services, stadiums,
//! transport hubs, hospitals and churches.

use super::{check_zone_power, repair_zone, zone_plop, Zone};
use crate::config::MELTDOWN_CHANCE;
use crate::disasters::do_meltdown;
use crate::grid::GridPos;
use crate::map_scan::CityScan;
use crate::sprites::{generate_copter, generate_plane, generate_ship, SpriteKind};
use crate::tile_constants::{
    AIRPORT, CHURCH, FIRESTATION, FOOTBALLGAME1, FOOTBALLGAME2, FULLSTADIUM, HOSPITAL, NUCLEAR,
    POLICESTATION, PORT, POWERPLANT, RESCLR, STADIUM,
};
use crate::traffic::find_perimeter_road;

/// True on the weeks a building of this kind patches itself up.
fn repair_week(scan: &CityScan, every: i32) -> bool {
    scan.clock.city_time % every == 0
}

pub(super) fn do_hospital_church(scan: &mut CityScan, zone: Zone) {
    check_zone_power(scan, zone);
    let need = if zone.tile == HOSPITAL {
        scan.census.hospital_count += 1;
        if repair_week(scan, 16) {
            repair_zone(scan, zone, HOSPITAL, 3);
        }
        scan.census.need_hospital
    } else {
        scan.census.church_count += 1;
        if repair_week(scan, 16) {
            repair_zone(scan, zone, CHURCH, 3);
        }
        scan.census.need_church
    };

    // too many of them: occasionally one turns back into an empty lot
    if need == -1 && scan.rng.chance(21) {
        zone_plop(scan, zone, RESCLR);
    }
}

// ---------------------------------------------------------------------------
// Power plants
// ---------------------------------------------------------------------------

pub(super) fn do_coal_power(scan: &mut CityScan, zone: Zone) {
    check_zone_power(scan, zone);
    scan.census.coal_count += 1;
    if repair_week(scan, 8) {
        repair_zone(scan, zone, POWERPLANT, 4);
    }
    scan.census.power_plants.push(GridPos::new(zone.x, zone.y));
}

pub(super) fn do_nuclear_power(scan: &mut CityScan, zone: Zone) {
    check_zone_power(scan, zone);
    let odds = MELTDOWN_CHANCE[scan.options.level()];
    if !scan.options.no_disasters && scan.rng.next_int(odds + 1) == 0 {
        do_meltdown(scan, zone.x, zone.y);
        return;
    }
    scan.census.nuclear_count += 1;
    if repair_week(scan, 8) {
        repair_zone(scan, zone, NUCLEAR, 4);
    }
    scan.census.power_plants.push(GridPos::new(zone.x, zone.y));
}

// ---------------------------------------------------------------------------
// Fire and police
// ---------------------------------------------------------------------------

/// Station strength: the funded effect, halved without power and halved
/// again without road access.
fn station_strength(scan: &CityScan, zone: Zone, powered: bool, effect: i32) -> i32 {
    let mut z = if powered { effect } else { effect / 2 };
    if find_perimeter_road(&scan.map, zone.x, zone.y).is_none() {
        z /= 2;
    }
    z
}

pub(super) fn do_fire_station(scan: &mut CityScan, zone: Zone) {
    let powered = check_zone_power(scan, zone);
    scan.census.fire_station_count += 1;
    if repair_week(scan, 8) {
        repair_zone(scan, zone, FIRESTATION, 3);
    }
    let z = station_strength(scan, zone, powered, scan.effects.fire_effect);
    scan.coverage.fire_station.add_world(zone.x, zone.y, z);
}

pub(super) fn do_police_station(scan: &mut CityScan, zone: Zone) {
    let powered = check_zone_power(scan, zone);
    scan.census.police_count += 1;
    if repair_week(scan, 8) {
        repair_zone(scan, zone, POLICESTATION, 3);
    }
    let z = station_strength(scan, zone, powered, scan.effects.police_effect);
    scan.coverage.police.add_world(zone.x, zone.y, z);
}

// ---------------------------------------------------------------------------
// Stadiums
// ---------------------------------------------------------------------------

pub(super) fn do_stadium_empty(scan: &mut CityScan, zone: Zone) {
    let powered = check_zone_power(scan, zone);
    scan.census.stadium_count += 1;
    if repair_week(scan, 16) {
        repair_zone(scan, zone, STADIUM, 4);
    }
    if powered && (scan.clock.city_time + zone.x + zone.y) % 32 == 0 {
        draw_stadium(scan, zone, FULLSTADIUM);
        scan.map.put(zone.x + 1, zone.y, FOOTBALLGAME1);
        scan.map.put(zone.x + 1, zone.y + 1, FOOTBALLGAME2);
    }
}

pub(super) fn do_stadium_full(scan: &mut CityScan, zone: Zone) {
    check_zone_power(scan, zone);
    scan.census.stadium_count += 1;
    if (scan.clock.city_time + zone.x + zone.y) % 8 == 0 {
        draw_stadium(scan, zone, STADIUM);
    }
}

/// Redraw the 4×4 stadium around `zone` from the block ending at `center`,
/// keeping the centre powered.
fn draw_stadium(scan: &mut CityScan, zone: Zone, center: u16) {
    let mut tile = center - 5;
    for y in zone.y - 1..zone.y + 3 {
        for x in zone.x - 1..zone.x + 3 {
            scan.map.put(x, y, tile);
            tile += 1;
        }
    }
    scan.map.mark_power(zone.x, zone.y, true);
}

// ---------------------------------------------------------------------------
// Transport hubs
// ---------------------------------------------------------------------------

pub(super) fn do_airport(scan: &mut CityScan, zone: Zone) {
    let powered = check_zone_power(scan, zone);
    scan.census.airport_count += 1;
    if repair_week(scan, 8) {
        repair_zone(scan, zone, AIRPORT, 6);
    }
    if powered {
        if scan.rng.chance(6) {
            generate_plane(scan, zone.x, zone.y);
        }
        if scan.rng.chance(13) {
            generate_copter(scan, zone.x, zone.y);
        }
    }
}

pub(super) fn do_seaport(scan: &mut CityScan, zone: Zone) {
    let powered = check_zone_power(scan, zone);
    scan.census.seaport_count += 1;
    if repair_week(scan, 16) {
        repair_zone(scan, zone, PORT, 4);
    }
    if powered && !scan.sprites.has(SpriteKind::Ship) {
        generate_ship(scan);
    }
}
