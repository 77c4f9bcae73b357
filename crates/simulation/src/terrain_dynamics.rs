//! Per-tile reactions for non-zone tiles met by the map scan: fire, flood,
//! fallout, road and rail wear, drawbridges and explosion debris.

use crate::map_scan::CityScan;
use crate::sprites::generate_train;
use crate::tile_constants::{
    BRWH, BRWV, CHANNEL, DIRT, FIRE, FLOOD, HBRDG0, HBRDG1, HBRDG2, HBRDG3, HBRIDGE, HTRFBASE,
    IZB, LTRFBASE, RIVER, ROADBASE, RUBBLE, VBRDG0, VBRDG1, VBRDG2, VBRDG3, VBRIDGE, WOODS5,
};

const NEIGHBOURS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Road funding below which roads and rail start to crumble.
const WEAR_THRESHOLD: i32 = 30;

const TRAFFIC_TIERS: [u16; 3] = [ROADBASE, LTRFBASE, HTRFBASE];

// ---------------------------------------------------------------------------
// Fire, flood, fallout
// ---------------------------------------------------------------------------

pub fn do_fire(scan: &mut CityScan, x: i32, y: i32) {
    scan.census.fire_pop += 1;
    if !scan.rng.chance(4) {
        return;
    }

    for (dx, dy) in NEIGHBOURS {
        if !scan.rng.chance(8) {
            continue;
        }
        let (xx, yy) = (x + dx, y + dy);
        if !scan.map.in_bounds(xx, yy) {
            continue;
        }
        let c = scan.tile(xx, yy);
        if !scan.catalog.is_combustible(c) {
            continue;
        }
        if scan.catalog.is_zone_center(c) {
            scan.kill_zone(xx, yy, c);
            if c > IZB {
                scan.make_explosion(xx, yy);
            }
        }
        let flame = FIRE + scan.rng.next_int(4) as u16;
        scan.map.put(xx, yy, flame);
    }

    let coverage = scan.coverage.fire_coverage_at(x, y);
    let rate = match coverage {
        c if c > 100 => 1,
        c if c > 20 => 2,
        0 => 10,
        _ => 3,
    };
    if scan.rng.chance(rate + 1) {
        let rubble = RUBBLE + scan.rng.next_int(4) as u16;
        scan.map.put(x, y, rubble);
    }
}

pub fn do_flood(scan: &mut CityScan, x: i32, y: i32) {
    if scan.disaster.flood_count == 0 {
        if scan.rng.chance(16) {
            scan.map.put(x, y, DIRT);
        }
        return;
    }

    for (dx, dy) in NEIGHBOURS {
        if !scan.rng.chance(8) {
            continue;
        }
        let (xx, yy) = (x + dx, y + dy);
        if !scan.map.in_bounds(xx, yy) {
            continue;
        }
        let t = scan.tile(xx, yy);
        let floodable =
            scan.catalog.is_combustible(t) || t == DIRT || (WOODS5..FLOOD).contains(&t);
        if !floodable {
            continue;
        }
        if scan.catalog.is_zone_center(t) {
            scan.kill_zone(xx, yy, t);
        }
        let water = FLOOD + scan.rng.next_int(3) as u16;
        scan.map.put(xx, yy, water);
    }
}

pub fn do_radioactive(scan: &mut CityScan, x: i32, y: i32) {
    if scan.rng.chance(4096) {
        scan.map.put(x, y, DIRT);
    }
}

/// Explosion debris settles into rubble.
pub fn do_explosion(scan: &mut CityScan, x: i32, y: i32) {
    let rubble = RUBBLE + scan.rng.next_int(4) as u16;
    scan.map.put(x, y, rubble);
}

// ---------------------------------------------------------------------------
// Roads and rail
// ---------------------------------------------------------------------------

/// Underfunded transport occasionally falls apart. Returns true if the tile
/// was destroyed.
fn wear(scan: &mut CityScan, x: i32, y: i32, tile: u16) -> bool {
    let road_effect = scan.effects.road_effect;
    if road_effect >= WEAR_THRESHOLD || !scan.rng.chance(512) {
        return false;
    }
    if scan.catalog.is_conductive(tile) || road_effect >= scan.rng.next_int(32) {
        return false;
    }
    if scan.catalog.is_overwater(tile) {
        scan.map.put(x, y, RIVER);
    } else {
        let rubble = RUBBLE + scan.rng.next_int(4) as u16;
        scan.map.put(x, y, rubble);
    }
    true
}

pub fn do_road(scan: &mut CityScan, x: i32, y: i32, tile: u16) {
    scan.census.road_total += 1;
    if wear(scan, x, y, tile) {
        return;
    }

    if !scan.catalog.is_combustible(tile) {
        // bridges count extra toward upkeep
        scan.census.road_total += 4;
        if do_bridge(scan, x, y, tile) {
            return;
        }
    }

    let current = if tile < LTRFBASE {
        0
    } else if tile < HTRFBASE {
        1
    } else {
        scan.census.road_total += 1;
        2
    };

    let density = scan.density.traffic_at(x, y);
    let wanted = if density < 64 {
        0
    } else if density < 192 {
        1
    } else {
        2
    };

    if current != wanted {
        let z = ((tile - ROADBASE) & 15) + TRAFFIC_TIERS[wanted];
        scan.map.put(x, y, z);
    }
}

pub fn do_rail(scan: &mut CityScan, x: i32, y: i32, tile: u16) {
    scan.census.rail_total += 1;
    generate_train(scan, x, y);
    wear(scan, x, y, tile);
}

// ---------------------------------------------------------------------------
// Drawbridges
// ---------------------------------------------------------------------------

struct BridgeLayout {
    dx: [i32; 7],
    dy: [i32; 7],
    open: [u16; 7],
    closed: [u16; 7],
}

const HORIZONTAL_BRIDGE: BridgeLayout = BridgeLayout {
    dx: [-2, 2, -2, -1, 0, 1, 2],
    dy: [-1, -1, 0, 0, 0, 0, 0],
    open: [HBRDG1, HBRDG3, HBRDG0, RIVER, BRWH, RIVER, HBRDG2],
    closed: [RIVER, RIVER, HBRIDGE, HBRIDGE, HBRIDGE, HBRIDGE, HBRIDGE],
};

const VERTICAL_BRIDGE: BridgeLayout = BridgeLayout {
    dx: [0, 1, 0, 0, 0, 0, 1],
    dy: [-2, -2, -1, 0, 1, 2, 2],
    open: [VBRDG0, VBRDG1, RIVER, BRWV, RIVER, VBRDG2, VBRDG3],
    closed: [VBRIDGE, RIVER, VBRIDGE, VBRIDGE, VBRIDGE, VBRIDGE, RIVER],
};

/// Ships within this many tiles make a bridge open.
const OPEN_DISTANCE: i32 = 300 / 16;
/// An open bridge closes once every ship is farther than this.
const CLOSE_DISTANCE: i32 = 340 / 16;

fn apply_bridge_change(scan: &mut CityScan, x: i32, y: i32, layout: &BridgeLayout, opening: bool) {
    let (from, to) = if opening {
        (&layout.closed, &layout.open)
    } else {
        (&layout.open, &layout.closed)
    };
    for z in 0..7 {
        let (xx, yy) = (x + layout.dx[z], y + layout.dy[z]);
        if !scan.map.in_bounds(xx, yy) {
            continue;
        }
        let t = scan.tile(xx, yy);
        if t == from[z] || t == CHANNEL {
            scan.map.put(xx, yy, to[z]);
        }
    }
}

/// Returns true when the tile is an open drawbridge or just opened, in which
/// case the caller skips the traffic update.
fn do_bridge(scan: &mut CityScan, x: i32, y: i32, tile: u16) -> bool {
    if tile == BRWV || tile == BRWH {
        let layout = if tile == BRWV {
            &VERTICAL_BRIDGE
        } else {
            &HORIZONTAL_BRIDGE
        };
        if scan.rng.chance(4) && scan.sprites.ship_distance(x, y) > CLOSE_DISTANCE {
            apply_bridge_change(scan, x, y, layout, false);
        }
        return true;
    }

    if scan.sprites.ship_distance(x, y) >= OPEN_DISTANCE || !scan.rng.chance(8) {
        return false;
    }
    if tile & 1 == 0 {
        // horizontal: the channel runs just above
        if y > 0 && scan.tile(x, y - 1) == CHANNEL {
            apply_bridge_change(scan, x, y, &HORIZONTAL_BRIDGE, true);
            return true;
        }
    } else if x < scan.width() - 1 && scan.tile(x + 1, y) == CHANNEL {
        apply_bridge_change(scan, x, y, &VERTICAL_BRIDGE, true);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_tables_have_one_drawbridge_each() {
        assert_eq!(
            HORIZONTAL_BRIDGE.open.iter().filter(|&&t| t == BRWH).count(),
            1
        );
        assert_eq!(
            VERTICAL_BRIDGE.open.iter().filter(|&&t| t == BRWV).count(),
            1
        );
        // the drawbridge sits on the scanned tile itself
        let h = HORIZONTAL_BRIDGE.open.iter().position(|&t| t == BRWH).unwrap();
        assert_eq!((HORIZONTAL_BRIDGE.dx[h], HORIZONTAL_BRIDGE.dy[h]), (0, 0));
        let v = VERTICAL_BRIDGE.open.iter().position(|&t| t == BRWV).unwrap();
        assert_eq!((VERTICAL_BRIDGE.dx[v], VERTICAL_BRIDGE.dy[v]), (0, 0));
    }

    #[test]
    fn test_distances() {
        assert_eq!(OPEN_DISTANCE, 18);
        assert_eq!(CLOSE_DISTANCE, 21);
    }

    #[test]
    fn test_traffic_tier_math() {
        // a plain road piece keeps its shape when moving between tiers
        let tile = ROADBASE + 3;
        let heavy = ((tile - ROADBASE) & 15) + TRAFFIC_TIERS[2];
        assert_eq!(heavy, HTRFBASE + 3);
        let back = ((heavy - ROADBASE) & 15) + TRAFFIC_TIERS[0];
        assert_eq!(back, tile);
    }
}
