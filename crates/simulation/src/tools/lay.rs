//! Roads, rail and power lines: one cell at a time, with bridges, tunnels
//! and crossings.

use crate::tile_catalog::{can_auto_bulldoze_rrw, neutralize_road};
use crate::tile_constants::{
    CHANNEL, DIRT, HBRIDGE, HPOWER, HRAIL, HRAILROAD, HROADPOWER, INTERSECTION, LHPOWER, LHRAIL,
    LVPOWER, LVRAIL, RAILHPOWERV, RAILVPOWERH, REDGE, RIVER, ROADS, ROADS2, VBRIDGE, VPOWER,
    VRAIL, VRAILROAD, VROADPOWER,
};

use super::preview::{fix_zone, EditBuffer};
use super::{CityRect, Tool};

const ROAD_COST: i32 = 10;
const BRIDGE_COST: i32 = 50;
const RAIL_COST: i32 = 20;
const TUNNEL_COST: i32 = 100;
const WIRE_COST: i32 = 5;
const UNDERWATER_WIRE_COST: i32 = 25;

/// Lay the line in alternating forward and backward passes until a pass
/// places nothing. Each pass stops at the first cell it lays.
pub(super) fn apply_line(eff: &mut EditBuffer, tool: Tool, bounds: CityRect) {
    loop {
        if !forward_pass(eff, tool, bounds) {
            break;
        }
        if !backward_pass(eff, tool, bounds) {
            break;
        }
    }
}

fn forward_pass(eff: &mut EditBuffer, tool: Tool, b: CityRect) -> bool {
    for i in 0..b.height {
        for j in 0..b.width {
            if eff.shifted(b.x + j, b.y + i, |eff| lay_single(eff, tool)) {
                return true;
            }
        }
    }
    false
}

fn backward_pass(eff: &mut EditBuffer, tool: Tool, b: CityRect) -> bool {
    for i in (0..b.height).rev() {
        for j in (0..b.width).rev() {
            if eff.shifted(b.x + j, b.y + i, |eff| lay_single(eff, tool)) {
                return true;
            }
        }
    }
    false
}

fn lay_single(eff: &mut EditBuffer, tool: Tool) -> bool {
    let laid = match tool {
        Tool::Roads => lay_road(eff),
        Tool::Rail => lay_rail(eff),
        Tool::Wire => lay_wire(eff),
        other => unreachable!("{other:?} is not a line tool"),
    };
    if laid {
        fix_zone(eff);
    }
    laid
}

/// Clearing cost on top of the base cost for a non-dirt cell, or `None`
/// when the cell cannot be cleared.
fn clearing_cost(eff: &EditBuffer, tile: u16) -> Option<i32> {
    if tile == DIRT {
        Some(0)
    } else if eff.auto_bulldoze && can_auto_bulldoze_rrw(tile) {
        Some(1)
    } else {
        None
    }
}

fn lay_road(eff: &mut EditBuffer) -> bool {
    let tile = eff.get(0, 0);
    let cost = match tile {
        RIVER | REDGE | CHANNEL => {
            let east = neutralize_road(eff.get(1, 0));
            let west = neutralize_road(eff.get(-1, 0));
            let south = neutralize_road(eff.get(0, 1));
            let north = neutralize_road(eff.get(0, -1));
            let bridge = if east == VRAILROAD || east == HBRIDGE || (ROADS..=HROADPOWER).contains(&east) {
                HBRIDGE
            } else if west == VRAILROAD || west == HBRIDGE || (ROADS..=INTERSECTION).contains(&west) {
                HBRIDGE
            } else if south == HRAILROAD
                || south == VROADPOWER
                || (VBRIDGE..=INTERSECTION).contains(&south)
            {
                VBRIDGE
            } else if north == HRAILROAD
                || north == VROADPOWER
                || (VBRIDGE..=INTERSECTION).contains(&north)
            {
                VBRIDGE
            } else {
                return false;
            };
            eff.set(0, 0, bridge);
            BRIDGE_COST
        }
        LHPOWER => {
            eff.set(0, 0, VROADPOWER);
            ROAD_COST
        }
        LVPOWER => {
            eff.set(0, 0, HROADPOWER);
            ROAD_COST
        }
        LHRAIL => {
            eff.set(0, 0, HRAILROAD);
            ROAD_COST
        }
        LVRAIL => {
            eff.set(0, 0, VRAILROAD);
            ROAD_COST
        }
        _ => {
            let Some(extra) = clearing_cost(eff, tile) else {
                return false;
            };
            // a plain road; fix_zone picks the glyph
            eff.set(0, 0, ROADS);
            ROAD_COST + extra
        }
    };
    eff.spend(cost);
    true
}

fn lay_rail(eff: &mut EditBuffer) -> bool {
    let tile = neutralize_road(eff.get(0, 0));
    let cost = match tile {
        RIVER | REDGE | CHANNEL => {
            let east = neutralize_road(eff.get(1, 0));
            let west = neutralize_road(eff.get(-1, 0));
            let south = neutralize_road(eff.get(0, 1));
            let north = neutralize_road(eff.get(0, -1));
            let tunnel = if east == RAILHPOWERV || east == HRAIL || (LHRAIL..=HRAILROAD).contains(&east) {
                HRAIL
            } else if west == RAILHPOWERV || west == HRAIL || (west > VRAIL && west < VRAILROAD) {
                HRAIL
            } else if south == RAILVPOWERH || south == VRAILROAD || (south > HRAIL && south < HRAILROAD) {
                VRAIL
            } else if north == RAILVPOWERH || north == VRAILROAD || (north > HRAIL && north < HRAILROAD) {
                VRAIL
            } else {
                return false;
            };
            eff.set(0, 0, tunnel);
            TUNNEL_COST
        }
        LHPOWER => {
            eff.set(0, 0, RAILVPOWERH);
            RAIL_COST
        }
        LVPOWER => {
            eff.set(0, 0, RAILHPOWERV);
            RAIL_COST
        }
        ROADS => {
            eff.set(0, 0, VRAILROAD);
            RAIL_COST
        }
        ROADS2 => {
            eff.set(0, 0, HRAILROAD);
            RAIL_COST
        }
        _ => {
            let Some(extra) = clearing_cost(eff, tile) else {
                return false;
            };
            eff.set(0, 0, LHRAIL);
            RAIL_COST + extra
        }
    };
    eff.spend(cost);
    true
}

fn lay_wire(eff: &mut EditBuffer) -> bool {
    let tile = neutralize_road(eff.get(0, 0));
    let cost = match tile {
        RIVER | REDGE | CHANNEL => {
            let catalog = eff.catalog;
            // a conductive neighbour that does not already run across this way
            let crosses = |t: u16, blocked: [u16; 3]| {
                catalog.is_conductive(t) && !blocked.contains(&neutralize_road(t))
            };
            let horizontal = [HROADPOWER, RAILHPOWERV, HPOWER];
            let vertical = [VROADPOWER, RAILVPOWERH, VPOWER];
            let wire = if crosses(eff.get(1, 0), horizontal) || crosses(eff.get(-1, 0), horizontal) {
                VPOWER
            } else if crosses(eff.get(0, 1), vertical) || crosses(eff.get(0, -1), vertical) {
                HPOWER
            } else {
                return false;
            };
            eff.set(0, 0, wire);
            UNDERWATER_WIRE_COST
        }
        ROADS => {
            eff.set(0, 0, HROADPOWER);
            WIRE_COST
        }
        ROADS2 => {
            eff.set(0, 0, VROADPOWER);
            WIRE_COST
        }
        LHRAIL => {
            eff.set(0, 0, RAILHPOWERV);
            WIRE_COST
        }
        LVRAIL => {
            eff.set(0, 0, RAILVPOWERH);
            WIRE_COST
        }
        _ => {
            let Some(extra) = clearing_cost(eff, tile) else {
                return false;
            };
            eff.set(0, 0, LHPOWER);
            WIRE_COST + extra
        }
    };
    eff.spend(cost);
    true
}
