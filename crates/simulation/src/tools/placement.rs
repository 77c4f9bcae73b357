//! Building footprints, parks and the bulldozer.

use crate::messages::Sound;
use crate::tile_catalog::{can_auto_bulldoze_z, is_rubble};
use crate::tile_constants::{DIRT, FOUNTAIN, RADTILE, RIVER, TINYEXP, WOODS2};

use super::preview::{fix_border, fix_zone, EditBuffer};
use super::{CityRect, ToolResult};

// ---------------------------------------------------------------------------
// Zones and buildings
// ---------------------------------------------------------------------------

/// Place the building whose center is `center` with its top-left member at
/// the origin. Any obstruction that cannot be auto-bulldozed blocks the
/// whole footprint.
pub(super) fn apply_zone(eff: &mut EditBuffer, center: u16, base_cost: i32) {
    let Some(building) = eff.catalog.building(center) else {
        panic!("tile {center} has no building footprint");
    };
    let (width, height) = (building.width as i32, building.height as i32);
    let members = building.members.clone();

    let mut cost = base_cost;
    for row in 0..height {
        for col in 0..width {
            let tile = eff.get(col, row);
            if tile == DIRT {
                continue;
            }
            if eff.auto_bulldoze && can_auto_bulldoze_z(tile) {
                cost += 1;
            } else {
                eff.fail(ToolResult::UhOh);
                return;
            }
        }
    }

    eff.spend(cost);
    for (i, &member) in members.iter().enumerate() {
        let i = i as i32;
        eff.set(i % width, i / width, member);
    }
    fix_border(eff, width, height);
}

pub(super) fn apply_park(eff: &mut EditBuffer, base_cost: i32) {
    let mut cost = base_cost;
    let tile = eff.get(0, 0);
    if tile != DIRT {
        if !(eff.auto_bulldoze && is_rubble(tile)) {
            eff.fail(ToolResult::UhOh);
            return;
        }
        cost += 1;
    }

    let z = eff.roll(5) as u16;
    let park = if z < 4 { WOODS2 + z } else { FOUNTAIN };
    eff.spend(cost);
    eff.set(0, 0, park);
}

// ---------------------------------------------------------------------------
// Bulldozer
// ---------------------------------------------------------------------------

pub(super) fn apply_bulldozer(eff: &mut EditBuffer, b: CityRect) {
    // loose tiles first, so orphaned footprint members go before their zones
    for y in 0..b.height {
        for x in 0..b.width {
            eff.shifted(b.x + x, b.y + y, |eff| {
                if is_dozeable(eff) {
                    doze_field(eff);
                }
            });
        }
    }

    for y in 0..b.height {
        for x in 0..b.width {
            eff.shifted(b.x + x, b.y + y, |eff| {
                if eff.catalog.is_zone_center(eff.get(0, 0)) {
                    doze_zone(eff);
                }
            });
        }
    }
}

/// Bulldozable tiles, and footprint members whose owning center is gone.
fn is_dozeable(eff: &EditBuffer) -> bool {
    let tile = eff.get(0, 0);
    if eff.catalog.is_bulldozable(tile) {
        return true;
    }
    match eff.catalog.owner(tile) {
        Some((owner, (ox, oy))) => eff.get(-ox, -oy) != owner,
        None => false,
    }
}

fn doze_field(eff: &mut EditBuffer) {
    let tile = eff.get(0, 0);
    let cleared = if eff.catalog.is_overwater(tile) {
        RIVER
    } else {
        DIRT
    };
    eff.set(0, 0, cleared);
    fix_zone(eff);
    eff.spend(1);
}

fn doze_zone(eff: &mut EditBuffer) {
    let tile = eff.get(0, 0);
    let Some((width, height)) = eff.catalog.zone_size(tile) else {
        panic!("zone center {tile} has no footprint");
    };
    let (width, height) = (width as i32, height as i32);

    eff.spend(1);
    let area = width * height;
    let sound = if area < 16 {
        Sound::ExplosionHigh
    } else if area < 36 {
        Sound::ExplosionLow
    } else {
        Sound::ExplosionBoth
    };
    eff.sound(0, 0, sound);

    eff.shifted(-1, -1, |eff| put_rubble(eff, width, height));
}

fn put_rubble(eff: &mut EditBuffer, width: i32, height: i32) {
    for y in 0..height {
        for x in 0..width {
            let tile = eff.get(x, y);
            if tile != RADTILE && tile != DIRT {
                let z = eff.roll(3) as u16;
                eff.set(x, y, TINYEXP + z);
            }
        }
    }
    fix_border(eff, width, height);
}
