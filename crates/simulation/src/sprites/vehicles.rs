use bitcode::{Decode, Encode};

use super::{
    colliding, destroy_tile, explode, explode_slot, get_dir, get_dis, random_destination,
    tile_at_pixel, turn_to, Sprite, SpriteKind, SpriteState,
};
use crate::map_scan::CityScan;
use crate::messages::{CityMessage, Sound};
use crate::sim_rng::SimRng;
use crate::tile_constants::{
    BRWH, BRWV, CHANNEL, LASTRAIL, POWERBASE, RAILBASE, RAILHPOWERV, RAILVPOWERH, RIVER,
};

// ---------------------------------------------------------------------------
// Airplane
// ---------------------------------------------------------------------------

/// Frames 1-8 are headings; 9-11 are the take-off roll.
const PLANE_DX: [i32; 12] = [0, 0, 6, 8, 6, 0, -6, -8, -6, 8, 8, 8];
const PLANE_DY: [i32; 12] = [0, -8, -6, 0, 6, 8, 6, 0, -6, 0, 0, 0];

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Airplane {
    pub dest: (i32, i32),
}

impl Airplane {
    /// Take off from an airport, eastward unless the map edge is too close.
    pub fn sprite(x: i32, y: i32, map_width: i32) -> Sprite {
        let (px, py) = (x * 16 + 8, y * 16 + 8);
        let (dest_x, frame) = if x > map_width - 20 {
            (px - 200, 7)
        } else {
            (px + 200, 11)
        };
        Sprite {
            x: px,
            y: py,
            frame,
            dir: 0,
            state: SpriteState::Airplane(Airplane { dest: (dest_x, py) }),
        }
    }
}

pub(super) fn move_airplane(sprite: &mut Sprite, scan: &mut CityScan, index: usize) {
    let SpriteState::Airplane(mut plane) = sprite.state.clone() else {
        return;
    };
    let mut z = sprite.frame;
    if scan.clock.acycle % 5 == 0 {
        if z > 8 {
            z -= 1;
            if z < 9 {
                z = 3;
            }
        } else {
            let d = get_dir(sprite.x, sprite.y, plane.dest.0, plane.dest.1);
            z = turn_to(z, d);
        }
        sprite.frame = z;
    }

    if get_dis(sprite.x, sprite.y, plane.dest.0, plane.dest.1) < 50 {
        let (w, h) = (scan.width(), scan.height());
        plane.dest = random_destination(&mut scan.rng, w, h);
    }

    if !scan.options.no_disasters {
        let hits = colliding(scan, sprite, index, |k| {
            matches!(k, SpriteKind::Airplane | SpriteKind::Helicopter)
        });
        for &j in &hits {
            explode_slot(scan, j);
        }
        if !hits.is_empty() {
            explode(scan, sprite);
        }
    }

    let z = z as usize;
    sprite.x += PLANE_DX[z];
    sprite.y += PLANE_DY[z];
    sprite.state = SpriteState::Airplane(plane);
}

// ---------------------------------------------------------------------------
// Helicopter
// ---------------------------------------------------------------------------

const COPTER_DX: [i32; 9] = [0, 0, 3, 5, 3, 0, -3, -5, -3];
const COPTER_DY: [i32; 9] = [0, -5, -3, 0, 3, 5, 3, 0, -3];
const COPTER_PATROL: i32 = 1500;
const COPTER_REPORT_FREQ: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Helicopter {
    pub dest: (i32, i32),
    /// The airport it returns to.
    pub origin: (i32, i32),
    /// Patrol ticks left before heading home.
    pub count: i32,
}

impl Helicopter {
    pub fn sprite(x: i32, y: i32, rng: &mut SimRng, map_width: i32, map_height: i32) -> Sprite {
        let (px, py) = (x * 16 + 8, y * 16 + 8);
        let dest = random_destination(rng, map_width, map_height);
        Sprite {
            x: px,
            y: py,
            frame: 5,
            dir: 0,
            state: SpriteState::Helicopter(Helicopter {
                dest,
                origin: (px, py),
                count: COPTER_PATROL,
            }),
        }
    }
}

pub(super) fn move_helicopter(sprite: &mut Sprite, scan: &mut CityScan) {
    let SpriteState::Helicopter(mut copter) = sprite.state.clone() else {
        return;
    };
    if copter.count > 0 {
        copter.count -= 1;
    }
    if copter.count == 0 {
        // chase the monster or tornado, otherwise go home
        let target = scan
            .sprites
            .get(SpriteKind::Monster)
            .or_else(|| scan.sprites.get(SpriteKind::Tornado))
            .map(|s| (s.x, s.y));
        copter.dest = target.unwrap_or(copter.origin);

        if get_dis(sprite.x, sprite.y, copter.origin.0, copter.origin.1) < 30 {
            sprite.frame = 0;
            sprite.state = SpriteState::Helicopter(copter);
            return;
        }
    }

    if scan.clock.acycle % COPTER_REPORT_FREQ == 0 {
        let pos = sprite.tile_pos();
        if scan.density.traffic_at(pos.x, pos.y) > 170 && scan.rng.chance(8) {
            scan.send_message(CityMessage::HeavyTrafficReport, Some(pos));
            scan.make_sound(Sound::HeavyTraffic, pos.x, pos.y);
        }
    }

    let mut z = sprite.frame;
    if scan.clock.acycle % 3 == 0 {
        let d = get_dir(sprite.x, sprite.y, copter.dest.0, copter.dest.1);
        z = turn_to(z, d);
        sprite.frame = z;
    }
    let z = z as usize;
    sprite.x += COPTER_DX[z];
    sprite.y += COPTER_DY[z];
    sprite.state = SpriteState::Helicopter(copter);
}

// ---------------------------------------------------------------------------
// Ship
// ---------------------------------------------------------------------------

const SHIP_TILE_DX: [i32; 9] = [0, 0, 1, 1, 1, 0, -1, -1, -1];
const SHIP_TILE_DY: [i32; 9] = [0, -1, -1, 0, 1, 1, 1, 0, -1];
const SHIP_PIXEL_DX: [i32; 9] = [0, 0, 2, 2, 2, 0, -2, -2, -2];
const SHIP_PIXEL_DY: [i32; 9] = [0, -2, -2, 0, 2, 2, 2, 0, -2];
/// Tiles a ship can sit on without running aground.
const NAVIGABLE: [u16; 8] = [
    RIVER,
    CHANNEL,
    POWERBASE,
    POWERBASE + 1,
    RAILBASE,
    RAILBASE + 1,
    BRWH,
    BRWV,
];
/// `dir` value meaning "no heading to avoid".
const SHIP_NO_DIR: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Ship {
    pub new_dir: i32,
    pub count: i32,
    pub sound_count: i32,
}

impl Ship {
    pub fn sprite(x: i32, y: i32, heading: i32) -> Sprite {
        Sprite {
            x: x * 16 + 8,
            y: y * 16 + 8,
            frame: heading,
            dir: SHIP_NO_DIR,
            state: SpriteState::Ship(Ship {
                new_dir: heading,
                count: 1,
                sound_count: 0,
            }),
        }
    }
}

/// Ships may pass under wires and rail only straight through.
fn ship_try_other(tile: u16, old_dir: i32, new_dir: i32) -> bool {
    let mut z = old_dir + 4;
    if z > 8 {
        z -= 8;
    }
    if new_dir != z {
        return false;
    }
    tile == POWERBASE || tile == POWERBASE + 1 || tile == RAILBASE || tile == RAILBASE + 1
}

pub(super) fn move_ship(sprite: &mut Sprite, scan: &mut CityScan) {
    let SpriteState::Ship(mut ship) = sprite.state.clone() else {
        return;
    };
    let mut t = RIVER;

    ship.sound_count -= 1;
    if ship.sound_count <= 0 {
        if scan.rng.chance(4) {
            let pos = sprite.tile_pos();
            scan.make_sound(Sound::HonkHonkLow, pos.x, pos.y);
        }
        ship.sound_count = 200;
    }

    ship.count -= 1;
    if ship.count <= 0 {
        ship.count = 9;
        if ship.new_dir != sprite.frame {
            sprite.frame = turn_to(sprite.frame, ship.new_dir);
            sprite.state = SpriteState::Ship(ship);
            return;
        }
        let tem = scan.rng.next_int(8);
        let mut found = false;
        for pem in tem..tem + 8 {
            let z = pem % 8 + 1;
            if z == sprite.dir {
                continue;
            }
            let pos = sprite.tile_pos();
            let (xx, yy) = (pos.x + SHIP_TILE_DX[z as usize], pos.y + SHIP_TILE_DY[z as usize]);
            if !scan.map.in_bounds(xx, yy) {
                continue;
            }
            t = scan.tile(xx, yy);
            if t == CHANNEL || t == BRWH || t == BRWV || ship_try_other(t, sprite.dir, z) {
                ship.new_dir = z;
                sprite.frame = turn_to(sprite.frame, z);
                sprite.dir = z + 4;
                if sprite.dir > 8 {
                    sprite.dir -= 8;
                }
                found = true;
                break;
            }
        }
        if !found {
            sprite.dir = SHIP_NO_DIR;
            ship.new_dir = scan.rng.next_int(8) + 1;
        }
    } else {
        let z = sprite.frame;
        if z == ship.new_dir {
            sprite.x += SHIP_PIXEL_DX[z as usize];
            sprite.y += SHIP_PIXEL_DY[z as usize];
        }
    }
    sprite.state = SpriteState::Ship(ship);

    let pos = sprite.tile_pos();
    if !scan.map.in_bounds(pos.x, pos.y) {
        sprite.frame = 0;
        return;
    }
    if !NAVIGABLE.contains(&t) && !scan.options.no_disasters {
        explode(scan, sprite);
        destroy_tile(scan, pos.x, pos.y);
    }
}

// ---------------------------------------------------------------------------
// Train
// ---------------------------------------------------------------------------

const TRAIN_CX: [i32; 4] = [0, 16, 0, -16];
const TRAIN_CY: [i32; 4] = [-16, 0, 16, 0];
const TRAIN_DX: [i32; 5] = [0, 4, 0, -4, 0];
const TRAIN_DY: [i32; 5] = [-4, 0, 4, 0, 0];
const TRAIN_PIC: [i32; 5] = [1, 2, 1, 2, 5];
const FRAME_NW_SE: i32 = 3;
const FRAME_SW_NE: i32 = 4;
const FRAME_UNDERWATER: i32 = 5;
/// Standing still.
pub(super) const TRAIN_DIR_NONE: i32 = 4;

fn is_track(tile: u16) -> bool {
    (RAILBASE..=LASTRAIL).contains(&tile) || tile == RAILVPOWERH || tile == RAILHPOWERV
}

pub(super) fn move_train(sprite: &mut Sprite, scan: &mut CityScan) {
    if sprite.frame == FRAME_NW_SE || sprite.frame == FRAME_SW_NE {
        sprite.frame = TRAIN_PIC[sprite.dir as usize];
    }
    sprite.x += TRAIN_DX[sprite.dir as usize];
    sprite.y += TRAIN_DY[sprite.dir as usize];

    if scan.clock.acycle % 4 != 0 {
        return;
    }
    // snap back onto the rail groove
    sprite.x = sprite.x / 16 * 16 + 8;
    sprite.y = sprite.y / 16 * 16 + 8;

    let d1 = scan.rng.next_int(4);
    for z in d1..d1 + 4 {
        let d2 = z % 4;
        if sprite.dir != TRAIN_DIR_NONE && d2 == (sprite.dir + 2) % 4 {
            continue;
        }
        let Some(c) = tile_at_pixel(
            scan,
            sprite.x + TRAIN_CX[d2 as usize],
            sprite.y + TRAIN_CY[d2 as usize],
        ) else {
            continue;
        };
        if !is_track(c) {
            continue;
        }
        sprite.frame = if sprite.dir != d2 && sprite.dir != TRAIN_DIR_NONE {
            if sprite.dir + d2 == 3 {
                FRAME_NW_SE
            } else {
                FRAME_SW_NE
            }
        } else {
            TRAIN_PIC[d2 as usize]
        };
        if c == RAILBASE || c == RAILBASE + 1 {
            sprite.frame = FRAME_UNDERWATER;
        }
        sprite.dir = d2;
        return;
    }

    if sprite.dir == TRAIN_DIR_NONE {
        // nowhere to go
        sprite.frame = 0;
        return;
    }
    sprite.dir = TRAIN_DIR_NONE;
}
