use bitcode::{Decode, Encode};

use super::{
    colliding, destroy_tile, explode_slot, get_dir, get_dis, tile_at_pixel, Sprite, SpriteKind,
    SpriteState,
};
use crate::grid::GridPos;
use crate::map_scan::CityScan;
use crate::messages::{CityMessage, Sound};
use crate::tile_constants::{DIRT, FIRE};

/// Vehicles the monster and tornadoes smash on contact.
fn is_vehicle(kind: SpriteKind) -> bool {
    matches!(
        kind,
        SpriteKind::Airplane | SpriteKind::Helicopter | SpriteKind::Ship | SpriteKind::Train
    )
}

fn smash_vehicles(sprite: &Sprite, scan: &mut CityScan, index: usize) {
    for j in colliding(scan, sprite, index, is_vehicle) {
        explode_slot(scan, j);
    }
}

// ---------------------------------------------------------------------------
// Monster
// ---------------------------------------------------------------------------

// Frames 1-3 NE, 4-6 SE, 7-9 SW, 10-12 NW (three walk steps each);
// 13-16 face N, E, S, W while turning.
const MONSTER_DX: [i32; 5] = [2, 2, -2, -2, 0];
const MONSTER_DY: [i32; 5] = [-2, 2, 2, -2, 0];
const TURN_LEFT: [i32; 4] = [0, 1, 2, 3];
const TURN_RIGHT: [i32; 4] = [1, 2, 3, 0];
const LEAVE_TURN_A: [i32; 4] = [2, 5, 8, 11];
const LEAVE_TURN_B: [i32; 4] = [11, 2, 5, 8];

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Monster {
    pub dest: (i32, i32),
    pub origin: (i32, i32),
    pub count: i32,
    pub sound_count: i32,
    /// Heading home after visiting the pollution peak.
    pub returning: bool,
    /// +1 or -1 through the three walk frames.
    pub step: i32,
}

impl Monster {
    pub fn sprite(x: i32, y: i32, map_width: i32, map_height: i32, target: GridPos) -> Sprite {
        let (px, py) = (x * 16 + 8, y * 16 + 8);
        let frame = match (x > map_width / 2, y > map_height / 2) {
            (true, true) => 10,
            (true, false) => 7,
            (false, true) => 1,
            (false, false) => 4,
        };
        Sprite {
            x: px,
            y: py,
            frame,
            dir: 0,
            state: SpriteState::Monster(Monster {
                dest: (target.x * 16 + 8, target.y * 16 + 8),
                origin: (px, py),
                count: 1000,
                sound_count: 0,
                returning: false,
                step: 1,
            }),
        }
    }
}

pub(super) fn move_monster(sprite: &mut Sprite, scan: &mut CityScan, index: usize) {
    let SpriteState::Monster(mut monster) = sprite.state.clone() else {
        return;
    };
    if monster.sound_count > 0 {
        monster.sound_count -= 1;
    }

    let mut d = (sprite.frame - 1) / 3;
    let mut z = (sprite.frame - 1) % 3;

    if d < 4 {
        if z == 2 {
            monster.step = -1;
        }
        if z == 0 {
            monster.step = 1;
        }
        z += monster.step;

        if get_dis(sprite.x, sprite.y, monster.dest.0, monster.dest.1) < 60 {
            if monster.returning {
                sprite.frame = 0;
                sprite.state = SpriteState::Monster(monster);
                return;
            }
            monster.returning = true;
            monster.dest = monster.origin;
        }

        let heading = (get_dir(sprite.x, sprite.y, monster.dest.0, monster.dest.1) - 1) / 2;
        if heading != d && scan.rng.chance(11) {
            z = if scan.rng.chance(2) {
                TURN_LEFT[d as usize]
            } else {
                TURN_RIGHT[d as usize]
            };
            d = 4;
            if monster.sound_count == 0 {
                let pos = sprite.tile_pos();
                scan.make_sound(Sound::Monster, pos.x, pos.y);
                monster.sound_count = 50 + scan.rng.next_int(101);
            }
        }
    } else {
        let facing = ((sprite.frame - 13) % 4) as usize;
        if scan.rng.chance(4) {
            let new_frame = if scan.rng.chance(2) {
                LEAVE_TURN_A[facing]
            } else {
                LEAVE_TURN_B[facing]
            };
            d = (new_frame - 1) / 3;
            z = (new_frame - 1) % 3;
        } else {
            d = 4;
        }
    }

    sprite.frame = d * 3 + z + 1;
    sprite.x += MONSTER_DX[d as usize];
    sprite.y += MONSTER_DY[d as usize];

    if monster.count > 0 {
        monster.count -= 1;
    }
    sprite.state = SpriteState::Monster(monster);

    if tile_at_pixel(scan, sprite.x, sprite.y).is_none() {
        sprite.frame = 0;
    }
    smash_vehicles(sprite, scan, index);
    let pos = sprite.tile_pos();
    destroy_tile(scan, pos.x, pos.y);
}

// ---------------------------------------------------------------------------
// Tornado
// ---------------------------------------------------------------------------

const TORNADO_DX: [i32; 6] = [2, 3, 2, 0, -2, -3];
const TORNADO_DY: [i32; 6] = [-2, 0, 2, 3, 2, 0];
pub const TORNADO_LIFETIME: i32 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Tornado {
    pub count: i32,
    /// Which way the 1-2-3-2 frame cycle is going.
    pub rising: bool,
}

impl Tornado {
    pub fn sprite(x: i32, y: i32) -> Sprite {
        Sprite {
            x: x * 16 + 8,
            y: y * 16 + 8,
            frame: 1,
            dir: 0,
            state: SpriteState::Tornado(Tornado {
                count: TORNADO_LIFETIME,
                rising: false,
            }),
        }
    }
}

pub(super) fn move_tornado(sprite: &mut Sprite, scan: &mut CityScan, index: usize) {
    let SpriteState::Tornado(mut tornado) = sprite.state.clone() else {
        return;
    };
    let z = if sprite.frame == 2 {
        if tornado.rising {
            3
        } else {
            1
        }
    } else {
        tornado.rising = sprite.frame == 1;
        2
    };
    if tornado.count > 0 {
        tornado.count -= 1;
    }
    sprite.frame = z;
    let count = tornado.count;
    sprite.state = SpriteState::Tornado(tornado);

    smash_vehicles(sprite, scan, index);

    let zz = scan.rng.next_int(TORNADO_DX.len() as i32) as usize;
    sprite.x += TORNADO_DX[zz];
    sprite.y += TORNADO_DY[zz];

    let pos = sprite.tile_pos();
    if !scan.map.in_bounds(pos.x, pos.y) {
        sprite.frame = 0;
        return;
    }
    if count == 0 && scan.rng.chance(501) {
        sprite.frame = 0;
        return;
    }
    destroy_tile(scan, pos.x, pos.y);
}

// ---------------------------------------------------------------------------
// Explosion
// ---------------------------------------------------------------------------

pub(super) fn move_explosion(sprite: &mut Sprite, scan: &mut CityScan) {
    let pos = sprite.tile_pos();
    if scan.clock.acycle % 2 == 0 {
        if sprite.frame == 1 {
            scan.make_sound(Sound::ExplosionHigh, pos.x, pos.y);
            scan.send_message(CityMessage::ExplosionReport, Some(pos));
        }
        sprite.frame += 1;
    }

    if sprite.frame > 6 {
        sprite.frame = 0;
        for (dx, dy) in [(0, 0), (-1, -1), (1, -1), (-1, 1), (1, 1)] {
            start_fire(scan, pos.x + dx, pos.y + dy);
        }
    }
}

fn start_fire(scan: &mut CityScan, x: i32, y: i32) {
    if !scan.map.in_bounds(x, y) {
        return;
    }
    let t = scan.tile(x, y);
    if !scan.catalog.is_combustible(t) && t != DIRT {
        return;
    }
    if scan.catalog.is_zone_center(t) {
        return;
    }
    let flame = FIRE + scan.rng.next_int(4) as u16;
    scan.map.put(x, y, flame);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monster_faces_by_quadrant() {
        let target = GridPos::new(0, 0);
        assert_eq!(Monster::sprite(100, 90, 120, 100, target).frame, 10);
        assert_eq!(Monster::sprite(100, 10, 120, 100, target).frame, 7);
        assert_eq!(Monster::sprite(10, 90, 120, 100, target).frame, 1);
        assert_eq!(Monster::sprite(10, 10, 120, 100, target).frame, 4);
    }

    #[test]
    fn test_monster_heads_for_pollution_peak() {
        let sprite = Monster::sprite(10, 10, 120, 100, GridPos::new(40, 50));
        let SpriteState::Monster(monster) = &sprite.state else {
            panic!("expected monster");
        };
        assert_eq!(monster.dest, (40 * 16 + 8, 50 * 16 + 8));
        assert_eq!(monster.origin, (168, 168));
        assert!(!monster.returning);
    }

    #[test]
    fn test_tornado_starts_with_full_lifetime() {
        let sprite = Tornado::sprite(20, 20);
        assert_eq!(sprite.frame, 1);
        let SpriteState::Tornado(tornado) = &sprite.state else {
            panic!("expected tornado");
        };
        assert_eq!(tornado.count, TORNADO_LIFETIME);
    }

    #[test]
    fn test_vehicle_kinds() {
        assert!(is_vehicle(SpriteKind::Ship));
        assert!(!is_vehicle(SpriteKind::Explosion));
        assert!(!is_vehicle(SpriteKind::Monster));
    }
}
