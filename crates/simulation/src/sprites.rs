//! Mobile entities: aircraft, ships, trains, the monster, tornadoes and
//! explosions.
//!
//! Positions are in map pixels (16 per tile, `tile * 16 + 8` is a tile
//! centre). A sprite whose frame drops to 0 is invisible and is removed at
//! the end of the move pass.

mod hazards;
mod vehicles;

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::grid::GridPos;
use crate::map_scan::CityScan;
use crate::messages::{CityMessage, CityNotification, Sound};
use crate::sim_rng::SimRng;
use crate::tile_catalog::check_wet;
use crate::tile_constants::{CHANNEL, RIVER, RZB, TINYEXP, TREEBASE};

pub use hazards::{Monster, Tornado, TORNADO_LIFETIME};
pub use vehicles::{Airplane, Helicopter, Ship};

/// Heading used by ships entering from the north edge, and so on.
pub const NORTH_EDGE: i32 = 5;
pub const EAST_EDGE: i32 = 7;
pub const SOUTH_EDGE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    Train,
    Helicopter,
    Airplane,
    Ship,
    Monster,
    Tornado,
    Explosion,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum SpriteState {
    Train,
    Helicopter(Helicopter),
    Airplane(Airplane),
    Ship(Ship),
    Monster(Monster),
    Tornado(Tornado),
    Explosion,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Sprite {
    pub x: i32,
    pub y: i32,
    /// Animation frame; 0 means gone.
    pub frame: i32,
    pub dir: i32,
    pub state: SpriteState,
}

impl Sprite {
    pub fn kind(&self) -> SpriteKind {
        match self.state {
            SpriteState::Train => SpriteKind::Train,
            SpriteState::Helicopter(_) => SpriteKind::Helicopter,
            SpriteState::Airplane(_) => SpriteKind::Airplane,
            SpriteState::Ship(_) => SpriteKind::Ship,
            SpriteState::Monster(_) => SpriteKind::Monster,
            SpriteState::Tornado(_) => SpriteKind::Tornado,
            SpriteState::Explosion => SpriteKind::Explosion,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.frame != 0
    }

    /// The tile under the sprite.
    pub fn tile_pos(&self) -> GridPos {
        GridPos::new(self.x / 16, self.y / 16)
    }

    pub fn train(x: i32, y: i32) -> Self {
        Self {
            x: x * 16 + 8,
            y: y * 16 + 8,
            frame: 1,
            dir: vehicles::TRAIN_DIR_NONE,
            state: SpriteState::Train,
        }
    }

    pub fn explosion(px: i32, py: i32) -> Self {
        Self {
            x: px,
            y: py,
            frame: 1,
            dir: 0,
            state: SpriteState::Explosion,
        }
    }

    /// Advance one animation step. `index` is this sprite's slot in
    /// `scan.sprites`, which still holds the pre-move copy.
    fn step(&mut self, scan: &mut CityScan, index: usize) {
        match self.state {
            SpriteState::Train => vehicles::move_train(self, scan),
            SpriteState::Helicopter(_) => vehicles::move_helicopter(self, scan),
            SpriteState::Airplane(_) => vehicles::move_airplane(self, scan, index),
            SpriteState::Ship(_) => vehicles::move_ship(self, scan),
            SpriteState::Monster(_) => hazards::move_monster(self, scan, index),
            SpriteState::Tornado(_) => hazards::move_tornado(self, scan, index),
            SpriteState::Explosion => hazards::move_explosion(self, scan),
        }
    }
}

// ---------------------------------------------------------------------------
// Sprite list resource
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Sprites {
    list: Vec<Sprite>,
}

impl Sprites {
    pub fn iter(&self) -> impl Iterator<Item = &Sprite> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn push(&mut self, sprite: Sprite) {
        self.list.push(sprite);
    }

    pub fn has(&self, kind: SpriteKind) -> bool {
        self.get(kind).is_some()
    }

    /// First live sprite of a kind.
    pub fn get(&self, kind: SpriteKind) -> Option<&Sprite> {
        self.list.iter().find(|s| s.kind() == kind && s.is_visible())
    }

    pub fn get_mut(&mut self, kind: SpriteKind) -> Option<&mut Sprite> {
        self.list
            .iter_mut()
            .find(|s| s.kind() == kind && s.is_visible())
    }

    pub fn make_explosion_at(&mut self, px: i32, py: i32) {
        self.list.push(Sprite::explosion(px, py));
    }

    /// Point the helicopter, if any, at a tile.
    pub fn redirect_helicopter(&mut self, x: i32, y: i32) {
        if let Some(sprite) = self.get_mut(SpriteKind::Helicopter) {
            if let SpriteState::Helicopter(copter) = &mut sprite.state {
                copter.dest = (x * 16 + 8, y * 16 + 8);
            }
        }
    }

    /// Tile distance from `(x, y)` to the nearest ship; large when there is none.
    pub fn ship_distance(&self, x: i32, y: i32) -> i32 {
        self.list
            .iter()
            .filter(|s| s.kind() == SpriteKind::Ship && s.is_visible())
            .map(|s| get_dis(s.x / 16, s.y / 16, x, y))
            .min()
            .unwrap_or(99_999)
    }
}

impl crate::Saveable for Sprites {
    const SAVE_KEY: &'static str = "sprites";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.list.is_empty() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Heading helpers
// ---------------------------------------------------------------------------

/// Eight-way heading (1 = N, clockwise to 8 = NW) from one point to another.
pub fn get_dir(org_x: i32, org_y: i32, des_x: i32, des_y: i32) -> i32 {
    const GDTAB: [i32; 13] = [0, 3, 2, 1, 3, 4, 5, 7, 6, 5, 7, 8, 1];
    let disp_x = des_x - org_x;
    let disp_y = des_y - org_y;

    let mut z: usize = match (disp_x < 0, disp_y < 0) {
        (true, true) => 11,
        (true, false) => 8,
        (false, true) => 2,
        (false, false) => 5,
    };

    let (ax, ay) = (disp_x.abs(), disp_y.abs());
    if ax * 2 < ay {
        z += 1;
    } else if ay * 2 < ax {
        z -= 1;
    }
    GDTAB[z]
}

/// Manhattan distance.
pub fn get_dis(x0: i32, y0: i32, x1: i32, y1: i32) -> i32 {
    (x0 - x1).abs() + (y0 - y1).abs()
}

/// Rotate heading `p` one eighth toward `d` along the shorter way round.
pub fn turn_to(p: i32, d: i32) -> i32 {
    if p == d {
        return p;
    }
    let mut p = p;
    if p < d {
        if d - p < 4 {
            p += 1;
        } else {
            p -= 1;
        }
    } else if p - d < 4 {
        p -= 1;
    } else {
        p += 1;
    }
    if p > 8 {
        1
    } else if p < 1 {
        8
    } else {
        p
    }
}

/// Tile under a pixel position, or `None` off the map.
fn tile_at_pixel(scan: &CityScan, px: i32, py: i32) -> Option<u16> {
    scan.map.get(px / 16, py / 16).map(|c| c & crate::tile_constants::LOMASK)
}

fn collides(a: &Sprite, b: &Sprite) -> bool {
    a.is_visible() && b.is_visible() && get_dis(a.x, a.y, b.x, b.y) < 30
}

/// Slots of other sprites that `me` touches and whose kind passes `pred`.
fn colliding(
    scan: &CityScan,
    me: &Sprite,
    index: usize,
    pred: impl Fn(SpriteKind) -> bool,
) -> Vec<usize> {
    scan.sprites
        .list
        .iter()
        .enumerate()
        .filter(|&(j, other)| j != index && pred(other.kind()) && collides(me, other))
        .map(|(j, _)| j)
        .collect()
}

fn explode_slot(scan: &mut CityScan, j: usize) {
    let mut other = scan.sprites.list[j].clone();
    explode(scan, &mut other);
    scan.sprites.list[j] = other;
}

/// Blow a sprite up: hide it, leave an explosion, report the crash.
pub fn explode(scan: &mut CityScan, sprite: &mut Sprite) {
    sprite.frame = 0;
    scan.sprites.make_explosion_at(sprite.x, sprite.y);
    let pos = sprite.tile_pos();

    let report = match sprite.kind() {
        SpriteKind::Airplane => Some(CityMessage::PlaneCrash),
        SpriteKind::Ship => Some(CityMessage::Shipwreck),
        SpriteKind::Train => Some(CityMessage::TrainCrash),
        SpriteKind::Helicopter => Some(CityMessage::CopterCrash),
        _ => None,
    };
    if let Some(message) = report {
        scan.send_message(message, Some(pos));
    }
    scan.make_sound(Sound::ExplosionHigh, pos.x, pos.y);
}

/// Wreck whatever stands on a tile.
pub fn destroy_tile(scan: &mut CityScan, x: i32, y: i32) {
    if !scan.map.in_bounds(x, y) {
        return;
    }
    let t = scan.tile(x, y);
    if t < TREEBASE {
        return;
    }
    if scan.catalog.is_bridge(t) {
        scan.map.put(x, y, RIVER);
        return;
    }
    if !scan.catalog.is_combustible(t) {
        return;
    }
    if scan.catalog.is_zone_center(t) {
        scan.kill_zone(x, y, t);
        if t > RZB {
            scan.make_explosion(x, y);
        }
    }
    let replacement = if check_wet(t) { RIVER } else { TINYEXP };
    scan.map.put(x, y, replacement);
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A ship enters from a channel tile on a random edge.
pub fn generate_ship(scan: &mut CityScan) {
    let (w, h) = (scan.width(), scan.height());
    let edge = scan.rng.next_int(4);
    let found = match edge {
        0 => (4..w - 2)
            .find(|&x| scan.tile(x, 0) == CHANNEL)
            .map(|x| (x, 0, NORTH_EDGE)),
        1 => (1..h - 2)
            .find(|&y| scan.tile(0, y) == CHANNEL)
            .map(|y| (0, y, EAST_EDGE)),
        2 => (4..w - 2)
            .find(|&x| scan.tile(x, h - 1) == CHANNEL)
            .map(|x| (x, h - 1, SOUTH_EDGE)),
        _ => (1..h - 2)
            .find(|&y| scan.tile(w - 1, y) == CHANNEL)
            .map(|y| (w - 1, y, EAST_EDGE)),
    };
    if let Some((x, y, heading)) = found {
        if !scan.sprites.has(SpriteKind::Ship) {
            scan.sprites.push(Ship::sprite(x, y, heading));
        }
    }
}

pub fn generate_plane(scan: &mut CityScan, x: i32, y: i32) {
    if !scan.sprites.has(SpriteKind::Airplane) {
        let width = scan.width();
        scan.sprites.push(Airplane::sprite(x, y, width));
    }
}

pub fn generate_copter(scan: &mut CityScan, x: i32, y: i32) {
    if !scan.sprites.has(SpriteKind::Helicopter) {
        let (w, h) = (scan.width(), scan.height());
        let sprite = Helicopter::sprite(x, y, &mut scan.rng, w, h);
        scan.sprites.push(sprite);
    }
}

/// Rail tiles occasionally spawn a train once the city has some people.
pub fn generate_train(scan: &mut CityScan, x: i32, y: i32) {
    if scan.census.total_pop > 20
        && !scan.sprites.has(SpriteKind::Train)
        && scan.rng.chance(26)
    {
        scan.sprites.push(Sprite::train(x, y));
    }
}

/// Random destination anywhere on the map, in pixels.
fn random_destination(rng: &mut SimRng, width: i32, height: i32) -> (i32, i32) {
    let x = rng.next_int(width) * 16 + 8;
    let y = rng.next_int(height) * 16 + 8;
    (x, y)
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Every advance: move each sprite once, then drop the ones that vanished.
/// Sprites spawned during the pass first move on the next advance.
pub(crate) fn move_sprites(mut scan: CityScan) {
    let count = scan.sprites.list.len();
    if count == 0 {
        return;
    }
    for i in 0..count {
        let mut sprite = scan.sprites.list[i].clone();
        if sprite.is_visible() {
            sprite.step(&mut scan, i);
        }
        scan.sprites.list[i] = sprite;
    }
    scan.sprites.list.retain(Sprite::is_visible);
    scan.notify.send(CityNotification::SpriteMoved);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_dir_cardinals() {
        assert_eq!(get_dir(0, 0, 0, -100), 1);
        assert_eq!(get_dir(0, 0, 100, 0), 3);
        assert_eq!(get_dir(0, 0, 0, 100), 5);
        assert_eq!(get_dir(0, 0, -100, 0), 7);
    }

    #[test]
    fn test_get_dir_diagonals() {
        assert_eq!(get_dir(0, 0, 50, -50), 2);
        assert_eq!(get_dir(0, 0, 50, 50), 4);
        assert_eq!(get_dir(0, 0, -50, 50), 6);
        assert_eq!(get_dir(0, 0, -50, -50), 8);
    }

    #[test]
    fn test_turn_to_takes_short_way_and_wraps() {
        assert_eq!(turn_to(3, 3), 3);
        assert_eq!(turn_to(1, 3), 2);
        assert_eq!(turn_to(1, 7), 8);
        assert_eq!(turn_to(8, 2), 1);
        assert_eq!(turn_to(6, 4), 5);
    }

    #[test]
    fn test_get_dis_is_manhattan() {
        assert_eq!(get_dis(0, 0, 3, -4), 7);
    }

    #[test]
    fn test_sprite_list_queries() {
        let mut sprites = Sprites::default();
        assert!(!sprites.has(SpriteKind::Train));
        sprites.push(Sprite::train(3, 4));
        sprites.make_explosion_at(10, 10);
        assert!(sprites.has(SpriteKind::Train));
        assert!(sprites.has(SpriteKind::Explosion));
        let train = sprites.get(SpriteKind::Train).unwrap();
        assert_eq!(train.tile_pos(), GridPos::new(3, 4));
        assert_eq!(sprites.len(), 2);
    }

    #[test]
    fn test_ship_distance_uses_tiles() {
        let mut sprites = Sprites::default();
        assert_eq!(sprites.ship_distance(0, 0), 99_999);
        sprites.push(Ship::sprite(10, 10, SOUTH_EDGE));
        assert_eq!(sprites.ship_distance(12, 13), 5);
    }

    #[test]
    fn test_redirect_helicopter_targets_tile_centre() {
        let mut sprites = Sprites::default();
        let mut rng = SimRng::from_seed_u64(1);
        sprites.push(Helicopter::sprite(5, 5, &mut rng, 64, 64));
        sprites.redirect_helicopter(20, 30);
        let copter = sprites.get(SpriteKind::Helicopter).unwrap();
        let SpriteState::Helicopter(state) = &copter.state else {
            panic!("expected helicopter state");
        };
        assert_eq!(state.dest, (20 * 16 + 8, 30 * 16 + 8));
    }

    #[test]
    fn test_empty_list_is_not_saved() {
        use crate::Saveable;
        assert!(Sprites::default().save_to_bytes().is_none());
    }
}
