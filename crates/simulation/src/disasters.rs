//! Random and player-triggered disasters: fires, floods, earthquakes,
//! meltdowns, the monster and tornadoes.
//!
//! Every disaster works on a `CityScan`, so the weekly roll and the manual
//! triggers on `City` share the same code.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::config::DISASTER_CHANCE;
use crate::grid::GridPos;
use crate::map_scan::CityScan;
use crate::messages::{CityMessage, CityNotification, Sound};
use crate::sprites::{Monster, SpriteKind, SpriteState, Tornado, TORNADO_LIFETIME};
use crate::tile_catalog::is_river_edge;
use crate::tile_constants::{DIRT, FIRE, FLOOD, LASTZONE, LOMASK, NUCLEAR, RADTILE, RIVER, RUBBLE};

/// Weeks a fresh flood keeps spreading.
pub const FLOOD_WEEKS: i32 = 30;

/// Monster patience when it is called back to a new pollution peak.
const MONSTER_RECALL_COUNT: i32 = 1000;

const FLOOD_DX: [i32; 4] = [0, 1, 0, -1];
const FLOOD_DY: [i32; 4] = [-1, 0, 1, 0];

// =============================================================================
// State
// =============================================================================

#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct DisasterState {
    /// Weeks of spreading left on the current flood; 0 once it recedes.
    pub flood_count: i32,
}

impl crate::Saveable for DisasterState {
    const SAVE_KEY: &'static str = "disaster_state";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.flood_count == 0 {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// =============================================================================
// Weekly roll
// =============================================================================

/// Phase 15, after fire analysis.
pub(crate) fn do_disasters(mut scan: CityScan) {
    if scan.disaster.flood_count > 0 {
        scan.disaster.flood_count -= 1;
    }
    if scan.options.no_disasters {
        return;
    }
    let odds = DISASTER_CHANCE[scan.options.level()];
    if scan.rng.next_int(odds + 1) != 0 {
        return;
    }

    match scan.rng.next_int(9) {
        0 | 1 => set_fire(&mut scan),
        2 | 3 => {
            make_flood(&mut scan);
        }
        5 => make_tornado(&mut scan),
        6 => make_earthquake(&mut scan),
        7 | 8 => {
            if scan.density.pollution_average > 60 {
                make_monster(&mut scan);
            }
        }
        _ => {}
    }
}

// =============================================================================
// Fire
// =============================================================================

/// Arson: one random tile, which only catches if something is built there.
pub fn set_fire(scan: &mut CityScan) {
    let (x, y) = scan.random_tile();
    if !scan.catalog.is_arsonable(scan.tile(x, y)) {
        return;
    }
    let tile = FIRE + scan.rng.next_int(8) as u16;
    scan.map.put(x, y, tile);
    info!("fire broke out at ({x}, {y})");
    scan.send_message(CityMessage::FireReport, Some(GridPos::new(x, y)));
}

/// Player-requested fire: up to forty tries at finding something built and
/// burnable.
pub fn make_fire(scan: &mut CityScan) {
    for _ in 0..40 {
        let (x, y) = scan.random_tile();
        let t = scan.tile(x, y) & LOMASK;
        if scan.catalog.is_zone_center(t) || !scan.catalog.is_combustible(t) {
            continue;
        }
        if t > 21 && t < LASTZONE {
            let tile = FIRE + scan.rng.next_int(8) as u16;
            scan.map.put(x, y, tile);
            info!("fire started at ({x}, {y})");
            scan.send_message(CityMessage::FireReport, Some(GridPos::new(x, y)));
            return;
        }
    }
}

// =============================================================================
// Nuclear meltdown
// =============================================================================

/// Melt down a random nuclear plant. Returns false when the city has none.
pub fn make_meltdown(scan: &mut CityScan) -> bool {
    let mut candidates = Vec::new();
    for y in 0..scan.height() {
        for x in 0..scan.width() {
            if scan.tile(x, y) == NUCLEAR {
                candidates.push(GridPos::new(x, y));
            }
        }
    }
    if candidates.is_empty() {
        return false;
    }
    let pick = candidates[scan.rng.next_int(candidates.len() as i32) as usize];
    do_meltdown(scan, pick.x, pick.y);
    true
}

/// Blow up the nuclear plant centred on `(x, y)` and scatter fallout.
pub fn do_meltdown(scan: &mut CityScan, x: i32, y: i32) {
    scan.make_explosion(x - 1, y - 1);
    scan.make_explosion(x - 1, y + 2);
    scan.make_explosion(x + 2, y - 1);
    scan.make_explosion(x + 2, y + 2);

    for xx in x - 1..x + 3 {
        for yy in y - 1..y + 3 {
            let tile = FIRE + scan.rng.next_int(4) as u16;
            scan.map.put(xx, yy, tile);
        }
    }

    for _ in 0..200 {
        let xx = x - 20 + scan.rng.next_int(41);
        let yy = y - 15 + scan.rng.next_int(31);
        if !scan.map.in_bounds(xx, yy) {
            continue;
        }
        let t = scan.tile(xx, yy);
        if scan.catalog.is_zone_center(t) {
            continue;
        }
        if scan.catalog.is_combustible(t) || t == DIRT {
            scan.map.put(xx, yy, RADTILE);
        }
    }

    info!("nuclear meltdown at ({x}, {y})");
    scan.send_message(CityMessage::MeltdownReport, Some(GridPos::new(x, y)));
}

// =============================================================================
// Earthquake and flood
// =============================================================================

pub fn make_earthquake(scan: &mut CityScan) {
    let center = scan.census.center_of_mass;
    scan.make_sound(Sound::ExplosionLow, center.x, center.y);
    scan.notify.send(CityNotification::EarthquakeStarted);
    scan.send_message(CityMessage::EarthquakeReport, Some(center));

    let shakes = scan.rng.next_int(701) + 300;
    info!("earthquake near ({}, {}), {shakes} shakes", center.x, center.y);
    for _ in 0..shakes {
        let (x, y) = scan.random_tile();
        if !scan.catalog.is_vulnerable(scan.tile(x, y)) {
            continue;
        }
        let tile = if scan.rng.chance(4) {
            FIRE + scan.rng.next_int(8) as u16
        } else {
            RUBBLE + scan.rng.next_int(4) as u16
        };
        scan.map.put(x, y, tile);
    }
}

/// Start a flood next to a random stretch of river bank. Returns the first
/// flooded tile, or `None` when 300 tries found no floodable bank.
pub fn make_flood(scan: &mut CityScan) -> Option<GridPos> {
    for _ in 0..300 {
        let (x, y) = scan.random_tile();
        if !is_river_edge(scan.tile(x, y)) {
            continue;
        }
        for (dx, dy) in FLOOD_DX.into_iter().zip(FLOOD_DY) {
            let (xx, yy) = (x + dx, y + dy);
            if !scan.map.in_bounds(xx, yy) || !scan.catalog.is_floodable(scan.tile(xx, yy)) {
                continue;
            }
            scan.map.put(xx, yy, FLOOD);
            scan.disaster.flood_count = FLOOD_WEEKS;
            let at = GridPos::new(xx, yy);
            info!("flood started at ({xx}, {yy})");
            scan.send_message(CityMessage::FloodReport, Some(at));
            return Some(at);
        }
    }
    None
}

// =============================================================================
// Monster and tornado
// =============================================================================

/// Send the monster to the worst pollution. An existing monster is called
/// back instead of spawning a second one.
pub fn make_monster(scan: &mut CityScan) {
    let target = scan.density.pollution_max;
    if let Some(sprite) = scan.sprites.get_mut(SpriteKind::Monster) {
        if let SpriteState::Monster(monster) = &mut sprite.state {
            monster.sound_count = 1;
            monster.count = MONSTER_RECALL_COUNT;
            monster.returning = false;
            monster.dest = (target.x * 16 + 8, target.y * 16 + 8);
        }
        return;
    }

    let (w, h) = (scan.width(), scan.height());
    for _ in 0..300 {
        let x = scan.rng.next_int(w - 19) + 10;
        let y = scan.rng.next_int(h - 9) + 5;
        if scan.tile(x, y) == RIVER {
            spawn_monster(scan, x, y, target);
            return;
        }
    }
    spawn_monster(scan, w / 2, h / 2, target);
}

fn spawn_monster(scan: &mut CityScan, x: i32, y: i32, target: GridPos) {
    let (w, h) = (scan.width(), scan.height());
    scan.sprites.push(Monster::sprite(x, y, w, h, target));
    info!("monster sighted at ({x}, {y}) heading for ({}, {})", target.x, target.y);
    scan.send_message(CityMessage::MonsterReport, Some(GridPos::new(x, y)));
}

/// Touch down a tornado somewhere away from the edges, or restart the one
/// already on the map.
pub fn make_tornado(scan: &mut CityScan) {
    if let Some(sprite) = scan.sprites.get_mut(SpriteKind::Tornado) {
        if let SpriteState::Tornado(tornado) = &mut sprite.state {
            tornado.count = TORNADO_LIFETIME;
        }
        return;
    }

    let (w, h) = (scan.width(), scan.height());
    let x = scan.rng.next_int(w - 19) + 10;
    let y = scan.rng.next_int(h - 19) + 10;
    scan.sprites.push(Tornado::sprite(x, y));
    info!("tornado touched down at ({x}, {y})");
    scan.send_message(CityMessage::TornadoReport, Some(GridPos::new(x, y)));
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CityOptions;
    use crate::grid::TileMap;
    use crate::map_scan::test_support::{messages, scan_app, with_scan};
    use crate::sprites::Sprites;
    use crate::tile_catalog::TileCatalog;
    use crate::tile_constants::{HOUSE, REDGE};
    use bevy::ecs::system::RunSystemOnce;

    fn plop_at(map: &mut TileMap, x: i32, y: i32, center: u16) {
        let catalog = TileCatalog::standard();
        let building = catalog.building(center).unwrap();
        for (i, &member) in building.members.iter().enumerate() {
            let (dx, dy) = building.member_offset(i);
            map.set(x + dx, y + dy, member).unwrap();
        }
    }

    fn filled(w: usize, h: usize, tile: u16) -> TileMap {
        let mut map = TileMap::new(w, h);
        map.fill(tile);
        map
    }

    fn is_fire(tile: u16) -> bool {
        (FIRE..FIRE + 8).contains(&tile)
    }

    fn sent(app: &App, message: CityMessage) -> bool {
        messages(app).iter().any(|m| m.message == message)
    }

    #[test]
    fn test_arson_on_built_map_always_catches() {
        let mut app = scan_app(filled(20, 20, HOUSE), 3);
        with_scan(&mut app, set_fire);
        let map = app.world().resource::<TileMap>();
        let fires = map.iter().filter(|&(_, _, c)| is_fire(c & LOMASK)).count();
        assert_eq!(fires, 1);
        assert!(sent(&app, CityMessage::FireReport));
    }

    #[test]
    fn test_arson_on_empty_land_does_nothing() {
        let mut app = scan_app(TileMap::new(20, 20), 3);
        with_scan(&mut app, set_fire);
        assert!(messages(&app).is_empty());
    }

    #[test]
    fn test_manual_fire_finds_a_building() {
        let mut app = scan_app(filled(20, 20, HOUSE), 5);
        with_scan(&mut app, make_fire);
        let map = app.world().resource::<TileMap>();
        assert!(map.iter().any(|(_, _, c)| is_fire(c & LOMASK)));
        assert!(sent(&app, CityMessage::FireReport));
    }

    #[test]
    fn test_meltdown_without_plant() {
        let mut app = scan_app(TileMap::new(32, 32), 1);
        assert!(!with_scan(&mut app, make_meltdown));
        assert!(messages(&app).is_empty());
    }

    #[test]
    fn test_meltdown_burns_plant_and_leaves_fallout() {
        let mut map = TileMap::new(60, 60);
        plop_at(&mut map, 30, 30, NUCLEAR);
        let mut app = scan_app(map, 9);
        assert!(with_scan(&mut app, make_meltdown));

        assert!(sent(&app, CityMessage::MeltdownReport));
        let explosions = app
            .world()
            .resource::<Sprites>()
            .iter()
            .filter(|s| s.kind() == SpriteKind::Explosion)
            .count();
        assert_eq!(explosions, 4);

        let map = app.world().resource::<TileMap>();
        assert_ne!(map.tile(30, 30), NUCLEAR);
        assert!(map.iter().any(|(_, _, c)| c & LOMASK == RADTILE));
        // fallout stays inside the blast box
        for (x, y, c) in map.iter() {
            if c & LOMASK == RADTILE {
                assert!((10..=50).contains(&x) && (15..=45).contains(&y));
            }
        }
    }

    #[test]
    fn test_earthquake_wrecks_buildings() {
        let mut app = scan_app(filled(30, 30, HOUSE), 2);
        with_scan(&mut app, make_earthquake);

        let map = app.world().resource::<TileMap>();
        let houses = map.iter().filter(|&(_, _, c)| c & LOMASK == HOUSE).count();
        assert!(houses < 900);
        let rubble = map
            .iter()
            .filter(|&(_, _, c)| (RUBBLE..RUBBLE + 4).contains(&(c & LOMASK)))
            .count();
        assert!(rubble > 0);
        assert!(sent(&app, CityMessage::EarthquakeReport));

        let events = app.world().resource::<Events<CityNotification>>();
        assert!(events
            .iter_current_update_events()
            .any(|n| *n == CityNotification::EarthquakeStarted));
    }

    #[test]
    fn test_flood_starts_beside_river_bank() {
        // alternate rows of river bank and open land
        let mut map = TileMap::new(16, 16);
        for (x, y) in (0..16).flat_map(|y| (0..16).map(move |x| (x, y))) {
            if y % 2 == 0 {
                map.set(x, y, REDGE).unwrap();
            }
        }
        let mut app = scan_app(map, 4);
        let at = with_scan(&mut app, make_flood).expect("a bank was found");

        assert_eq!(at.y % 2, 1);
        assert_eq!(app.world().resource::<DisasterState>().flood_count, FLOOD_WEEKS);
        let map = app.world().resource::<TileMap>();
        assert_eq!(map.tile(at.x, at.y), FLOOD);
        assert_eq!(map.count(|t| t == FLOOD), 1);
        assert!(sent(&app, CityMessage::FloodReport));
    }

    #[test]
    fn test_flood_needs_a_river() {
        let mut app = scan_app(TileMap::new(16, 16), 4);
        assert_eq!(with_scan(&mut app, make_flood), None);
        assert_eq!(app.world().resource::<DisasterState>().flood_count, 0);
    }

    #[test]
    fn test_monster_spawns_once_then_is_recalled() {
        let mut app = scan_app(TileMap::new(40, 40), 6);
        with_scan(&mut app, make_monster);
        {
            let sprites = app.world().resource::<Sprites>();
            let monster = sprites.get(SpriteKind::Monster).expect("monster spawned");
            // no river, so it appears mid-map
            assert_eq!(monster.tile_pos(), GridPos::new(20, 20));
        }
        assert!(sent(&app, CityMessage::MonsterReport));

        app.world_mut()
            .resource_mut::<crate::sub_maps::DensityMaps>()
            .pollution_max = GridPos::new(3, 4);
        with_scan(&mut app, make_monster);
        let sprites = app.world().resource::<Sprites>();
        let count = sprites.iter().filter(|s| s.kind() == SpriteKind::Monster).count();
        assert_eq!(count, 1);
        let Some(SpriteState::Monster(monster)) =
            sprites.get(SpriteKind::Monster).map(|s| s.state.clone())
        else {
            panic!("monster state");
        };
        assert_eq!(monster.dest, (3 * 16 + 8, 4 * 16 + 8));
        assert_eq!(monster.count, MONSTER_RECALL_COUNT);
        assert_eq!(monster.sound_count, 1);
    }

    #[test]
    fn test_second_tornado_restarts_the_first() {
        let mut app = scan_app(TileMap::new(40, 40), 8);
        with_scan(&mut app, make_tornado);
        if let Some(sprite) = app.world_mut().resource_mut::<Sprites>().get_mut(SpriteKind::Tornado) {
            if let SpriteState::Tornado(t) = &mut sprite.state {
                t.count = 3;
            }
        }
        with_scan(&mut app, make_tornado);

        let sprites = app.world().resource::<Sprites>();
        let tornadoes: Vec<_> = sprites
            .iter()
            .filter(|s| s.kind() == SpriteKind::Tornado)
            .collect();
        assert_eq!(tornadoes.len(), 1);
        let tile = tornadoes[0].tile_pos();
        assert!((10..31).contains(&tile.x) && (10..31).contains(&tile.y));
        assert!(matches!(
            &tornadoes[0].state,
            SpriteState::Tornado(t) if t.count == TORNADO_LIFETIME
        ));
    }

    #[test]
    fn test_weekly_roll_respects_no_disasters() {
        let mut app = scan_app(filled(20, 20, HOUSE), 11);
        app.world_mut().resource_mut::<CityOptions>().no_disasters = true;
        app.world_mut().resource_mut::<DisasterState>().flood_count = 5;
        for _ in 0..500 {
            app.world_mut().run_system_once(do_disasters).unwrap();
        }
        assert_eq!(app.world().resource::<DisasterState>().flood_count, 0);
        assert!(messages(&app).is_empty());
        assert!(app.world().resource::<Sprites>().is_empty());
    }

    #[test]
    fn test_empty_state_is_not_saved() {
        use crate::Saveable;
        assert!(DisasterState::default().save_to_bytes().is_none());
        let state = DisasterState { flood_count: 12 };
        let bytes = state.save_to_bytes().unwrap();
        assert_eq!(DisasterState::load_from_bytes(&bytes).unwrap(), state);
    }
}
