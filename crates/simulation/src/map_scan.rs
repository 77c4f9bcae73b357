//! The banded map scan (phases 1-8) and the state every per-tile behaviour
//! needs while it runs.
//!
//! `CityScan` bundles the resources a zone, terrain or sprite behaviour may
//! touch. Systems take it by value; tools and manual disasters build one
//! through `SystemState`.

use bevy::prelude::*;

use crate::budget::FundingEffects;
use crate::census::Census;
use crate::clock::SimClock;
use crate::config::CityOptions;
use crate::disasters::DisasterState;
use crate::grid::{GridPos, TileMap};
use crate::messages::{CityMessage, CityMessageEvent, CityNotification, CitySoundEvent, Sound};
use crate::sim_rng::SimRng;
use crate::sprites::Sprites;
use crate::sub_maps::{CoverageMaps, DensityMaps, PowerMap};
use crate::terrain_dynamics;
use crate::tile_catalog::{TileBehavior, TileCatalog};
use crate::valves::Valves;
use crate::zones;

/// Number of vertical bands the map scan is split into.
pub const SCAN_BANDS: u16 = 8;

#[derive(bevy::ecs::system::SystemParam)]
pub struct CityScan<'w> {
    pub map: ResMut<'w, TileMap>,
    pub catalog: Res<'w, TileCatalog>,
    pub rng: ResMut<'w, SimRng>,
    pub clock: Res<'w, SimClock>,
    pub options: Res<'w, CityOptions>,
    pub census: ResMut<'w, Census>,
    pub valves: Res<'w, Valves>,
    pub effects: Res<'w, FundingEffects>,
    pub density: ResMut<'w, DensityMaps>,
    pub coverage: ResMut<'w, CoverageMaps>,
    pub power: Res<'w, PowerMap>,
    pub sprites: ResMut<'w, Sprites>,
    pub disaster: ResMut<'w, DisasterState>,
    pub messages: EventWriter<'w, CityMessageEvent>,
    pub sounds: EventWriter<'w, CitySoundEvent>,
    pub notify: EventWriter<'w, CityNotification>,
}

impl CityScan<'_> {
    pub fn width(&self) -> i32 {
        self.map.width as i32
    }

    pub fn height(&self) -> i32 {
        self.map.height as i32
    }

    /// A uniformly random cell, x drawn before y.
    pub fn random_tile(&mut self) -> (i32, i32) {
        let (w, h) = (self.width(), self.height());
        let x = self.rng.next_int(w);
        let y = self.rng.next_int(h);
        (x, y)
    }

    #[inline]
    pub fn tile(&self, x: i32, y: i32) -> u16 {
        self.map.tile(x, y)
    }

    pub fn send_message(&mut self, message: CityMessage, location: Option<GridPos>) {
        self.messages.send(CityMessageEvent { message, location });
    }

    pub fn make_sound(&mut self, sound: Sound, x: i32, y: i32) {
        self.sounds.send(CitySoundEvent {
            sound,
            location: GridPos::new(x, y),
        });
    }

    /// Swap every footprint member that has a powered alternate.
    pub fn power_zone(&mut self, x: i32, y: i32, size: (usize, usize)) {
        self.swap_footprint(x, y, size, |catalog, tile| {
            catalog.get(tile).and_then(|t| t.on_power)
        });
    }

    /// Undo `power_zone`: swap members back to their unpowered form.
    pub fn shutdown_zone(&mut self, x: i32, y: i32, size: (usize, usize)) {
        self.swap_footprint(x, y, size, |catalog, tile| {
            catalog.get(tile).and_then(|t| t.on_shutdown)
        });
    }

    fn swap_footprint(
        &mut self,
        x: i32,
        y: i32,
        (width, height): (usize, usize),
        alternate: impl Fn(&TileCatalog, u16) -> Option<u16>,
    ) {
        for dx in 0..width as i32 {
            for dy in 0..height as i32 {
                let (xx, yy) = (x - 1 + dx, y - 1 + dy);
                if !self.map.in_bounds(xx, yy) {
                    continue;
                }
                if let Some(next) = alternate(&self.catalog, self.map.tile(xx, yy)) {
                    self.map.put_keep_power(xx, yy, next);
                }
            }
        }
    }

    /// The zone centre at `(x, y)` is gone: slow growth here and stop its
    /// animations so the leftover members can be bulldozed one by one.
    pub fn kill_zone(&mut self, x: i32, y: i32, center: u16) {
        self.coverage.rate_of_growth.add_world(x, y, -20);
        let size = self.footprint(center);
        self.shutdown_zone(x, y, size);
    }

    /// Footprint of a zone centre. A centre without one means the catalog
    /// is inconsistent, which the scan cannot recover from.
    pub fn footprint(&self, center: u16) -> (usize, usize) {
        let Some(size) = self.catalog.zone_size(center) else {
            panic!("zone centre {center} has no building footprint in the tile catalog");
        };
        size
    }

    /// Spawn an explosion sprite over a tile.
    pub fn make_explosion(&mut self, x: i32, y: i32) {
        self.sprites.make_explosion_at(x * 16 + 8, y * 16 + 8);
    }

    /// Dispatch one tile to its behaviour, if it has one.
    pub fn scan_tile(&mut self, x: i32, y: i32) {
        let tile = self.map.tile(x, y);
        let Some(behavior) = self.catalog.behavior(tile) else {
            return;
        };
        match behavior {
            TileBehavior::Fire => terrain_dynamics::do_fire(self, x, y),
            TileBehavior::Flood => terrain_dynamics::do_flood(self, x, y),
            TileBehavior::Radioactive => terrain_dynamics::do_radioactive(self, x, y),
            TileBehavior::Road => terrain_dynamics::do_road(self, x, y, tile),
            TileBehavior::Rail => terrain_dynamics::do_rail(self, x, y, tile),
            TileBehavior::Explosion => terrain_dynamics::do_explosion(self, x, y),
            zone => zones::do_zone(self, x, y, tile, zone),
        }
    }

    /// Scan columns `x0..x1`, x outer and y inner.
    pub fn scan_columns(&mut self, x0: i32, x1: i32) {
        let height = self.height();
        for x in x0..x1 {
            for y in 0..height {
                self.scan_tile(x, y);
            }
        }
    }
}

/// Column range covered by band `band` (0-based). The last band runs to the
/// right edge so widths that are not a multiple of 8 are fully covered.
pub fn band_columns(width: usize, band: u16) -> (i32, i32) {
    let band_width = (width / SCAN_BANDS as usize) as i32;
    let x0 = band as i32 * band_width;
    let x1 = if band + 1 == SCAN_BANDS {
        width as i32
    } else {
        x0 + band_width
    };
    (x0, x1)
}

/// Phases 1-8: scan one band.
pub(crate) fn scan_band(mut scan: CityScan) {
    let Some(phase) = scan.clock.phase() else {
        return;
    };
    if !(1..=SCAN_BANDS).contains(&phase) {
        return;
    }
    let (x0, x1) = band_columns(scan.map.width, phase - 1);
    scan.scan_columns(x0, x1);
}

// ---------------------------------------------------------------------------
// Tile animation
// ---------------------------------------------------------------------------

/// Every advance: step each animated tile to its successor, keeping power.
pub(crate) fn animate_tiles(mut map: ResMut<TileMap>, catalog: Res<TileCatalog>) {
    let changes: Vec<(i32, i32, u16)> = map
        .iter()
        .filter_map(|(x, y, cell)| {
            catalog
                .get(cell)
                .and_then(|spec| spec.anim_next)
                .map(|next| (x, y, next))
        })
        .collect();
    if changes.is_empty() {
        return;
    }
    for (x, y, next) in changes {
        map.put_keep_power(x, y, next);
    }
}

/// Every advance: report that tiles changed since the last check.
pub(crate) fn notify_map_changed(map: Res<TileMap>, mut notify: EventWriter<CityNotification>) {
    if map.is_changed() {
        notify.send(CityNotification::MapChanged);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_cover_width_exactly() {
        let width = 123;
        let mut next = 0;
        for band in 0..SCAN_BANDS {
            let (x0, x1) = band_columns(width, band);
            assert_eq!(x0, next);
            next = x1;
        }
        assert_eq!(next, width as i32);
    }

    #[test]
    fn test_random_tile_stays_on_map() {
        use super::test_support::{scan_app, with_scan};

        let mut app = scan_app(TileMap::new(24, 17), 9);
        let picks = with_scan(&mut app, |scan| {
            (0..500).map(|_| scan.random_tile()).collect::<Vec<_>>()
        });
        assert!(picks.iter().all(|&(x, y)| (0..24).contains(&x) && (0..17).contains(&y)));
        assert!(picks.iter().any(|&(x, _)| x == 23));
        assert!(picks.iter().any(|&(_, y)| y == 16));
    }

    #[test]
    fn test_band_width_is_an_eighth() {
        assert_eq!(band_columns(120, 0), (0, 15));
        assert_eq!(band_columns(120, 3), (45, 60));
        assert_eq!(band_columns(120, 7), (105, 120));
    }

    #[test]
    fn test_animation_keeps_power() {
        use crate::tile_constants::*;
        let mut app = App::new();
        let mut map = TileMap::new(16, 16);
        map.set(2, 2, FIRE).unwrap();
        map.set_power(2, 2, true).unwrap();
        app.insert_resource(map);
        app.init_resource::<TileCatalog>();
        app.add_systems(Update, animate_tiles);
        app.update();

        let catalog = TileCatalog::standard();
        let map = app.world().resource::<TileMap>();
        let expected = catalog.get(FIRE).and_then(|t| t.anim_next).unwrap();
        assert_eq!(map.tile(2, 2), expected);
        assert!(map.is_powered(2, 2));
    }
}
