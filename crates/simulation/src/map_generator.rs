//! Random terrain for a new city: rivers, lakes, forests and the occasional
//! island.
//!
//! Generation draws from the shared `SimRng`, so a city seed reproduces its
//! terrain exactly.

use serde::{Deserialize, Serialize};

use crate::grid::TileMap;
use crate::sim_rng::SimRng;
use crate::tile_catalog::is_tree;
use crate::tile_constants::{CHANNEL, DIRT, FIRSTRIVEDGE, REDGE, RIVER, WOODS};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IslandMode {
    Never,
    /// One map in ten is an island.
    #[default]
    Seldom,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub island: IslandMode,
    /// Upper bound on the number of lakes; the actual count is random.
    pub max_lakes: i32,
    /// Forest cover as a percentage of the classic amount.
    pub tree_density: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            island: IslandMode::Seldom,
            max_lakes: 10,
            tree_density: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Brushes and lookup tables
// ---------------------------------------------------------------------------

/// 9×9 river brush: 3 is a bank, 2 is water, 4 the navigable channel.
const BIG_RIVER: [[u16; 9]; 9] = [
    [0, 0, 0, 3, 3, 3, 0, 0, 0],
    [0, 0, 3, 2, 2, 2, 3, 0, 0],
    [0, 3, 2, 2, 2, 2, 2, 3, 0],
    [3, 2, 2, 2, 2, 2, 2, 2, 3],
    [3, 2, 2, 2, 4, 2, 2, 2, 3],
    [3, 2, 2, 2, 2, 2, 2, 2, 3],
    [0, 3, 2, 2, 2, 2, 2, 3, 0],
    [0, 0, 3, 2, 2, 2, 3, 0, 0],
    [0, 0, 0, 3, 3, 3, 0, 0, 0],
];

const SMALL_RIVER: [[u16; 6]; 6] = [
    [0, 0, 3, 3, 0, 0],
    [0, 3, 2, 2, 3, 0],
    [3, 2, 2, 2, 2, 3],
    [3, 2, 2, 2, 2, 3],
    [0, 3, 2, 2, 3, 0],
    [0, 0, 3, 3, 0, 0],
];

/// Bank tile by which of the W, S, E, N neighbours are wet.
const RIVER_EDGES: [u16; 16] = [
    FIRSTRIVEDGE + 8,
    FIRSTRIVEDGE + 8,
    FIRSTRIVEDGE + 12,
    FIRSTRIVEDGE + 10,
    FIRSTRIVEDGE,
    RIVER,
    FIRSTRIVEDGE + 14,
    FIRSTRIVEDGE + 12,
    FIRSTRIVEDGE + 4,
    FIRSTRIVEDGE + 6,
    RIVER,
    FIRSTRIVEDGE + 8,
    FIRSTRIVEDGE + 2,
    FIRSTRIVEDGE + 4,
    FIRSTRIVEDGE,
    RIVER,
];

/// Forest edge tile by which of the W, S, E, N neighbours are trees.
const TREE_EDGES: [u16; 16] = [0, 0, 0, 34, 0, 0, 36, 35, 0, 32, 0, 33, 30, 31, 29, 37];

// Eight compass headings, clockwise from north.
const HEADING_DX: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
const HEADING_DY: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

// W, S, E, N
const EDGE_DX: [i32; 4] = [-1, 0, 1, 0];
const EDGE_DY: [i32; 4] = [0, 1, 0, -1];

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Replace the whole map with fresh terrain.
pub fn generate_terrain(map: &mut TileMap, rng: &mut SimRng, config: &TerrainConfig) {
    let mut generator = MapGenerator::new(map, rng, config);
    generator.run();
}

struct MapGenerator<'a> {
    map: &'a mut TileMap,
    rng: &'a mut SimRng,
    config: &'a TerrainConfig,
    /// Brush cursor; brushes are drawn with their top-left corner here.
    x: i32,
    y: i32,
    start: (i32, i32),
    dir: i32,
    last_dir: i32,
}

impl<'a> MapGenerator<'a> {
    fn new(map: &'a mut TileMap, rng: &'a mut SimRng, config: &'a TerrainConfig) -> Self {
        Self {
            map,
            rng,
            config,
            x: 0,
            y: 0,
            start: (0, 0),
            dir: 0,
            last_dir: 0,
        }
    }

    fn width(&self) -> i32 {
        self.map.width as i32
    }

    fn height(&self) -> i32 {
        self.map.height as i32
    }

    fn run(&mut self) {
        if self.config.island == IslandMode::Seldom && self.rng.next_int(100) < 10 {
            self.make_naked_island();
            self.smooth_river();
            self.do_trees();
            return;
        }

        if self.config.island == IslandMode::Always {
            self.make_naked_island();
        } else {
            self.map.fill(DIRT);
        }
        self.random_start();
        self.do_rivers();
        self.make_lakes();
        self.smooth_river();
        self.do_trees();
    }

    /// Open water all round with a ragged coastline five tiles in.
    fn make_naked_island(&mut self) {
        let (w, h) = (self.width(), self.height());
        self.map.fill(RIVER);
        for y in 5..h - 5 {
            for x in 5..w - 5 {
                self.map.put(x, y, DIRT);
            }
        }

        for x in (0..w - 5).step_by(2) {
            self.x = x;
            self.y = self.erand();
            self.big_river_plop();
            self.y = h - 10 - self.erand();
            self.big_river_plop();
            self.y = 0;
            self.small_river_plop();
            self.y = h - 6;
            self.small_river_plop();
        }

        for y in (0..h - 5).step_by(2) {
            self.y = y;
            self.x = self.erand();
            self.big_river_plop();
            self.x = w - 10 - self.erand();
            self.big_river_plop();
            self.x = 0;
            self.small_river_plop();
            self.x = w - 6;
            self.small_river_plop();
        }
    }

    /// Small offsets skewed toward 0.
    fn erand(&mut self) -> i32 {
        let a = self.rng.next_int(19);
        let b = self.rng.next_int(19);
        a.min(b)
    }

    fn random_start(&mut self) {
        let x = 40 + self.rng.next_int(self.width() - 79);
        let y = 33 + self.rng.next_int(self.height() - 66);
        self.start = (x, y);
        (self.x, self.y) = self.start;
    }

    // -----------------------------------------------------------------------
    // Water
    // -----------------------------------------------------------------------

    /// Two big rivers flowing opposite ways from the start, then a small one.
    fn do_rivers(&mut self) {
        self.last_dir = self.rng.next_int(4);
        self.dir = self.last_dir;
        self.river_walk(9);

        (self.x, self.y) = self.start;
        self.last_dir ^= 4;
        self.dir = self.last_dir;
        self.river_walk(9);

        (self.x, self.y) = self.start;
        self.last_dir = self.rng.next_int(4);
        self.river_walk(6);
    }

    /// Paint with a brush of `size` while drifting, until the brush centre
    /// leaves the map.
    fn river_walk(&mut self, size: i32) {
        let reach = size / 2;
        // a walk that never leaves the map stops here
        let max_steps = (self.width() * self.height()).max(1);
        for _ in 0..max_steps {
            if !self.map.in_bounds(self.x + reach, self.y + reach) {
                return;
            }
            if size == 9 {
                self.big_river_plop();
            } else {
                self.small_river_plop();
            }
            if self.rng.next_int(101) < 10 {
                self.dir = self.last_dir;
            } else {
                if self.rng.next_int(201) > 90 {
                    self.dir += 1;
                }
                if self.rng.next_int(201) > 90 {
                    self.dir -= 1;
                }
            }
            self.move_cursor(self.dir);
        }
    }

    fn make_lakes(&mut self) {
        let lakes = self.rng.next_int(self.config.max_lakes.max(0) + 1);
        for _ in 0..lakes {
            let x = self.rng.next_int(self.width() - 20) + 10;
            let y = self.rng.next_int(self.height() - 19) + 10;
            let blobs = self.rng.next_int(13) + 2;
            for _ in 0..blobs {
                self.x = x - 6 + self.rng.next_int(13);
                self.y = y - 6 + self.rng.next_int(13);
                if self.rng.chance(5) {
                    self.big_river_plop();
                } else {
                    self.small_river_plop();
                }
            }
        }
    }

    fn big_river_plop(&mut self) {
        for (dy, row) in BIG_RIVER.iter().enumerate() {
            for (dx, &tile) in row.iter().enumerate() {
                self.put_on_map(tile, dx as i32, dy as i32);
            }
        }
    }

    fn small_river_plop(&mut self) {
        for (dy, row) in SMALL_RIVER.iter().enumerate() {
            for (dx, &tile) in row.iter().enumerate() {
                self.put_on_map(tile, dx as i32, dy as i32);
            }
        }
    }

    /// Brush write: water never turns back into a bank, and only the channel
    /// may be drawn over water. The channel itself is never overwritten.
    fn put_on_map(&mut self, tile: u16, dx: i32, dy: i32) {
        if tile == 0 {
            return;
        }
        let (x, y) = (self.x + dx, self.y + dy);
        if !self.map.in_bounds(x, y) {
            return;
        }
        let existing = self.map.tile(x, y);
        if existing == CHANNEL || (existing == RIVER && tile != CHANNEL) {
            return;
        }
        self.map.put(x, y, tile);
    }

    /// Turn raw banks into the edge tile matching their wet neighbours.
    fn smooth_river(&mut self) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                if self.map.tile(x, y) != REDGE {
                    continue;
                }
                let mut index = 0;
                for (dx, dy) in EDGE_DX.into_iter().zip(EDGE_DY) {
                    index <<= 1;
                    let (xx, yy) = (x + dx, y + dy);
                    if !self.map.in_bounds(xx, yy) {
                        continue;
                    }
                    let t = self.map.tile(xx, yy);
                    if t != DIRT && !is_tree(t) {
                        index |= 1;
                    }
                }
                let mut tile = RIVER_EDGES[index & 15];
                if tile != RIVER && self.rng.next_int(2) != 0 {
                    tile += 1;
                }
                self.map.put(x, y, tile);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Forests
    // -----------------------------------------------------------------------

    fn do_trees(&mut self) {
        let amount = (self.rng.next_int(101) + 50) * self.config.tree_density.max(0) / 100;
        for _ in 0..amount {
            let x = self.rng.next_int(self.width());
            let y = self.rng.next_int(self.height());
            self.tree_splash(x, y);
        }
        self.smooth_trees();
        self.smooth_trees();
    }

    /// Random walk from `(x, y)` planting woods on bare dirt.
    fn tree_splash(&mut self, x: i32, y: i32) {
        let steps = self.rng.next_int(151) + 50;
        (self.x, self.y) = (x, y);
        for _ in 0..steps {
            let dir = self.rng.next_int(8);
            self.move_cursor(dir);
            if !self.map.in_bounds(self.x, self.y) {
                return;
            }
            if self.map.tile(self.x, self.y) == DIRT {
                self.map.put(self.x, self.y, WOODS);
            }
        }
    }

    /// Give forests ragged edges. Lone trees die off.
    fn smooth_trees(&mut self) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                if !is_tree(self.map.tile(x, y)) {
                    continue;
                }
                let mut index = 0;
                for (dx, dy) in EDGE_DX.into_iter().zip(EDGE_DY) {
                    index <<= 1;
                    let (xx, yy) = (x + dx, y + dy);
                    if self.map.in_bounds(xx, yy) && is_tree(self.map.tile(xx, yy)) {
                        index |= 1;
                    }
                }
                let mut tile = TREE_EDGES[index & 15];
                if tile != 0 && tile != WOODS && (x + y) & 1 != 0 {
                    tile -= 8;
                }
                self.map.put(x, y, tile);
            }
        }
    }

    fn move_cursor(&mut self, dir: i32) {
        let d = (dir & 7) as usize;
        self.x += HEADING_DX[d];
        self.y += HEADING_DY[d];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_catalog::is_river_edge;

    fn generate(w: usize, h: usize, seed: u64, config: TerrainConfig) -> TileMap {
        let mut map = TileMap::new(w, h);
        let mut rng = SimRng::from_seed_u64(seed);
        generate_terrain(&mut map, &mut rng, &config);
        map
    }

    fn no_islands() -> TerrainConfig {
        TerrainConfig {
            island: IslandMode::Never,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_terrain() {
        let a = generate(120, 100, 77, TerrainConfig::default());
        let b = generate(120, 100, 77, TerrainConfig::default());
        assert_eq!(a.cells(), b.cells());
    }

    #[test]
    fn test_rivers_and_forests_appear() {
        let map = generate(120, 100, 5, no_islands());
        assert!(map.count(|t| t == RIVER) > 0);
        assert!(map.count(|t| t == CHANNEL) > 0);
        assert!(map.count(is_tree) > 0);
        assert!(map.count(|t| t == DIRT) > 0);
    }

    #[test]
    fn test_no_raw_banks_left() {
        for seed in 0..4 {
            let map = generate(120, 100, seed, TerrainConfig::default());
            assert_eq!(map.count(|t| t == REDGE), 0);
        }
    }

    #[test]
    fn test_island_has_water_border() {
        let config = TerrainConfig {
            island: IslandMode::Always,
            ..Default::default()
        };
        let map = generate(120, 100, 9, config);
        for x in 0..120 {
            let t = map.tile(x, 0);
            assert!(t == RIVER || t == CHANNEL || is_river_edge(t), "tile {t} at ({x}, 0)");
        }
        assert_eq!(map.tile(0, 0), RIVER);
        assert!(map.count(|t| t == DIRT) > 0);
    }

    #[test]
    fn test_zero_tree_density_leaves_no_forest() {
        let config = TerrainConfig {
            island: IslandMode::Never,
            tree_density: 0,
            ..Default::default()
        };
        let map = generate(120, 100, 3, config);
        assert_eq!(map.count(is_tree), 0);
    }

    #[test]
    fn test_small_map_does_not_panic() {
        let map = generate(16, 16, 1, no_islands());
        assert_eq!(map.width, 16);
    }

    #[test]
    fn test_brush_keeps_channel_and_water() {
        let mut map = TileMap::new(20, 20);
        map.set(4, 4, CHANNEL).unwrap();
        map.set(1, 4, RIVER).unwrap();
        let mut rng = SimRng::from_seed_u64(1);
        let config = TerrainConfig::default();
        let mut generator = MapGenerator::new(&mut map, &mut rng, &config);
        generator.x = 0;
        generator.y = 0;
        generator.big_river_plop();
        // centre of the brush is (4, 4), already channel
        assert_eq!(map.tile(4, 4), CHANNEL);
        // a bank cell of the brush does not dry up existing water
        assert_eq!(map.tile(0, 4), REDGE);
        assert_eq!(map.tile(1, 4), RIVER);
        assert_eq!(map.tile(2, 4), RIVER);
    }
}
