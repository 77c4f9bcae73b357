//! The preview buffer every tool writes into, and its commit step.

use crate::budget::CityBudget;
use crate::grid::{GridPos, TileMap};
use crate::messages::Sound;
use crate::sim_rng::SimRng;
use crate::tile_catalog::{
    is_rail_dynamic, is_road_dynamic, is_wire_dynamic, rail_connects_east, rail_connects_north,
    rail_connects_south, rail_connects_west, road_connects_east, road_connects_north,
    road_connects_south, road_connects_west, TileCatalog,
};
use crate::tile_constants::{CLEAR, DIRT, RAIL_TABLE, ROAD_TABLE, WIRE_TABLE};

use super::{CityRect, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSound {
    pub pos: GridPos,
    pub sound: Sound,
}

/// Pending tile writes, cost and sounds of one stroke. Nothing here touches
/// the live map until `commit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPreview {
    /// Map position of `tiles[0]`.
    min_x: i32,
    min_y: i32,
    width: i32,
    height: i32,
    /// Row-major, `CLEAR` where nothing is written.
    tiles: Vec<u16>,
    sounds: Vec<ToolSound>,
    cost: i32,
    result: ToolResult,
}

impl Default for ToolPreview {
    fn default() -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            width: 0,
            height: 0,
            tiles: Vec::new(),
            sounds: Vec::new(),
            cost: 0,
            result: ToolResult::None,
        }
    }
}

impl ToolPreview {
    /// The written tile at a map position, or `CLEAR`.
    pub fn tile(&self, x: i32, y: i32) -> u16 {
        if self.contains(x, y) {
            self.tiles[self.index(x, y)]
        } else {
            CLEAR
        }
    }

    /// Smallest rectangle holding every write.
    pub fn bounds(&self) -> CityRect {
        CityRect {
            x: self.min_x,
            y: self.min_y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn cost(&self) -> i32 {
        self.cost
    }

    pub fn result(&self) -> ToolResult {
        self.result
    }

    pub fn sounds(&self) -> &[ToolSound] {
        &self.sounds
    }

    /// Every pending write in row-major order.
    pub fn writes(&self) -> impl Iterator<Item = (GridPos, u16)> + '_ {
        self.tiles.iter().enumerate().filter_map(|(i, &t)| {
            if t == CLEAR {
                return None;
            }
            let i = i as i32;
            Some((
                GridPos::new(self.min_x + i % self.width, self.min_y + i / self.width),
                t,
            ))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.writes().next().is_none()
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && y >= self.min_y && x < self.min_x + self.width && y < self.min_y + self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        ((y - self.min_y) * self.width + (x - self.min_x)) as usize
    }

    fn set(&mut self, x: i32, y: i32, tile: u16) {
        if !self.contains(x, y) {
            self.grow_to(x, y);
        }
        let idx = self.index(x, y);
        self.tiles[idx] = tile;
    }

    /// Enlarge the buffer so it covers `(x, y)`, keeping existing writes.
    fn grow_to(&mut self, x: i32, y: i32) {
        if self.width == 0 {
            self.min_x = x;
            self.min_y = y;
            self.width = 1;
            self.height = 1;
            self.tiles = vec![CLEAR];
            return;
        }
        let min_x = self.min_x.min(x);
        let min_y = self.min_y.min(y);
        let max_x = (self.min_x + self.width - 1).max(x);
        let max_y = (self.min_y + self.height - 1).max(y);
        let (width, height) = (max_x - min_x + 1, max_y - min_y + 1);

        let mut tiles = vec![CLEAR; (width * height) as usize];
        for row in 0..self.height {
            for col in 0..self.width {
                let old = (row * self.width + col) as usize;
                let new = ((self.min_y + row - min_y) * width + (self.min_x + col - min_x)) as usize;
                tiles[new] = self.tiles[old];
            }
        }
        self.min_x = min_x;
        self.min_y = min_y;
        self.width = width;
        self.height = height;
        self.tiles = tiles;
    }

    /// Apply the writes and charge the cost, or nothing at all.
    ///
    /// Writes outside the map give `UhOh`, a cost above the available funds
    /// gives `InsufficientFunds`; in both cases the map and funds are left
    /// as they were.
    pub fn commit(&self, map: &mut TileMap, budget: &mut CityBudget) -> ToolResult {
        if self.width > 0 {
            let inside = map.in_bounds(self.min_x, self.min_y)
                && map.in_bounds(self.min_x + self.width - 1, self.min_y + self.height - 1);
            if !inside {
                return ToolResult::UhOh;
            }
        }
        if budget.total_funds < self.cost {
            return ToolResult::InsufficientFunds;
        }

        let mut any = false;
        for (pos, tile) in self.writes() {
            map.put(pos.x, pos.y, tile);
            any = true;
        }
        if any && self.cost != 0 {
            budget.spend(self.cost);
            ToolResult::Success
        } else {
            self.result
        }
    }
}

// ---------------------------------------------------------------------------
// Edit buffer
// ---------------------------------------------------------------------------

/// Read-through view of the map with a movable origin. Reads see pending
/// writes first; all coordinates are relative to `origin`.
pub(crate) struct EditBuffer<'a> {
    map: &'a TileMap,
    pub(crate) catalog: &'a TileCatalog,
    pub(crate) auto_bulldoze: bool,
    /// `None` while previewing: random choices take their first option.
    rng: Option<&'a mut SimRng>,
    origin: (i32, i32),
    preview: ToolPreview,
}

impl<'a> EditBuffer<'a> {
    pub(crate) fn new(
        map: &'a TileMap,
        catalog: &'a TileCatalog,
        auto_bulldoze: bool,
        rng: Option<&'a mut SimRng>,
    ) -> Self {
        Self {
            map,
            catalog,
            auto_bulldoze,
            rng,
            origin: (0, 0),
            preview: ToolPreview::default(),
        }
    }

    /// Tile at an offset from the origin; dirt off the map.
    pub(crate) fn get(&self, dx: i32, dy: i32) -> u16 {
        let (x, y) = (self.origin.0 + dx, self.origin.1 + dy);
        match self.preview.tile(x, y) {
            CLEAR => {
                if self.map.in_bounds(x, y) {
                    self.map.tile(x, y)
                } else {
                    DIRT
                }
            }
            t => t,
        }
    }

    pub(crate) fn set(&mut self, dx: i32, dy: i32, tile: u16) {
        let (x, y) = (self.origin.0 + dx, self.origin.1 + dy);
        self.preview.set(x, y, tile);
    }

    pub(crate) fn sound(&mut self, dx: i32, dy: i32, sound: Sound) {
        let pos = GridPos::new(self.origin.0 + dx, self.origin.1 + dy);
        self.preview.sounds.push(ToolSound { pos, sound });
    }

    pub(crate) fn spend(&mut self, amount: i32) {
        self.preview.cost += amount;
    }

    pub(crate) fn fail(&mut self, result: ToolResult) {
        self.preview.result = result;
    }

    pub(crate) fn in_preview(&self) -> bool {
        self.rng.is_none()
    }

    /// Random draw in `0..bound`, always 0 in a preview.
    pub(crate) fn roll(&mut self, bound: i32) -> i32 {
        self.rng.as_mut().map_or(0, |rng| rng.next_int(bound))
    }

    /// Run `f` with the origin moved by `(dx, dy)`.
    pub(crate) fn shifted<R>(&mut self, dx: i32, dy: i32, f: impl FnOnce(&mut Self) -> R) -> R {
        self.origin.0 += dx;
        self.origin.1 += dy;
        let r = f(self);
        self.origin.0 -= dx;
        self.origin.1 -= dy;
        r
    }

    pub(crate) fn finish(self) -> ToolPreview {
        self.preview
    }
}

// ---------------------------------------------------------------------------
// Connectivity fix-up
// ---------------------------------------------------------------------------

/// Redraw the road, rail or wire glyph at the origin and its four
/// neighbours.
pub(crate) fn fix_zone(eff: &mut EditBuffer) {
    fix_single(eff);
    for (dx, dy) in [(0, -1), (-1, 0), (1, 0), (0, 1)] {
        eff.shifted(dx, dy, fix_single);
    }
}

/// Fix the glyphs along the outline of a `width`×`height` footprint whose
/// top-left cell is the origin.
pub(crate) fn fix_border(eff: &mut EditBuffer, width: i32, height: i32) {
    for x in 0..width {
        eff.shifted(x, 0, fix_zone);
        eff.shifted(x, height - 1, fix_zone);
    }
    for y in 1..height - 1 {
        eff.shifted(0, y, fix_zone);
        eff.shifted(width - 1, y, fix_zone);
    }
}

fn fix_single(eff: &mut EditBuffer) {
    let tile = eff.get(0, 0);
    let (n, e, s, w) = (eff.get(0, -1), eff.get(1, 0), eff.get(0, 1), eff.get(-1, 0));

    // N=1, E=2, S=4, W=8
    let mask = |north: bool, east: bool, south: bool, west: bool| {
        usize::from(north)
            | (usize::from(east) << 1)
            | (usize::from(south) << 2)
            | (usize::from(west) << 3)
    };

    if is_road_dynamic(tile) {
        let m = mask(
            road_connects_south(n),
            road_connects_west(e),
            road_connects_north(s),
            road_connects_east(w),
        );
        eff.set(0, 0, ROAD_TABLE[m]);
    } else if is_rail_dynamic(tile) {
        let m = mask(
            rail_connects_south(n),
            rail_connects_west(e),
            rail_connects_north(s),
            rail_connects_east(w),
        );
        eff.set(0, 0, RAIL_TABLE[m]);
    } else if is_wire_dynamic(tile) {
        let cat = eff.catalog;
        let m = mask(
            cat.wire_connects_south(n),
            cat.wire_connects_west(e),
            cat.wire_connects_north(s),
            cat.wire_connects_east(w),
        );
        eff.set(0, 0, WIRE_TABLE[m]);
    }
}
