//! Reduced-resolution overlays derived from the tile grid.
//!
//! Every map covers the whole city at `block`×`block` cells per entry. A
//! cell `(x, y)` falls in entry `(x / block, y / block)`.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH, EIGHTH_BLOCK, HALF_BLOCK, QUARTER_BLOCK};
use crate::grid::GridPos;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BlockMap {
    pub block: usize,
    pub width: usize,
    pub height: usize,
    data: Vec<i32>,
}

impl BlockMap {
    /// A zeroed map covering a `map_width`×`map_height` city.
    pub fn new(block: usize, map_width: usize, map_height: usize) -> Self {
        let width = map_width.div_ceil(block);
        let height = map_height.div_ceil(block);
        Self {
            block,
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Whether this is a `block`-sized map of a `map_width`×`map_height` city.
    pub fn covers(&self, block: usize, map_width: usize, map_height: usize) -> bool {
        self.block == block
            && self.width == map_width.div_ceil(block)
            && self.height == map_height.div_ceil(block)
            && self.data.len() == self.width * self.height
    }

    /// A zeroed map with the same shape as `self`.
    pub fn like(&self) -> Self {
        Self {
            block: self.block,
            width: self.width,
            height: self.height,
            data: vec![0; self.data.len()],
        }
    }

    #[inline]
    fn idx(&self, bx: i32, by: i32) -> Option<usize> {
        (bx >= 0 && by >= 0 && (bx as usize) < self.width && (by as usize) < self.height)
            .then(|| by as usize * self.width + bx as usize)
    }

    /// Entry at block coordinates; 0 outside the map.
    #[inline]
    pub fn get(&self, bx: i32, by: i32) -> i32 {
        self.idx(bx, by).map_or(0, |i| self.data[i])
    }

    #[inline]
    pub fn set(&mut self, bx: i32, by: i32, value: i32) {
        if let Some(i) = self.idx(bx, by) {
            self.data[i] = value;
        }
    }

    #[inline]
    pub fn add(&mut self, bx: i32, by: i32, amount: i32) {
        if let Some(i) = self.idx(bx, by) {
            self.data[i] += amount;
        }
    }

    /// Entry covering a full-resolution cell.
    #[inline]
    pub fn get_world(&self, x: i32, y: i32) -> i32 {
        if x < 0 || y < 0 {
            return 0;
        }
        let b = self.block as i32;
        self.get(x / b, y / b)
    }

    #[inline]
    pub fn set_world(&mut self, x: i32, y: i32, value: i32) {
        if x >= 0 && y >= 0 {
            let b = self.block as i32;
            self.set(x / b, y / b, value);
        }
    }

    #[inline]
    pub fn add_world(&mut self, x: i32, y: i32, amount: i32) {
        if x >= 0 && y >= 0 {
            let b = self.block as i32;
            self.add(x / b, y / b, amount);
        }
    }

    pub fn fill(&mut self, value: i32) {
        self.data.fill(value);
    }

    pub fn values(&self) -> &[i32] {
        &self.data
    }

    /// Apply `f` to every entry in place.
    pub fn map_in_place(&mut self, mut f: impl FnMut(i32) -> i32) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    pub fn copy_from(&mut self, other: &BlockMap) {
        self.data.copy_from_slice(&other.data);
    }

    /// Sum of the four orthogonal neighbours, edges counting as 0.
    fn neighbour_sum(&self, bx: i32, by: i32) -> i32 {
        self.get(bx - 1, by) + self.get(bx + 1, by) + self.get(bx, by - 1) + self.get(bx, by + 1)
    }

    fn kernel(&self, f: impl Fn(i32, i32) -> i32) -> BlockMap {
        let mut out = self.like();
        for by in 0..self.height as i32 {
            for bx in 0..self.width as i32 {
                let v = f(self.get(bx, by), self.neighbour_sum(bx, by));
                out.set(bx, by, v);
            }
        }
        out
    }

    /// (self + neighbours) / 4, capped at 255.
    pub fn smooth_sum(&self) -> BlockMap {
        self.kernel(|c, n| ((c + n) / 4).min(255))
    }

    /// (neighbours / 4 + self) / 2.
    pub fn smooth_fire_police(&self) -> BlockMap {
        self.kernel(|c, n| (n / 4 + c) / 2)
    }

    /// neighbours / 4 + self / 2.
    pub fn smooth_terrain(&self) -> BlockMap {
        self.kernel(|c, n| n / 4 + c / 2)
    }
}

// ---------------------------------------------------------------------------
// Density maps (2x2, plus the 4x4 terrain map)
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DensityMaps {
    /// 0..=250; 0 where nothing is built.
    pub land_value: BlockMap,
    pub pollution: BlockMap,
    pub crime: BlockMap,
    pub population: BlockMap,
    /// 0..=255. Road tiles pick their traffic animation from this.
    pub traffic: BlockMap,
    /// Natural features nearby, 4x4.
    pub terrain: BlockMap,
    pub land_value_average: i32,
    pub pollution_average: i32,
    pub crime_average: i32,
    pub traffic_average: i32,
    pub pollution_max: GridPos,
    pub crime_max: GridPos,
}

impl Default for DensityMaps {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl DensityMaps {
    pub fn new(width: usize, height: usize) -> Self {
        let half = BlockMap::new(HALF_BLOCK, width, height);
        Self {
            land_value: half.clone(),
            pollution: half.clone(),
            crime: half.clone(),
            population: half.clone(),
            traffic: half,
            terrain: BlockMap::new(QUARTER_BLOCK, width, height),
            land_value_average: 0,
            pollution_average: 0,
            crime_average: 0,
            traffic_average: 0,
            pollution_max: GridPos::default(),
            crime_max: GridPos::default(),
        }
    }

    pub fn covers(&self, width: usize, height: usize) -> bool {
        [
            &self.land_value,
            &self.pollution,
            &self.crime,
            &self.population,
            &self.traffic,
        ]
        .iter()
        .all(|m| m.covers(HALF_BLOCK, width, height))
            && self.terrain.covers(QUARTER_BLOCK, width, height)
    }

    /// Land value at a cell; 0 off the map.
    pub fn land_value_at(&self, x: i32, y: i32) -> i32 {
        self.land_value.get_world(x, y)
    }

    pub fn pollution_at(&self, x: i32, y: i32) -> i32 {
        self.pollution.get_world(x, y)
    }

    pub fn crime_at(&self, x: i32, y: i32) -> i32 {
        self.crime.get_world(x, y)
    }

    pub fn population_at(&self, x: i32, y: i32) -> i32 {
        self.population.get_world(x, y)
    }

    pub fn traffic_at(&self, x: i32, y: i32) -> i32 {
        self.traffic.get_world(x, y)
    }

    /// Fade traffic memory toward zero: -34 above 200, -24 above 24, else clear.
    pub fn decay_traffic(&mut self) {
        self.traffic.map_in_place(|z| match z {
            z if z > 200 => z - 34,
            z if z > 24 => z - 24,
            _ => 0,
        });
    }
}

impl crate::Saveable for DensityMaps {
    const SAVE_KEY: &'static str = "density_maps";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Coverage maps (8x8)
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CoverageMaps {
    /// Raw fire-station influence, rebuilt every cycle.
    pub fire_station: BlockMap,
    /// Smoothed fire-station influence read by burning tiles.
    pub fire_rate: BlockMap,
    pub police: BlockMap,
    pub police_effect: BlockMap,
    /// Recent growth (+) or decline (-), clamped to ±200 by decay.
    pub rate_of_growth: BlockMap,
    /// Commercial attractiveness, highest near the centre of mass.
    pub com_rate: BlockMap,
}

impl Default for CoverageMaps {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl CoverageMaps {
    pub fn new(width: usize, height: usize) -> Self {
        let eighth = BlockMap::new(EIGHTH_BLOCK, width, height);
        Self {
            fire_station: eighth.clone(),
            fire_rate: eighth.clone(),
            police: eighth.clone(),
            police_effect: eighth.clone(),
            rate_of_growth: eighth.clone(),
            com_rate: eighth,
        }
    }

    pub fn covers(&self, width: usize, height: usize) -> bool {
        [
            &self.fire_station,
            &self.fire_rate,
            &self.police,
            &self.police_effect,
            &self.rate_of_growth,
            &self.com_rate,
        ]
        .iter()
        .all(|m| m.covers(EIGHTH_BLOCK, width, height))
    }

    pub fn fire_coverage_at(&self, x: i32, y: i32) -> i32 {
        self.fire_rate.get_world(x, y)
    }

    pub fn police_coverage_at(&self, x: i32, y: i32) -> i32 {
        self.police_effect.get_world(x, y)
    }

    /// Move every growth-rate entry one step toward zero, then clamp to ±200.
    pub fn decay_rate_of_growth(&mut self) {
        self.rate_of_growth.map_in_place(|z| match z {
            0 => 0,
            z if z > 0 => {
                if z > 200 {
                    200
                } else {
                    z - 1
                }
            }
            z => {
                if z < -200 {
                    -200
                } else {
                    z + 1
                }
            }
        });
    }
}

impl crate::Saveable for CoverageMaps {
    const SAVE_KEY: &'static str = "coverage_maps";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Power map (full resolution)
// ---------------------------------------------------------------------------

/// Cells reached by the most recent power scan.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PowerMap {
    pub width: usize,
    pub height: usize,
    cells: Vec<bool>,
}

impl Default for PowerMap {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl PowerMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height)
            .then(|| y as usize * self.width + x as usize)
    }

    pub fn covers(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height && self.cells.len() == width * height
    }

    pub fn has_power(&self, x: i32, y: i32) -> bool {
        self.idx(x, y).is_some_and(|i| self.cells[i])
    }

    pub fn set(&mut self, x: i32, y: i32, powered: bool) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = powered;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn powered_count(&self) -> usize {
        self.cells.iter().filter(|&&p| p).count()
    }
}

impl crate::Saveable for PowerMap {
    const SAVE_KEY: &'static str = "power_map";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}
