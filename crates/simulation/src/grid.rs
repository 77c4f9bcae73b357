use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::tile_constants::{DIRT, LOMASK, PWRBIT};

/// A cell coordinate. Signed so that neighbour arithmetic can step off the map
/// and be rejected by `in_bounds`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Step in one of the four cardinal directions: 0 = N, 1 = E, 2 = S, 3 = W.
    /// Any other value stays in place.
    pub fn step(self, dir: usize) -> Self {
        match dir {
            0 => self.offset(0, -1),
            1 => self.offset(1, 0),
            2 => self.offset(0, 1),
            3 => self.offset(-1, 0),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    OutOfBounds { x: i32, y: i32 },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::OutOfBounds { x, y } => write!(f, "cell ({x}, {y}) is outside the map"),
        }
    }
}

impl std::error::Error for GridError {}

/// The live tile grid. Cells hold a tile number plus `PWRBIT`; every other
/// flag is derived from the catalog on demand.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TileMap {
    cells: Vec<u16>,
    pub width: usize,
    pub height: usize,
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl TileMap {
    /// Whether the cell buffer matches the stated dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.cells.len() == self.width * self.height
    }

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![DIRT; width * height],
            width,
            height,
        }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Raw cell value (tile number with `PWRBIT`).
    pub fn get(&self, x: i32, y: i32) -> Option<u16> {
        self.in_bounds(x, y).then(|| self.cells[self.index(x, y)])
    }

    /// Write a tile number. Any flag bits in `tile` are dropped, including power.
    pub fn set(&mut self, x: i32, y: i32, tile: u16) -> Result<(), GridError> {
        if !self.in_bounds(x, y) {
            return Err(GridError::OutOfBounds { x, y });
        }
        let idx = self.index(x, y);
        self.cells[idx] = tile & LOMASK;
        Ok(())
    }

    /// Write a tile number, keeping its power bit as given.
    pub fn set_raw(&mut self, x: i32, y: i32, cell: u16) -> Result<(), GridError> {
        if !self.in_bounds(x, y) {
            return Err(GridError::OutOfBounds { x, y });
        }
        let idx = self.index(x, y);
        self.cells[idx] = cell & (LOMASK | PWRBIT);
        Ok(())
    }

    pub fn set_power(&mut self, x: i32, y: i32, powered: bool) -> Result<(), GridError> {
        if !self.in_bounds(x, y) {
            return Err(GridError::OutOfBounds { x, y });
        }
        let idx = self.index(x, y);
        if powered {
            self.cells[idx] |= PWRBIT;
        } else {
            self.cells[idx] &= !PWRBIT;
        }
        Ok(())
    }

    pub fn is_powered(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(|c| c & PWRBIT != 0)
    }

    /// Tile number at a cell; dirt off the map.
    #[inline]
    pub fn tile(&self, x: i32, y: i32) -> u16 {
        self.get(x, y).map_or(DIRT, |c| c & LOMASK)
    }

    /// Replace the tile number and clear power. Ignored off the map.
    #[inline]
    pub(crate) fn put(&mut self, x: i32, y: i32, tile: u16) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.cells[idx] = tile & LOMASK;
        }
    }

    /// Replace the tile number, keeping the power bit. Ignored off the map.
    #[inline]
    pub(crate) fn put_keep_power(&mut self, x: i32, y: i32, tile: u16) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.cells[idx] = (self.cells[idx] & PWRBIT) | (tile & LOMASK);
        }
    }

    /// Set or clear the power bit. Ignored off the map.
    #[inline]
    pub(crate) fn mark_power(&mut self, x: i32, y: i32, powered: bool) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            if powered {
                self.cells[idx] |= PWRBIT;
            } else {
                self.cells[idx] &= !PWRBIT;
            }
        }
    }

    /// Replace the whole cell, dropping power unless `cell` carries it.
    #[inline]
    pub(crate) fn put_raw(&mut self, x: i32, y: i32, cell: u16) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.cells[idx] = cell & (LOMASK | PWRBIT);
        }
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    pub fn fill(&mut self, tile: u16) {
        self.cells.fill(tile & LOMASK);
    }

    /// Iterate over `(x, y, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, u16)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &c)| ((i % w) as i32, (i / w) as i32, c))
    }

    /// Count cells whose tile number satisfies `pred`.
    pub fn count(&self, pred: impl Fn(u16) -> bool) -> usize {
        self.cells.iter().filter(|&&c| pred(c & LOMASK)).count()
    }
}

impl crate::Saveable for TileMap {
    const SAVE_KEY: &'static str = "tile_map";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_constants::{RIVER, ROADS};

    #[test]
    fn test_new_map_is_dirt() {
        let map = TileMap::new(20, 16);
        assert_eq!(map.cells().len(), 320);
        assert_eq!(map.count(|t| t == DIRT), 320);
    }

    #[test]
    fn test_short_cell_buffer_is_not_well_formed() {
        use crate::Saveable;
        assert!(TileMap::new(20, 16).is_well_formed());
        let short = TileMap {
            cells: vec![DIRT; 10],
            width: 32,
            height: 32,
        };
        assert!(!short.is_well_formed());
        let decoded = TileMap::load_from_bytes(&short.save_to_bytes().unwrap()).unwrap();
        assert!(!decoded.is_well_formed());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut map = TileMap::new(20, 16);
        assert!(!map.in_bounds(20, 0));
        assert!(!map.in_bounds(0, 16));
        assert!(!map.in_bounds(-1, 3));
        assert_eq!(map.get(-1, 0), None);
        assert_eq!(
            map.set(20, 0, RIVER),
            Err(GridError::OutOfBounds { x: 20, y: 0 })
        );
        assert_eq!(map.tile(99, 99), DIRT);
    }

    #[test]
    fn test_set_clears_power() {
        let mut map = TileMap::new(20, 16);
        map.set(3, 4, ROADS).unwrap();
        map.set_power(3, 4, true).unwrap();
        assert!(map.is_powered(3, 4));
        map.set(3, 4, RIVER | PWRBIT).unwrap();
        assert!(!map.is_powered(3, 4));
        assert_eq!(map.tile(3, 4), RIVER);
    }

    #[test]
    fn test_put_keep_power() {
        let mut map = TileMap::new(20, 16);
        map.set_raw(1, 1, ROADS | PWRBIT).unwrap();
        map.put_keep_power(1, 1, RIVER);
        assert!(map.is_powered(1, 1));
        assert_eq!(map.tile(1, 1), RIVER);
        map.put(1, 1, ROADS);
        assert!(!map.is_powered(1, 1));
    }

    #[test]
    fn test_iter_row_major() {
        let mut map = TileMap::new(4, 3);
        map.set(3, 1, ROADS).unwrap();
        let found: Vec<_> = map.iter().filter(|&(_, _, c)| c == ROADS).collect();
        assert_eq!(found, vec![(3, 1, ROADS)]);
    }

    #[test]
    fn test_step_directions() {
        let p = GridPos::new(5, 5);
        assert_eq!(p.step(0), GridPos::new(5, 4));
        assert_eq!(p.step(1), GridPos::new(6, 5));
        assert_eq!(p.step(2), GridPos::new(5, 6));
        assert_eq!(p.step(3), GridPos::new(4, 5));
        assert_eq!(p.step(4), p);
    }
}
