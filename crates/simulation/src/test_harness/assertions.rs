//! Assertion helpers for `TestCity` integration tests.

use super::TestCity;

impl TestCity {
    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    /// Assert the tile number at a cell.
    pub fn assert_tile(&self, x: i32, y: i32, expected: u16) {
        let tile = self.tile(x, y);
        assert_eq!(
            tile, expected,
            "Expected tile {expected} at ({x}, {y}), found {tile}"
        );
    }

    /// Assert the tile at a cell lies in an inclusive range.
    pub fn assert_tile_in(&self, x: i32, y: i32, lo: u16, hi: u16) {
        let tile = self.tile(x, y);
        assert!(
            (lo..=hi).contains(&tile),
            "Expected tile in [{lo}, {hi}] at ({x}, {y}), found {tile}"
        );
    }

    pub fn assert_powered(&self, x: i32, y: i32) {
        assert!(
            self.map().is_powered(x, y),
            "Expected ({x}, {y}) to be powered, tile {}",
            self.tile(x, y)
        );
    }

    pub fn assert_unpowered(&self, x: i32, y: i32) {
        assert!(
            !self.map().is_powered(x, y),
            "Expected ({x}, {y}) to be unpowered, tile {}",
            self.tile(x, y)
        );
    }

    /// Assert total funds are above a given amount.
    pub fn assert_funds_above(&self, amount: i32) {
        let funds = self.funds();
        assert!(funds > amount, "Expected funds > {amount}, got {funds}");
    }

    /// Assert total funds are below a given amount.
    pub fn assert_funds_below(&self, amount: i32) {
        let funds = self.funds();
        assert!(funds < amount, "Expected funds < {amount}, got {funds}");
    }

    pub fn assert_funds(&self, expected: i32) {
        let funds = self.funds();
        assert_eq!(funds, expected, "Expected funds {expected}, got {funds}");
    }

    /// Assert the last census population lies in an inclusive range.
    pub fn assert_population_between(&self, min: i32, max: i32) {
        let pop = self.census().population();
        assert!(
            pop >= min && pop <= max,
            "Expected population in [{min}, {max}], got {pop}"
        );
    }

    /// Assert the city time (weeks since founding).
    pub fn assert_city_time(&self, expected: i32) {
        let t = self.clock().city_time;
        assert_eq!(t, expected, "Expected city time {expected}, got {t}");
    }
}
