//! Query and simulation-tick methods for `TestCity`.

use crate::budget::CityBudget;
use crate::census::Census;
use crate::clock::SimClock;
use crate::grid::TileMap;
use crate::messages::{CityMessage, CityMessageEvent, CitySoundEvent, Sound};

use super::TestCity;

impl TestCity {
    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N advances. Each one runs the `FixedUpdate` schedule once.
    pub fn tick(&mut self, n: u32) {
        self.city.advance_n(n);
    }

    /// Run N full sixteen-phase weeks.
    pub fn tick_weeks(&mut self, n: u32) {
        self.city.advance_days(n);
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn map(&self) -> &TileMap {
        self.city.map()
    }

    pub fn clock(&self) -> &SimClock {
        self.city.clock()
    }

    pub fn census(&self) -> &Census {
        self.city.census()
    }

    pub fn budget(&self) -> &CityBudget {
        self.city.budget()
    }

    /// Tile number at a cell, power bit stripped.
    pub fn tile(&self, x: i32, y: i32) -> u16 {
        self.city.map().tile(x, y)
    }

    pub fn funds(&self) -> i32 {
        self.city.budget().total_funds
    }

    pub fn count_tiles(&self, pred: impl Fn(u16) -> bool) -> usize {
        self.city.map().count(pred)
    }

    pub fn powered_cell_count(&self) -> usize {
        self.city
            .map()
            .iter()
            .filter(|&(x, y, _)| self.city.map().is_powered(x, y))
            .count()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn drain_messages(&mut self) -> Vec<CityMessageEvent> {
        self.city.drain_messages()
    }

    pub fn drain_sounds(&mut self) -> Vec<CitySoundEvent> {
        self.city.drain_sounds()
    }

    /// Drain pending messages and report whether `message` was among them.
    pub fn saw_message(&mut self, message: CityMessage) -> bool {
        self.drain_messages().iter().any(|m| m.message == message)
    }

    /// Drain pending sounds and report whether `sound` was among them.
    pub fn heard(&mut self, sound: Sound) -> bool {
        self.drain_sounds().iter().any(|s| s.sound == sound)
    }
}
