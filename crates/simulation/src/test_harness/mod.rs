//! # TestCity: headless integration test harness
//!
//! Wraps a [`City`] with fluent builders, queries and assertions so
//! scenario tests read as setup, tick, check.

mod assertions;
mod queries;
mod setup;

use crate::config::CityConfig;
use crate::City;

/// Side length of the default test map.
pub const TEST_MAP_SIZE: usize = 64;

/// A headless city for integration testing.
///
/// Use builder methods to lay out the map, then call `tick()` to advance
/// the simulation and query/assert on the resulting state.
pub struct TestCity {
    city: City,
}

impl Default for TestCity {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCity {
    /// Create an **empty** city: a 64x64 dirt map with plenty of money and
    /// random disasters switched off.
    pub fn new() -> Self {
        Self::with_config(Self::base_config(1))
    }

    /// Same empty city with a different random stream.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(Self::base_config(seed))
    }

    /// A city built from an explicit config. Panics on an invalid config.
    pub fn with_config(config: CityConfig) -> Self {
        let city = match City::new(config) {
            Ok(city) => city,
            Err(e) => panic!("invalid test config: {e}"),
        };
        Self { city }
    }

    /// A generated-terrain city of the default size.
    pub fn with_terrain(seed: u64) -> Self {
        Self::with_config(CityConfig {
            generate_terrain: true,
            ..Self::base_config(seed)
        })
    }

    pub fn base_config(seed: u64) -> CityConfig {
        CityConfig {
            width: TEST_MAP_SIZE,
            height: TEST_MAP_SIZE,
            seed,
            starting_funds: Some(100_000),
            no_disasters: true,
            ..Default::default()
        }
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn city_mut(&mut self) -> &mut City {
        &mut self.city
    }

    pub fn into_city(self) -> City {
        self.city
    }
}
