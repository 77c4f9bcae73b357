//! The `City` facade: one headless Bevy `App` running `SimulationPlugin`,
//! plus the operations collaborators call on it.

use bevy::ecs::system::{RunSystemOnce, SystemState};
use bevy::prelude::*;

use crate::budget::{generate_budget, BudgetNumbers, CityBudget, FundingEffects};
use crate::census::{Census, History};
use crate::clock::{SimClock, ADVANCES_PER_WEEK};
use crate::config::{CityConfig, CityOptions, ConfigError, Difficulty, MAX_SPEED};
use crate::disasters::{self, DisasterState};
use crate::evaluation::CityEvaluation;
use crate::grid::{GridPos, TileMap};
use crate::map_generator::generate_terrain;
use crate::map_scan::CityScan;
use crate::messages::{CityMessage, CityMessageEvent, CityNotification, CitySoundEvent};
use crate::sim_rng::SimRng;
use crate::sprites::Sprites;
use crate::sub_maps::{CoverageMaps, DensityMaps, PowerMap};
use crate::tile_catalog::TileCatalog;
use crate::tools::{execute_tool_strokes, ToolPreview, ToolQueue, ToolResult, ToolResultLog, ToolStroke};
use crate::valves::Valves;
use crate::zones::{query_zone_status, ZoneStatus};
use crate::SimulationPlugin;

/// Insert a fresh copy of every per-city resource sized for `config`,
/// replacing whatever was there. The catalog and event queues are kept.
pub fn reset_city(world: &mut World, config: &CityConfig) {
    let (w, h) = (config.width, config.height);
    let mut rng = SimRng::from_seed_u64(config.seed);
    let mut map = TileMap::new(w, h);
    if config.generate_terrain {
        generate_terrain(&mut map, &mut rng, &config.terrain);
    }
    install(world, config, map, rng);
}

fn install(world: &mut World, config: &CityConfig, map: TileMap, rng: SimRng) {
    let (w, h) = (config.width, config.height);
    world.insert_resource(map);
    world.insert_resource(rng);
    world.insert_resource(SimClock::default());
    world.insert_resource(CityOptions::from_config(config));
    world.insert_resource(Census::new(w, h));
    world.insert_resource(History::default());
    world.insert_resource(Valves::default());
    world.insert_resource(CityBudget::with_funds(config.funds()));
    world.insert_resource(FundingEffects::default());
    world.insert_resource(CityEvaluation::default());
    world.insert_resource(DensityMaps::new(w, h));
    world.insert_resource(CoverageMaps::new(w, h));
    world.insert_resource(PowerMap::new(w, h));
    world.insert_resource(Sprites::default());
    world.insert_resource(DisasterState::default());
    world.insert_resource(ToolQueue::default());
    world.insert_resource(ToolResultLog::default());
    world.insert_resource(config.clone());
}

#[derive(Debug)]
pub struct City {
    app: App,
}

impl City {
    pub fn new(config: CityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut app = App::new();
        app.insert_resource(config);
        app.add_plugins(SimulationPlugin);
        Ok(Self { app })
    }

    /// The default 120×100 city on a bare dirt map.
    pub fn with_seed(seed: u64) -> Self {
        let config = CityConfig {
            seed,
            ..Default::default()
        };
        let mut app = App::new();
        app.insert_resource(config);
        app.add_plugins(SimulationPlugin);
        Self { app }
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    // -----------------------------------------------------------------------
    // Driving the simulation
    // -----------------------------------------------------------------------

    /// One tick: maybe a phase, then sprites and animation.
    pub fn advance(&mut self) {
        self.app.world_mut().run_schedule(FixedUpdate);
    }

    pub fn advance_n(&mut self, n: u32) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Run `n` full sixteen-phase weeks.
    pub fn advance_days(&mut self, n: u32) {
        self.advance_n(n * ADVANCES_PER_WEEK);
    }

    /// Advance until the yearly budget is due with auto-budget off, or
    /// until `max_calls` advances have run. Returns whether it stopped for
    /// the budget.
    pub fn run_until_budget(&mut self, max_calls: u32) -> bool {
        for _ in 0..max_calls {
            self.advance();
            if !self.options().auto_budget && self.clock().is_budget_time() {
                return true;
            }
        }
        false
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn drain_messages(&mut self) -> Vec<CityMessageEvent> {
        self.drain::<CityMessageEvent>()
    }

    pub fn drain_sounds(&mut self) -> Vec<CitySoundEvent> {
        self.drain::<CitySoundEvent>()
    }

    pub fn drain_notifications(&mut self) -> Vec<CityNotification> {
        self.drain::<CityNotification>()
    }

    fn drain<E: Event>(&mut self) -> Vec<E> {
        self.app
            .world_mut()
            .resource_mut::<Events<E>>()
            .drain()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    /// Commit a stroke now and return its result.
    pub fn apply_tool(&mut self, stroke: ToolStroke) -> ToolResult {
        let world = self.app.world_mut();
        world.resource_mut::<ToolQueue>().push(stroke);
        if let Err(e) = world.run_system_once(execute_tool_strokes) {
            warn!("tool executor did not run: {e}");
            return ToolResult::None;
        }
        world
            .resource::<ToolResultLog>()
            .last()
            .map_or(ToolResult::None, |(_, result)| *result)
    }

    pub fn preview(&self, stroke: &ToolStroke) -> ToolPreview {
        stroke.preview(self.map(), self.catalog(), self.options().auto_bulldoze)
    }

    pub fn query_zone_status(&self, x: i32, y: i32) -> Option<ZoneStatus> {
        query_zone_status(
            self.map(),
            self.catalog(),
            self.density(),
            self.coverage(),
            x,
            y,
        )
    }

    // -----------------------------------------------------------------------
    // Disasters
    // -----------------------------------------------------------------------

    fn with_scan<R>(&mut self, f: impl FnOnce(&mut CityScan) -> R) -> R {
        let world = self.app.world_mut();
        let mut state: SystemState<CityScan> = SystemState::new(world);
        let r = {
            let mut scan = state.get_mut(world);
            f(&mut scan)
        };
        state.apply(world);
        r
    }

    pub fn make_fire(&mut self) {
        self.with_scan(disasters::make_fire);
    }

    pub fn make_flood(&mut self) -> Option<GridPos> {
        self.with_scan(disasters::make_flood)
    }

    pub fn make_tornado(&mut self) {
        self.with_scan(disasters::make_tornado);
    }

    pub fn make_earthquake(&mut self) {
        self.with_scan(disasters::make_earthquake);
    }

    pub fn make_monster(&mut self) {
        self.with_scan(disasters::make_monster);
    }

    /// `false` when the city has no nuclear plant.
    pub fn make_meltdown(&mut self) -> bool {
        self.with_scan(|scan| {
            let melted = disasters::make_meltdown(scan);
            if !melted {
                scan.send_message(CityMessage::NoNuclearPlants, None);
            }
            melted
        })
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    fn edit_budget(&mut self, f: impl FnOnce(&mut CityBudget)) {
        let world = self.app.world_mut();
        f(&mut world.resource_mut::<CityBudget>());
        world.send_event(CityNotification::FundsChanged);
    }

    fn edit_options(&mut self, f: impl FnOnce(&mut CityOptions)) {
        let world = self.app.world_mut();
        f(&mut world.resource_mut::<CityOptions>());
        world.send_event(CityNotification::OptionsChanged);
    }

    pub fn set_tax_rate(&mut self, rate: i32) {
        self.edit_budget(|b| b.set_tax_rate(rate));
    }

    pub fn set_road_percent(&mut self, pct: f64) {
        self.edit_budget(|b| b.set_road_percent(pct));
    }

    pub fn set_fire_percent(&mut self, pct: f64) {
        self.edit_budget(|b| b.set_fire_percent(pct));
    }

    pub fn set_police_percent(&mut self, pct: f64) {
        self.edit_budget(|b| b.set_police_percent(pct));
    }

    pub fn set_funds(&mut self, funds: i32) {
        self.edit_budget(|b| b.total_funds = funds);
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.edit_options(|o| o.difficulty = difficulty);
    }

    pub fn set_auto_budget(&mut self, on: bool) {
        self.edit_options(|o| o.auto_budget = on);
    }

    pub fn set_auto_bulldoze(&mut self, on: bool) {
        self.edit_options(|o| o.auto_bulldoze = on);
    }

    pub fn set_auto_go(&mut self, on: bool) {
        self.edit_options(|o| o.auto_go = on);
    }

    pub fn set_no_disasters(&mut self, on: bool) {
        self.edit_options(|o| o.no_disasters = on);
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.edit_options(|o| o.speed = speed.clamp(0, MAX_SPEED));
    }

    /// Throw the city away and start over on freshly generated terrain,
    /// drawing from the current random stream.
    pub fn new_map(&mut self) {
        let world = self.app.world_mut();
        let config = world.resource::<CityConfig>().clone();
        let mut rng = world.resource::<SimRng>().clone();
        let mut map = TileMap::new(config.width, config.height);
        generate_terrain(&mut map, &mut rng, &config.terrain);
        install(world, &config, map, rng);
        info!("new {}x{} map generated", config.width, config.height);
        world.send_event(CityNotification::MapChanged);
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn map(&self) -> &TileMap {
        self.world().resource::<TileMap>()
    }

    pub fn catalog(&self) -> &TileCatalog {
        self.world().resource::<TileCatalog>()
    }

    pub fn clock(&self) -> &SimClock {
        self.world().resource::<SimClock>()
    }

    pub fn options(&self) -> &CityOptions {
        self.world().resource::<CityOptions>()
    }

    pub fn config(&self) -> &CityConfig {
        self.world().resource::<CityConfig>()
    }

    pub fn census(&self) -> &Census {
        self.world().resource::<Census>()
    }

    pub fn history(&self) -> &History {
        self.world().resource::<History>()
    }

    pub fn valves(&self) -> &Valves {
        self.world().resource::<Valves>()
    }

    pub fn budget(&self) -> &CityBudget {
        self.world().resource::<CityBudget>()
    }

    pub fn funding_effects(&self) -> &FundingEffects {
        self.world().resource::<FundingEffects>()
    }

    /// What this year's budget would look like if collected now.
    pub fn budget_numbers(&self) -> BudgetNumbers {
        generate_budget(
            self.budget(),
            self.options().level(),
            self.density().land_value_average,
        )
    }

    pub fn evaluation(&self) -> &CityEvaluation {
        self.world().resource::<CityEvaluation>()
    }

    pub fn density(&self) -> &DensityMaps {
        self.world().resource::<DensityMaps>()
    }

    pub fn coverage(&self) -> &CoverageMaps {
        self.world().resource::<CoverageMaps>()
    }

    pub fn power_map(&self) -> &PowerMap {
        self.world().resource::<PowerMap>()
    }

    pub fn sprites(&self) -> &Sprites {
        self.world().resource::<Sprites>()
    }

    pub fn disaster_state(&self) -> &DisasterState {
        self.world().resource::<DisasterState>()
    }

    /// Check that every map-sized resource agrees with the tile map. Each
    /// `Saveable` decodes on its own, so restored state can disagree with
    /// itself; the scan indexes these buffers without further checks.
    pub fn check_shapes(&self) -> Result<(), String> {
        let map = self.map();
        let (w, h) = (map.width, map.height);
        if !map.is_well_formed() {
            return Err(format!("tile map does not hold {w}x{h} cells"));
        }
        if !self.density().covers(w, h) {
            return Err(format!("density maps do not cover a {w}x{h} map"));
        }
        if !self.coverage().covers(w, h) {
            return Err(format!("coverage maps do not cover a {w}x{h} map"));
        }
        if !self.power_map().covers(w, h) {
            return Err(format!("power map is not {w}x{h}"));
        }
        if !self.history().is_well_formed() {
            return Err("history series have the wrong length".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sound;
    use crate::tile_constants::{DIRT, RESCLR};
    use crate::tools::Tool;

    fn small_city() -> City {
        City::new(CityConfig {
            width: 32,
            height: 32,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_size() {
        let config = CityConfig {
            width: 4,
            ..Default::default()
        };
        assert!(City::new(config).is_err());
    }

    #[test]
    fn test_new_city_has_starting_funds() {
        let city = small_city();
        assert_eq!(city.budget().total_funds, 20000);
        assert_eq!(city.map().width, 32);
        assert_eq!(city.census().total_pop, 0);
    }

    #[test]
    fn test_advance_days_runs_whole_weeks() {
        let mut city = small_city();
        city.advance_days(3);
        assert_eq!(city.clock().city_time, 3);
        assert_eq!(city.clock().acycle, 3 * ADVANCES_PER_WEEK as u16);
    }

    #[test]
    fn test_apply_tool_commits_and_reports() {
        let mut city = small_city();
        let result = city.apply_tool(ToolStroke::new(Tool::Residential, 10, 10));
        assert_eq!(result, ToolResult::Success);
        assert_eq!(city.map().tile(10, 10), RESCLR);
        assert_eq!(city.budget().total_funds, 19900);

        let sounds = city.drain_sounds();
        assert!(sounds.iter().any(|s| s.sound == Sound::Build));
        assert!(city
            .drain_notifications()
            .contains(&CityNotification::FundsChanged));
        // drained
        assert!(city.drain_sounds().is_empty());
    }

    #[test]
    fn test_apply_tool_without_funds() {
        let mut city = small_city();
        city.set_funds(10);
        let result = city.apply_tool(ToolStroke::new(Tool::Airport, 10, 10));
        assert_eq!(result, ToolResult::InsufficientFunds);
        assert_eq!(city.map().tile(10, 10), DIRT);
        let messages = city.drain_messages();
        assert_eq!(messages.last().map(|m| m.message), Some(CityMessage::InsufficientFunds));
    }

    #[test]
    fn test_preview_leaves_map_alone() {
        let city = small_city();
        let preview = city.preview(&ToolStroke::new(Tool::Industrial, 5, 5));
        assert_eq!(preview.cost(), 100);
        assert_eq!(city.map().tile(5, 5), DIRT);
    }

    #[test]
    fn test_meltdown_needs_a_plant() {
        let mut city = small_city();
        assert!(!city.make_meltdown());
        let messages = city.drain_messages();
        assert!(messages
            .iter()
            .any(|m| m.message == CityMessage::NoNuclearPlants));
    }

    #[test]
    fn test_setters_clamp_and_notify() {
        let mut city = small_city();
        city.set_tax_rate(99);
        city.set_road_percent(1.5);
        city.set_speed(12);
        assert_eq!(city.budget().tax_rate, 20);
        assert_eq!(city.budget().road_percent, 1.0);
        assert_eq!(city.options().speed, MAX_SPEED);
        let notes = city.drain_notifications();
        assert!(notes.contains(&CityNotification::FundsChanged));
        assert!(notes.contains(&CityNotification::OptionsChanged));
    }

    #[test]
    fn test_run_until_budget_stops_at_year_end() {
        let mut city = small_city();
        assert!(city.run_until_budget(48 * ADVANCES_PER_WEEK + 64));
        assert!(city.clock().is_budget_time());
        assert_eq!(city.clock().city_time, 48);

        city.set_auto_budget(true);
        assert!(!city.run_until_budget(10));
    }

    #[test]
    fn test_new_map_generates_terrain() {
        let mut city = small_city();
        city.apply_tool(ToolStroke::new(Tool::Residential, 10, 10));
        city.new_map();
        assert_ne!(city.map().tile(10, 10), RESCLR);
        assert_eq!(city.budget().total_funds, 20000);
        assert!(city.map().count(|t| t != DIRT) > 0);
    }

    #[test]
    fn test_check_shapes_catches_mismatched_maps() {
        let mut city = small_city();
        assert_eq!(city.check_shapes(), Ok(()));

        city.world_mut().insert_resource(PowerMap::new(16, 16));
        let err = city.check_shapes().unwrap_err();
        assert!(err.contains("power map"), "got: {err}");

        city.world_mut().insert_resource(PowerMap::new(32, 32));
        city.world_mut().insert_resource(CoverageMaps::new(64, 64));
        assert!(city.check_shapes().is_err());
    }

    #[test]
    fn test_query_zone_status_off_map() {
        let city = small_city();
        assert!(city.query_zone_status(-1, 0).is_none());
        assert!(city.query_zone_status(3, 3).is_some());
    }
}
