use bevy::ecs::schedule::ExecutorKind;
use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod advisors;
pub mod budget;
pub mod census;
pub mod city;
pub mod clock;
pub mod config;
pub mod disasters;
pub mod evaluation;
pub mod grid;
pub mod map_generator;
pub mod map_scan;
pub mod messages;
pub mod power;
pub mod scans;
pub mod sim_rng;
pub mod simulation_sets;
pub mod sprites;
pub mod sub_maps;
pub mod terrain_dynamics;
pub mod tile_catalog;
pub mod tile_constants;
pub mod tools;
pub mod traffic;
pub mod valves;
pub mod zones;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

#[cfg(test)]
mod integration_tests;

pub use city::City;
pub use simulation_sets::SimulationSet;

use clock::{in_phase, stepped};
use config::CityConfig;
use tile_catalog::TileCatalog;

// ---------------------------------------------------------------------------
// Saveable trait + registry
// ---------------------------------------------------------------------------

/// A resource that persists with the city.
///
/// The save crate walks the [`SaveableRegistry`] instead of knowing each
/// type; a resource joins the save file by calling
/// `app.register_saveable::<T>()`.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique key for this resource in the save file. Must be stable
    /// across versions.
    const SAVE_KEY: &'static str;

    /// Serialize this resource. `None` skips it (e.g. default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize a resource written by `save_to_bytes`.
    fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error>;
}

/// A registered resource whose bytes did not decode.
#[derive(Debug)]
pub struct DecodeError {
    pub key: String,
    pub source: bitcode::Error,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to decode '{}': {}", self.key, self.source)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) -> Result<(), bitcode::Error> + Send + Sync>;
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for a single registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Registry of all saveable resources, populated during plugin setup.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements `Saveable`.
    ///
    /// Panics in debug builds if a resource with the same `SAVE_KEY` is already
    /// registered.
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!(
                "SaveableRegistry: duplicate key '{}', ignoring second registration",
                key
            );
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                let value = T::load_from_bytes(bytes)?;
                world.insert_resource(value);
                Ok(())
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Save all registered resources into a key → bytes map.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut sections = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                sections.insert(entry.key.clone(), bytes);
            }
        }
        sections
    }

    /// Load registered resources from a key → bytes map. Absent keys are
    /// reset to their defaults. Stops at the first section that fails to
    /// decode; callers load into a scratch world and discard it on error.
    pub fn load_all(
        &self,
        world: &mut World,
        sections: &BTreeMap<String, Vec<u8>>,
    ) -> Result<(), DecodeError> {
        for entry in &self.entries {
            match sections.get(&entry.key) {
                Some(bytes) => {
                    (entry.load_fn)(world, bytes).map_err(|source| DecodeError {
                        key: entry.key.clone(),
                        source,
                    })?
                }
                None => (entry.reset_fn)(world),
            }
        }
        Ok(())
    }

    /// Reset all registered resources to their defaults.
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

/// One-line saveable registration on `App`.
pub trait SaveableAppExt {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self;
}

impl SaveableAppExt for App {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self {
        self.init_resource::<SaveableRegistry>();
        self.world_mut()
            .resource_mut::<SaveableRegistry>()
            .register::<T>();
        self
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// The whole simulation core. Reads `CityConfig` from the world if one was
/// inserted before the plugin, otherwise starts from the default config.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<CityConfig>()
            .cloned()
            .unwrap_or_default();

        app.add_plugins((messages::MessagesPlugin, tools::ToolsPlugin))
            .init_resource::<TileCatalog>();
        city::reset_city(app.world_mut(), &config);

        app.register_saveable::<grid::TileMap>()
            .register_saveable::<sim_rng::SimRng>()
            .register_saveable::<clock::SimClock>()
            .register_saveable::<config::CityOptions>()
            .register_saveable::<census::Census>()
            .register_saveable::<census::History>()
            .register_saveable::<valves::Valves>()
            .register_saveable::<budget::CityBudget>()
            .register_saveable::<budget::FundingEffects>()
            .register_saveable::<evaluation::CityEvaluation>()
            .register_saveable::<sub_maps::DensityMaps>()
            .register_saveable::<sub_maps::CoverageMaps>()
            .register_saveable::<sub_maps::PowerMap>()
            .register_saveable::<sprites::Sprites>()
            .register_saveable::<disasters::DisasterState>();

        // phases share one random stream, so their order must not vary
        app.edit_schedule(FixedUpdate, |schedule| {
            schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        });

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            clock::tick_clock
                .in_set(SimulationSet::PreSim)
                .after(tools::execute_tool_strokes),
        );

        app.add_systems(
            FixedUpdate,
            (
                (
                    scans::begin_week,
                    valves::update_valves,
                    scans::reset_census,
                )
                    .chain()
                    .run_if(in_phase(0)),
                map_scan::scan_band.run_if(stepped),
                scans::census_and_taxes.run_if(in_phase(9)),
                (scans::decay_memories, advisors::do_messages)
                    .chain()
                    .run_if(in_phase(10)),
                power::power_scan_system.run_if(in_phase(11)),
                scans::pollution_scan_system.run_if(in_phase(12)),
                scans::crime_scan_system.run_if(in_phase(13)),
                scans::population_density_system.run_if(in_phase(14)),
                (scans::fire_analysis_system, disasters::do_disasters)
                    .chain()
                    .run_if(in_phase(15)),
            )
                .chain()
                .in_set(SimulationSet::Simulation),
        );

        app.add_systems(
            FixedUpdate,
            (
                sprites::move_sprites,
                map_scan::animate_tiles,
                map_scan::notify_map_changed,
                (
                    messages::trim_pending::<messages::CityMessageEvent>,
                    messages::trim_pending::<messages::CitySoundEvent>,
                    messages::trim_pending::<messages::CityNotification>,
                ),
            )
                .chain()
                .in_set(SimulationSet::PostSim),
        );
    }
}

#[cfg(test)]
mod saveable_tests {
    use super::*;

    /// A trivial resource implementing `Saveable` for testing.
    #[derive(Resource, Default, Debug, PartialEq)]
    struct TestCounter {
        value: u32,
    }

    impl Saveable for TestCounter {
        const SAVE_KEY: &'static str = "test_counter";

        fn save_to_bytes(&self) -> Option<Vec<u8>> {
            if self.value == 0 {
                None
            } else {
                Some(bitcode::encode(&self.value))
            }
        }

        fn load_from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
            Ok(TestCounter {
                value: bitcode::decode(bytes)?,
            })
        }
    }

    #[test]
    fn test_registry_register_and_save() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 42 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let sections = registry.save_all(&world);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["test_counter"], bitcode::encode(&42u32));
    }

    #[test]
    fn test_registry_save_skips_default() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 0 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        assert!(registry.save_all(&world).is_empty());
    }

    #[test]
    fn test_registry_load_all() {
        let mut world = World::new();
        world.insert_resource(TestCounter::default());

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let mut sections = BTreeMap::new();
        sections.insert("test_counter".to_string(), bitcode::encode(&99u32));
        registry.load_all(&mut world, &sections).unwrap();

        assert_eq!(world.resource::<TestCounter>().value, 99);
    }

    #[test]
    fn test_registry_load_resets_missing_keys() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 5 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let mut sections = BTreeMap::new();
        sections.insert("unknown_feature".to_string(), vec![0xFF, 0xFF]);
        registry.load_all(&mut world, &sections).unwrap();

        assert_eq!(world.resource::<TestCounter>().value, 0);
    }

    #[test]
    fn test_registry_load_reports_bad_bytes() {
        let mut world = World::new();
        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();

        let mut sections = BTreeMap::new();
        sections.insert("test_counter".to_string(), vec![0xFF]);
        let err = registry.load_all(&mut world, &sections).unwrap_err();
        assert_eq!(err.key, "test_counter");
    }

    #[test]
    fn test_registry_reset_all() {
        let mut world = World::new();
        world.insert_resource(TestCounter { value: 999 });

        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();
        registry.reset_all(&mut world);

        assert_eq!(world.resource::<TestCounter>().value, 0);
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn test_registry_duplicate_key_panics_in_debug() {
        let mut registry = SaveableRegistry::default();
        registry.register::<TestCounter>();
        registry.register::<TestCounter>();
    }

    #[test]
    fn test_plugin_registers_city_state() {
        let mut app = App::new();
        app.add_plugins(SimulationPlugin);
        let registry = app.world().resource::<SaveableRegistry>();
        let keys: Vec<&str> = registry.keys().collect();
        assert!(keys.contains(&"tile_map"));
        assert!(keys.contains(&"sim_rng"));
        assert!(keys.contains(&"disaster_state"));
        assert_eq!(keys.len(), 15);
    }
}
