//! Whole-city snapshots: every registered `Saveable` resource, bitcode
//! encoded, lz4 compressed and framed by a checksummed header.

use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use simulation::config::CityConfig;
use simulation::{City, SaveableRegistry};

use crate::file_header::{unwrap_header, wrap_with_header, FLAG_COMPRESSED};
use crate::save_error::SaveError;

/// The decoded payload of a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CitySnapshot {
    pub width: u32,
    pub height: u32,
    /// Seed the city was founded with. The live random state travels in
    /// the `sim_rng` section.
    pub seed: u64,
    /// Saveable key to encoded resource.
    pub sections: BTreeMap<String, Vec<u8>>,
}

impl CitySnapshot {
    pub fn capture(city: &City) -> Self {
        let world = city.world();
        let sections = world.resource::<SaveableRegistry>().save_all(world);
        let config = city.config();
        Self {
            width: config.width as u32,
            height: config.height as u32,
            seed: config.seed,
            sections,
        }
    }

    /// Build a new city holding this snapshot's state.
    pub fn restore(&self) -> Result<City, SaveError> {
        let config = CityConfig {
            width: self.width as usize,
            height: self.height as usize,
            seed: self.seed,
            ..Default::default()
        };
        let mut city = City::new(config)?;
        city.world_mut()
            .resource_scope(|world, registry: Mut<SaveableRegistry>| {
                registry.load_all(world, &self.sections)
            })?;

        let map = city.map();
        if (map.width, map.height) != (self.width as usize, self.height as usize) {
            return Err(SaveError::Corrupt(format!(
                "map is {}x{} but the snapshot header says {}x{}",
                map.width, map.height, self.width, self.height
            )));
        }
        city.check_shapes().map_err(SaveError::Corrupt)?;
        Ok(city)
    }

    /// Encode, compress and frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let encoded = bitcode::encode(self);
        let compressed = lz4_flex::compress(&encoded);
        wrap_with_header(&compressed, FLAG_COMPRESSED, encoded.len())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        let (header, payload) = unwrap_header(bytes)?;
        let decoded;
        let raw = if header.is_compressed() {
            decoded = lz4_flex::decompress(payload, header.uncompressed_size as usize)
                .map_err(|e| SaveError::Corrupt(format!("lz4: {e}")))?;
            decoded.as_slice()
        } else {
            payload
        };
        if raw.len() != header.uncompressed_size as usize {
            return Err(SaveError::Corrupt(format!(
                "payload is {} bytes, header says {}",
                raw.len(),
                header.uncompressed_size
            )));
        }
        Ok(bitcode::decode(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::tools::{Tool, ToolStroke};

    fn small_city() -> City {
        let mut city = City::new(CityConfig {
            width: 32,
            height: 32,
            seed: 77,
            generate_terrain: true,
            ..Default::default()
        })
        .unwrap();
        city.apply_tool(ToolStroke::new(Tool::PowerPlant, 5, 5));
        city.apply_tool(ToolStroke::new(Tool::Residential, 10, 5));
        city.advance_days(2);
        city
    }

    #[test]
    fn test_capture_holds_every_nonempty_section() {
        let city = small_city();
        let snap = CitySnapshot::capture(&city);
        assert_eq!((snap.width, snap.height), (32, 32));
        for key in ["tile_map", "sim_rng", "sim_clock", "city_budget", "history"] {
            assert!(snap.sections.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_restored_city_matches() {
        let city = small_city();
        let restored = CitySnapshot::from_bytes(&CitySnapshot::capture(&city).to_bytes())
            .unwrap()
            .restore()
            .unwrap();

        assert_eq!(restored.map(), city.map());
        assert_eq!(restored.clock(), city.clock());
        assert_eq!(restored.budget().total_funds, city.budget().total_funds);
        assert_eq!(restored.history(), city.history());
        assert_eq!(restored.options(), city.options());
    }

    #[test]
    fn test_restored_city_keeps_running_in_step() {
        let mut city = small_city();
        let mut restored = CitySnapshot::from_bytes(&CitySnapshot::capture(&city).to_bytes())
            .unwrap()
            .restore()
            .unwrap();

        city.advance_days(3);
        restored.advance_days(3);
        assert_eq!(restored.map(), city.map());
        assert_eq!(restored.valves(), city.valves());
    }

    #[test]
    fn test_bad_section_is_an_error() {
        let city = small_city();
        let mut snap = CitySnapshot::capture(&city);
        snap.sections.insert("tile_map".to_string(), vec![1, 2, 3]);
        let err = snap.restore().unwrap_err();
        assert!(matches!(err, SaveError::Section(_)), "got {err}");
    }

    /// Re-encode one section of `snap` from a stand-in value.
    fn replace_section<T: Encode>(snap: &mut CitySnapshot, key: &str, value: &T) {
        snap.sections.insert(key.to_string(), bitcode::encode(value));
    }

    #[test]
    fn test_short_tile_map_is_corrupt() {
        // Same field layout as `TileMap`, with a cell buffer that is too short.
        #[derive(Encode)]
        struct ShortMap {
            cells: Vec<u16>,
            width: usize,
            height: usize,
        }

        let mut snap = CitySnapshot::capture(&small_city());
        replace_section(
            &mut snap,
            "tile_map",
            &ShortMap {
                cells: vec![0; 10],
                width: 32,
                height: 32,
            },
        );
        let bytes = snap.to_bytes();
        let err = CitySnapshot::from_bytes(&bytes)
            .unwrap()
            .restore()
            .unwrap_err();
        assert!(matches!(err, SaveError::Corrupt(_)), "got {err}");
    }

    #[test]
    fn test_mismatched_sub_map_is_corrupt() {
        use simulation::sub_maps::PowerMap;
        use simulation::Saveable;

        let mut snap = CitySnapshot::capture(&small_city());
        let small_power = PowerMap::new(16, 16).save_to_bytes().unwrap();
        snap.sections.insert("power_map".to_string(), small_power);
        let err = snap.restore().unwrap_err();
        assert!(err.to_string().contains("power map"), "got {err}");
    }

    #[test]
    fn test_truncated_bytes_are_an_error() {
        let bytes = CitySnapshot::capture(&small_city()).to_bytes();
        let cut = &bytes[..bytes.len() / 2];
        assert!(CitySnapshot::from_bytes(cut).is_err());
    }
}
