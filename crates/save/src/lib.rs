//! Persistence for `simulation::City`: checksummed snapshots of the whole
//! simulation state, and the classic fixed-layout city file.

mod atomic_write;
pub mod city_record;
pub mod file_header;
mod save_error;
pub mod snapshot;

use std::io::{Read, Write};
use std::path::Path;

use bevy::prelude::*;
use simulation::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use simulation::City;

pub use city_record::CityRecord;
pub use save_error::SaveError;
pub use snapshot::CitySnapshot;

/// Encode the whole city into a snapshot file.
pub fn save_city(city: &City) -> Vec<u8> {
    let bytes = CitySnapshot::capture(city).to_bytes();
    debug!(
        "saved city at week {} ({} bytes)",
        city.clock().city_time,
        bytes.len()
    );
    bytes
}

/// Decode a snapshot into a new city. The caller's current city is not
/// touched, so a failed load leaves it running as it was.
pub fn load_city(bytes: &[u8]) -> Result<City, SaveError> {
    let city = CitySnapshot::from_bytes(bytes)
        .and_then(|snapshot| snapshot.restore())
        .inspect_err(|e| warn!("city snapshot rejected: {e}"))?;
    info!(
        "loaded {}x{} city at week {}",
        city.map().width,
        city.map().height,
        city.clock().city_time
    );
    Ok(city)
}

/// Write the classic 120x100 city file layout.
pub fn export_classic(city: &City, writer: impl Write) -> Result<(), SaveError> {
    CityRecord::from_city(city).write_to(writer)
}

/// Read a classic city file of the standard 120x100 size.
pub fn import_classic(reader: impl Read) -> Result<City, SaveError> {
    CityRecord::read_from(reader, DEFAULT_WIDTH, DEFAULT_HEIGHT)?.into_city()
}

/// Save a snapshot to disk without ever leaving a half-written file.
pub fn write_city_file(path: &Path, city: &City) -> Result<(), SaveError> {
    atomic_write::atomic_write(path, &save_city(city))?;
    Ok(())
}

pub fn read_city_file(path: &Path) -> Result<City, SaveError> {
    let bytes = std::fs::read(path)?;
    load_city(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::config::CityConfig;
    use simulation::tools::{Tool, ToolStroke};

    fn town() -> City {
        let mut city = City::new(CityConfig {
            seed: 3,
            generate_terrain: true,
            ..Default::default()
        })
        .unwrap();
        city.apply_tool(ToolStroke::new(Tool::PowerPlant, 60, 50));
        city.advance_days(1);
        city
    }

    #[test]
    fn test_save_then_load() {
        let city = town();
        let loaded = load_city(&save_city(&city)).unwrap();
        assert_eq!(loaded.map(), city.map());
        assert_eq!(loaded.clock(), city.clock());
    }

    #[test]
    fn test_corrupt_load_is_an_error() {
        let mut bytes = save_city(&town());
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x55;
        assert!(matches!(load_city(&bytes), Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn test_failed_load_leaves_city_alone() {
        let mut city = town();
        let before = city.map().clone();
        if let Ok(loaded) = load_city(b"not a city") {
            city = loaded;
        }
        assert_eq!(city.map(), &before);
    }

    #[test]
    fn test_classic_export_then_import() {
        let city = town();
        let mut bytes = Vec::new();
        export_classic(&city, &mut bytes).unwrap();
        let loaded = import_classic(bytes.as_slice()).unwrap();
        assert_eq!(loaded.map().tile(60, 50), city.map().tile(60, 50));
        assert_eq!(loaded.budget().total_funds, city.budget().total_funds);
        assert_eq!(loaded.clock().city_time, 1);
    }

    #[test]
    fn test_city_file_on_disk() {
        let dir = std::env::temp_dir().join("micropolis_save_lib_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("town.mcty");

        let city = town();
        write_city_file(&path, &city).unwrap();
        let loaded = read_city_file(&path).unwrap();
        assert_eq!(loaded.map(), city.map());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
