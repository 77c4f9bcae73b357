// ---------------------------------------------------------------------------
// city_record – the classic fixed-layout city file
// ---------------------------------------------------------------------------
//
// Layout (big-endian 16-bit shorts, no header):
//   6 x 240   history: res, com, ind, crime, pollution, money
//   120       misc block (see MISC_* indices; ints span two shorts, high first)
//   w x h     map, column-major, with flag bits
//
// The classic 120x100 file is 27120 bytes. Some copies carry a 128-byte
// MacBinary prefix, which `from_bytes` skips.

use std::io::{Read, Write};

use bevy::ecs::system::SystemState;
use bevy::prelude::*;

use simulation::budget::CityBudget;
use simulation::census::{Census, History, HISTORY_LENGTH};
use simulation::clock::SimClock;
use simulation::config::{
    CityConfig, CityOptions, Difficulty, DEFAULT_SPEED, DEFAULT_TAX_RATE, MAX_SPEED, MAX_TAX_RATE,
};
use simulation::evaluation::{CityClass, CityEvaluation};
use simulation::grid::TileMap;
use simulation::power::check_power_map;
use simulation::sub_maps::{DensityMaps, PowerMap};
use simulation::tile_catalog::TileCatalog;
use simulation::tile_constants::{LOMASK, PWRBIT};
use simulation::valves::Valves;
use simulation::City;

use crate::save_error::SaveError;

pub const HISTORY_SERIES: usize = 6;
pub const MISC_LENGTH: usize = 120;
pub const MACBINARY_PREFIX: usize = 128;

const MISC_RES_POP: usize = 2;
const MISC_COM_POP: usize = 3;
const MISC_IND_POP: usize = 4;
const MISC_RES_VALVE: usize = 5;
const MISC_COM_VALVE: usize = 6;
const MISC_IND_VALVE: usize = 7;
const MISC_CITY_TIME: usize = 8;
const MISC_CRIME_RAMP: usize = 10;
const MISC_POLLUTE_RAMP: usize = 11;
const MISC_LAND_VALUE_AVG: usize = 12;
const MISC_CRIME_AVG: usize = 13;
const MISC_POLLUTION_AVG: usize = 14;
const MISC_LEVEL: usize = 15;
const MISC_CLASS: usize = 16;
const MISC_SCORE: usize = 17;
const MISC_FUNDS: usize = 50;
const MISC_AUTO_BULLDOZE: usize = 52;
const MISC_AUTO_BUDGET: usize = 53;
const MISC_AUTO_GO: usize = 54;
const MISC_USER_SOUND: usize = 55;
const MISC_TAX: usize = 56;
const MISC_SPEED: usize = 57;
const MISC_POLICE_PCT: usize = 58;
const MISC_FIRE_PCT: usize = 60;
const MISC_ROAD_PCT: usize = 62;

/// Fixed-point scale of the stored funding percentages.
const PERCENT_SCALE: f64 = 65536.0;

/// One classic city file, held as its raw shorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRecord {
    pub width: usize,
    pub height: usize,
    /// Six series of 240 entries each, in file order.
    pub history: Vec<Vec<i16>>,
    pub misc: Vec<i16>,
    /// Column-major cells, flag bits included.
    pub map: Vec<u16>,
}

fn read_shorts(reader: &mut impl Read, n: usize) -> std::io::Result<Vec<i16>> {
    let mut buf = vec![0u8; n * 2];
    reader.read_exact(&mut buf)?;
    Ok(buf
        .chunks_exact(2)
        .map(|b| i16::from_be_bytes([b[0], b[1]]))
        .collect())
}

fn write_shorts(writer: &mut impl Write, shorts: &[i16]) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(shorts.len() * 2);
    for s in shorts {
        buf.extend_from_slice(&s.to_be_bytes());
    }
    writer.write_all(&buf)
}

fn to_short(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

impl CityRecord {
    /// Size in bytes of a record for a `width` x `height` map.
    pub fn byte_len(width: usize, height: usize) -> usize {
        (HISTORY_SERIES * HISTORY_LENGTH + MISC_LENGTH + width * height) * 2
    }

    pub fn read_from(mut reader: impl Read, width: usize, height: usize) -> Result<Self, SaveError> {
        let mut history = Vec::with_capacity(HISTORY_SERIES);
        for _ in 0..HISTORY_SERIES {
            history.push(read_shorts(&mut reader, HISTORY_LENGTH)?);
        }
        let misc = read_shorts(&mut reader, MISC_LENGTH)?;
        let map = read_shorts(&mut reader, width * height)?
            .into_iter()
            .map(|s| s as u16)
            .collect();
        Ok(Self {
            width,
            height,
            history,
            misc,
            map,
        })
    }

    /// Parse a whole file held in memory, skipping a MacBinary prefix when
    /// the length says one is there.
    pub fn from_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self, SaveError> {
        let expected = Self::byte_len(width, height);
        let body = if bytes.len() == expected + MACBINARY_PREFIX {
            &bytes[MACBINARY_PREFIX..]
        } else {
            bytes
        };
        if body.len() != expected {
            return Err(SaveError::Corrupt(format!(
                "city file is {} bytes, a {width}x{height} city needs {expected}",
                bytes.len()
            )));
        }
        Self::read_from(body, width, height)
    }

    pub fn write_to(&self, mut writer: impl Write) -> Result<(), SaveError> {
        for series in &self.history {
            write_shorts(&mut writer, series)?;
        }
        write_shorts(&mut writer, &self.misc)?;
        let map: Vec<i16> = self.map.iter().map(|&c| c as i16).collect();
        write_shorts(&mut writer, &map)?;
        Ok(())
    }

    fn short(&self, i: usize) -> i32 {
        self.misc[i] as i32
    }

    fn int(&self, i: usize) -> i32 {
        ((self.misc[i] as u16 as u32) << 16 | self.misc[i + 1] as u16 as u32) as i32
    }

    fn set_short(&mut self, i: usize, v: i32) {
        self.misc[i] = to_short(v);
    }

    fn set_int(&mut self, i: usize, v: i32) {
        let v = v as u32;
        self.misc[i] = (v >> 16) as u16 as i16;
        self.misc[i + 1] = (v & 0xFFFF) as u16 as i16;
    }

    // -----------------------------------------------------------------------
    // City <-> record
    // -----------------------------------------------------------------------

    /// Snapshot a city into the classic layout. Flag bits are synthesized
    /// from the tile catalog.
    pub fn from_city(city: &City) -> Self {
        let map = city.map();
        let catalog = city.catalog();
        let (width, height) = (map.width, map.height);

        let history = city
            .history()
            .all()
            .iter()
            .map(|series| {
                (0..HISTORY_LENGTH)
                    .map(|i| to_short(series.get(i).copied().unwrap_or(0)))
                    .collect()
            })
            .collect();

        let mut cells = Vec::with_capacity(width * height);
        for x in 0..width as i32 {
            for y in 0..height as i32 {
                let cell = map.get(x, y).unwrap_or(0);
                let dozeable = catalog.is_bulldozable(cell);
                cells.push(catalog.synthesize_flags(cell, dozeable));
            }
        }

        let mut record = Self {
            width,
            height,
            history,
            misc: vec![0; MISC_LENGTH],
            map: cells,
        };

        let census = city.census();
        record.set_short(MISC_RES_POP, census.res_pop);
        record.set_short(MISC_COM_POP, census.com_pop);
        record.set_short(MISC_IND_POP, census.ind_pop);

        let valves = city.valves();
        record.set_short(MISC_RES_VALVE, valves.res);
        record.set_short(MISC_COM_VALVE, valves.com);
        record.set_short(MISC_IND_VALVE, valves.ind);

        record.set_int(MISC_CITY_TIME, city.clock().city_time);
        record.set_short(MISC_CRIME_RAMP, census.crime_ramp);
        record.set_short(MISC_POLLUTE_RAMP, census.pollute_ramp());

        let density = city.density();
        record.set_short(MISC_LAND_VALUE_AVG, density.land_value_average);
        record.set_short(MISC_CRIME_AVG, density.crime_average);
        record.set_short(MISC_POLLUTION_AVG, density.pollution_average);

        let options = city.options();
        record.set_short(MISC_LEVEL, options.level() as i32);
        let evaluation = city.evaluation();
        record.set_short(MISC_CLASS, evaluation.class.index());
        record.set_short(MISC_SCORE, evaluation.score);

        let budget = city.budget();
        record.set_int(MISC_FUNDS, budget.total_funds);
        record.set_short(MISC_AUTO_BULLDOZE, options.auto_bulldoze as i32);
        record.set_short(MISC_AUTO_BUDGET, options.auto_budget as i32);
        record.set_short(MISC_AUTO_GO, options.auto_go as i32);
        record.set_short(MISC_USER_SOUND, options.user_sound as i32);
        record.set_short(MISC_TAX, budget.tax_rate);
        record.set_short(MISC_SPEED, options.speed);
        record.set_int(MISC_POLICE_PCT, (budget.police_percent * PERCENT_SCALE) as i32);
        record.set_int(MISC_FIRE_PCT, (budget.fire_percent * PERCENT_SCALE) as i32);
        record.set_int(MISC_ROAD_PCT, (budget.road_percent * PERCENT_SCALE) as i32);

        record
    }

    /// Build a new city from this record. Out-of-range settings are
    /// replaced with their defaults, the growth caps are cleared and power
    /// is recomputed from the loaded map.
    pub fn into_city(self) -> Result<City, SaveError> {
        let mut city = City::new(CityConfig {
            width: self.width,
            height: self.height,
            ..Default::default()
        })?;
        let world = city.world_mut();

        {
            let mut map = world.resource_mut::<TileMap>();
            let mut cells = self.map.iter();
            for x in 0..self.width as i32 {
                for y in 0..self.height as i32 {
                    let cell = cells.next().copied().unwrap_or(0);
                    map.set_raw(x, y, cell & (LOMASK | PWRBIT))
                        .map_err(|e| SaveError::Corrupt(e.to_string()))?;
                }
            }
        }

        let city_time = self.int(MISC_CITY_TIME).max(0);
        {
            let mut history = world.resource_mut::<History>();
            let history = &mut *history;
            let series = [
                &mut history.res,
                &mut history.com,
                &mut history.ind,
                &mut history.crime,
                &mut history.pollution,
                &mut history.money,
            ];
            for (dst, src) in series.into_iter().zip(&self.history) {
                *dst = src.iter().map(|&v| v as i32).collect();
            }
            history.city_time = city_time;
        }

        {
            let mut census = world.resource_mut::<Census>();
            census.res_pop = self.short(MISC_RES_POP);
            census.com_pop = self.short(MISC_COM_POP);
            census.ind_pop = self.short(MISC_IND_POP);
            census.set_ramps(self.short(MISC_CRIME_RAMP), self.short(MISC_POLLUTE_RAMP));
        }

        {
            let mut valves = world.resource_mut::<Valves>();
            valves.res = self.short(MISC_RES_VALVE);
            valves.com = self.short(MISC_COM_VALVE);
            valves.ind = self.short(MISC_IND_VALVE);
            valves.clear_caps();
        }

        world.resource_mut::<SimClock>().city_time = city_time;

        {
            let mut density = world.resource_mut::<DensityMaps>();
            density.land_value_average = self.short(MISC_LAND_VALUE_AVG);
            density.crime_average = self.short(MISC_CRIME_AVG);
            density.pollution_average = self.short(MISC_POLLUTION_AVG);
        }

        {
            let mut options = world.resource_mut::<CityOptions>();
            options.difficulty = Difficulty::from_index(self.short(MISC_LEVEL));
            options.auto_bulldoze = self.short(MISC_AUTO_BULLDOZE) != 0;
            options.auto_budget = self.short(MISC_AUTO_BUDGET) != 0;
            options.auto_go = self.short(MISC_AUTO_GO) != 0;
            options.user_sound = self.short(MISC_USER_SOUND) != 0;
            let speed = self.short(MISC_SPEED);
            options.speed = if (0..=MAX_SPEED).contains(&speed) {
                speed
            } else {
                DEFAULT_SPEED
            };
        }

        {
            let mut evaluation = world.resource_mut::<CityEvaluation>();
            evaluation.class = CityClass::from_index(self.short(MISC_CLASS));
            let score = self.short(MISC_SCORE);
            evaluation.score = if (0..=999).contains(&score) { score } else { 500 };
        }

        {
            let mut budget = world.resource_mut::<CityBudget>();
            budget.total_funds = self.int(MISC_FUNDS);
            let tax = self.short(MISC_TAX);
            budget.tax_rate = if (0..=MAX_TAX_RATE).contains(&tax) {
                tax
            } else {
                DEFAULT_TAX_RATE
            };
            budget.set_police_percent(self.int(MISC_POLICE_PCT) as f64 / PERCENT_SCALE);
            budget.set_fire_percent(self.int(MISC_FIRE_PCT) as f64 / PERCENT_SCALE);
            budget.set_road_percent(self.int(MISC_ROAD_PCT) as f64 / PERCENT_SCALE);
        }

        let mut state: SystemState<(
            Res<TileMap>,
            Res<TileCatalog>,
            ResMut<Census>,
            ResMut<PowerMap>,
        )> = SystemState::new(world);
        let (map, catalog, mut census, mut power) = state.get_mut(world);
        let scan = check_power_map(&map, &catalog, &mut census, &mut power);
        info!(
            "imported classic city: {} plants power {} cells",
            census.coal_count + census.nuclear_count,
            power.powered_count()
        );
        if scan.brownout {
            warn!("imported city is short of power");
        }

        Ok(city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::tile_constants::{BULLBIT, CONDBIT, POWERPLANT, RESCLR, ZONEBIT};
    use simulation::tools::{Tool, ToolStroke};

    fn classic_city() -> City {
        let mut city = City::new(CityConfig::default()).unwrap();
        city.apply_tool(ToolStroke::new(Tool::PowerPlant, 5, 5));
        city.apply_tool(ToolStroke::line(Tool::Wire, 8, 5, 10, 5));
        city.apply_tool(ToolStroke::new(Tool::Residential, 12, 5));
        city.set_tax_rate(12);
        city.set_road_percent(0.5);
        city
    }

    #[test]
    fn test_classic_file_is_27120_bytes() {
        let mut out = Vec::new();
        CityRecord::from_city(&classic_city()).write_to(&mut out).unwrap();
        assert_eq!(out.len(), 27120);
        assert_eq!(CityRecord::byte_len(120, 100), 27120);
    }

    #[test]
    fn test_map_is_column_major_with_flags() {
        let record = CityRecord::from_city(&classic_city());
        // column 12, row 5
        let cell = record.map[12 * 100 + 5];
        assert_eq!(cell & LOMASK, RESCLR);
        assert_ne!(cell & ZONEBIT, 0);
        assert_ne!(cell & CONDBIT, 0);
        assert_eq!(cell & BULLBIT, 0);
    }

    #[test]
    fn test_misc_block_layout() {
        let record = CityRecord::from_city(&classic_city());
        assert_eq!(record.int(MISC_FUNDS), 20000 - 3000 - 15 - 100);
        assert_eq!(record.short(MISC_TAX), 12);
        assert_eq!(record.int(MISC_ROAD_PCT), 32768);
        assert_eq!(record.int(MISC_FIRE_PCT), 65536);
        assert_eq!(record.short(MISC_SCORE), 500);
    }

    #[test]
    fn test_import_restores_settings_and_map() {
        let city = classic_city();
        let mut bytes = Vec::new();
        CityRecord::from_city(&city).write_to(&mut bytes).unwrap();

        let loaded = CityRecord::read_from(bytes.as_slice(), 120, 100)
            .unwrap()
            .into_city()
            .unwrap();
        assert_eq!(loaded.map().tile(5, 5), POWERPLANT);
        assert_eq!(loaded.map().tile(12, 5), RESCLR);
        assert_eq!(loaded.budget().total_funds, city.budget().total_funds);
        assert_eq!(loaded.budget().tax_rate, 12);
        assert!((loaded.budget().road_percent - 0.5).abs() < 1e-9);
        assert_eq!(loaded.census().coal_count, 1);
        assert!(loaded.power_map().has_power(12, 5));
    }

    #[test]
    fn test_import_sanitizes_out_of_range_values() {
        let mut record = CityRecord::from_city(&classic_city());
        record.set_int(MISC_CITY_TIME, -5);
        record.set_short(MISC_TAX, 99);
        record.set_short(MISC_LEVEL, 7);
        record.set_short(MISC_CLASS, 12);
        record.set_short(MISC_SCORE, 4000);

        let city = record.into_city().unwrap();
        assert_eq!(city.clock().city_time, 0);
        assert_eq!(city.budget().tax_rate, DEFAULT_TAX_RATE);
        assert_eq!(city.options().difficulty, Difficulty::Easy);
        assert_eq!(city.evaluation().class, CityClass::Village);
        assert_eq!(city.evaluation().score, 500);
    }

    #[test]
    fn test_macbinary_prefix_is_skipped() {
        let mut bytes = vec![0u8; MACBINARY_PREFIX];
        CityRecord::from_city(&classic_city())
            .write_to(&mut bytes)
            .unwrap();
        let record = CityRecord::from_bytes(&bytes, 120, 100).unwrap();
        assert_eq!(record.map[12 * 100 + 5] & LOMASK, RESCLR);
    }

    #[test]
    fn test_short_file_is_an_error() {
        let bytes = vec![0u8; 1000];
        assert!(CityRecord::from_bytes(&bytes, 120, 100).is_err());
        assert!(matches!(
            CityRecord::read_from(bytes.as_slice(), 120, 100),
            Err(SaveError::Io(_))
        ));
    }
}
