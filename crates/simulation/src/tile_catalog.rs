//! Static per-tile attributes and the tile predicates built on them.
//!
//! The catalog is loaded once before the simulation starts and never
//! mutated afterwards. Every cell flag other than `PWRBIT` is derived from
//! it, so the live grid never stores a copy that could drift.

mod parser;
pub mod standard;

use bevy::prelude::*;

use crate::tile_constants::*;

pub use parser::CatalogError;

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// What the map scan does when it visits a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileBehavior {
    Fire,
    Flood,
    Radioactive,
    Road,
    Rail,
    Explosion,
    Residential,
    HospitalChurch,
    Commercial,
    Industrial,
    Coal,
    Nuclear,
    FireStation,
    PoliceStation,
    StadiumEmpty,
    StadiumFull,
    Airport,
    Seaport,
}

impl TileBehavior {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FIRE" => TileBehavior::Fire,
            "FLOOD" => TileBehavior::Flood,
            "RADIOACTIVE" => TileBehavior::Radioactive,
            "ROAD" => TileBehavior::Road,
            "RAIL" => TileBehavior::Rail,
            "EXPLOSION" => TileBehavior::Explosion,
            "RESIDENTIAL" => TileBehavior::Residential,
            "HOSPITAL_CHURCH" => TileBehavior::HospitalChurch,
            "COMMERCIAL" => TileBehavior::Commercial,
            "INDUSTRIAL" => TileBehavior::Industrial,
            "COAL" => TileBehavior::Coal,
            "NUCLEAR" => TileBehavior::Nuclear,
            "FIRESTATION" => TileBehavior::FireStation,
            "POLICESTATION" => TileBehavior::PoliceStation,
            "STADIUM_EMPTY" => TileBehavior::StadiumEmpty,
            "STADIUM_FULL" => TileBehavior::StadiumFull,
            "AIRPORT" => TileBehavior::Airport,
            "SEAPORT" => TileBehavior::Seaport,
            _ => return None,
        })
    }

    /// Behaviors that only ever sit on a zone center.
    pub fn is_zone(self) -> bool {
        !matches!(
            self,
            TileBehavior::Fire
                | TileBehavior::Flood
                | TileBehavior::Radioactive
                | TileBehavior::Road
                | TileBehavior::Rail
                | TileBehavior::Explosion
        )
    }
}

// ---------------------------------------------------------------------------
// TileSpec
// ---------------------------------------------------------------------------

/// Footprint of a multi-cell building anchored on its zone center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingInfo {
    pub width: usize,
    pub height: usize,
    /// Row-major member tiles. For dimensions of 3 or more the first member
    /// sits one column left of and one row above the center.
    pub members: Vec<u16>,
}

impl BuildingInfo {
    /// Consecutive member numbering derived from the center tile.
    pub fn from_center(center: u16, width: usize, height: usize) -> Self {
        let mut start = center as i32;
        if width >= 3 {
            start -= 1;
        }
        if height >= 3 {
            start -= width as i32;
        }
        let members = (0..(width * height) as i32)
            .map(|i| (start + i) as u16)
            .collect();
        Self {
            width,
            height,
            members,
        }
    }

    /// Offset of member `index` relative to the center.
    pub fn member_offset(&self, index: usize) -> (i32, i32) {
        let ox = if self.width >= 3 { -1 } else { 0 };
        let oy = if self.height >= 3 { -1 } else { 0 };
        (
            ox + (index % self.width) as i32,
            oy + (index / self.width) as i32,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TileSpec {
    pub number: u16,
    pub name: String,
    pub anim_next: Option<u16>,
    pub on_power: Option<u16>,
    pub on_shutdown: Option<u16>,
    pub owner: Option<u16>,
    /// Position of this tile relative to its owner. Never `(0, 0)` when `owner` is set.
    pub owner_offset: (i32, i32),
    pub building: Option<BuildingInfo>,
    pub population: i32,
    pub pollution: Option<i32>,
    pub bulldozable: bool,
    pub burnable: bool,
    pub conductive: bool,
    pub overwater: bool,
    pub zone: bool,
    pub behavior: Option<TileBehavior>,
    pub description: Option<i32>,
}

// ---------------------------------------------------------------------------
// TileCatalog
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone)]
pub struct TileCatalog {
    tiles: Vec<TileSpec>,
}

impl Default for TileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TileCatalog {
    /// The classic tile set, built in code.
    pub fn standard() -> Self {
        standard::build()
    }

    /// Parse the textual catalog format.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        parser::parse(text)
    }

    pub(crate) fn from_specs(tiles: Vec<TileSpec>) -> Self {
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Spec for a tile number; power and flag bits are ignored.
    pub fn get(&self, tile: u16) -> Option<&TileSpec> {
        self.tiles.get((tile & LOMASK) as usize)
    }

    fn flag(&self, tile: u16, f: impl Fn(&TileSpec) -> bool) -> bool {
        self.get(tile).is_some_and(f)
    }

    pub fn is_zone_center(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.zone)
    }

    pub fn is_conductive(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.conductive)
    }

    pub fn is_combustible(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.burnable)
    }

    pub fn is_bulldozable(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.bulldozable)
    }

    pub fn is_overwater(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.overwater)
    }

    pub fn is_animated(&self, tile: u16) -> bool {
        self.flag(tile, |t| t.anim_next.is_some())
    }

    pub fn behavior(&self, tile: u16) -> Option<TileBehavior> {
        self.get(tile).and_then(|t| t.behavior)
    }

    pub fn building(&self, tile: u16) -> Option<&BuildingInfo> {
        self.get(tile).and_then(|t| t.building.as_ref())
    }

    /// Footprint size of a zone center; `None` for anything else.
    pub fn zone_size(&self, tile: u16) -> Option<(usize, usize)> {
        self.building(tile).map(|b| (b.width, b.height))
    }

    pub fn owner(&self, tile: u16) -> Option<(u16, (i32, i32))> {
        self.get(tile)
            .and_then(|t| t.owner.map(|o| (o, t.owner_offset)))
    }

    /// Pollution emitted per tile; members inherit from their owner.
    pub fn pollution(&self, tile: u16) -> i32 {
        let Some(spec) = self.get(tile) else {
            return 0;
        };
        match (spec.pollution, spec.owner) {
            (Some(p), _) => p,
            (None, Some(owner)) if owner != spec.number => self.pollution(owner),
            _ => 0,
        }
    }

    pub fn population(&self, tile: u16) -> i32 {
        self.get(tile).map_or(0, |t| t.population)
    }

    pub fn description(&self, tile: u16) -> i32 {
        let Some(spec) = self.get(tile) else {
            return -1;
        };
        match (spec.description, spec.owner) {
            (Some(d), _) => d,
            (None, Some(owner)) if owner != spec.number => self.description(owner),
            _ => -1,
        }
    }

    pub fn is_floodable(&self, tile: u16) -> bool {
        let t = tile & LOMASK;
        t == DIRT || (self.is_bulldozable(t) && self.is_combustible(t))
    }

    pub fn is_arsonable(&self, tile: u16) -> bool {
        let t = tile & LOMASK;
        !self.is_zone_center(t) && (LHTHR..=LASTZONE).contains(&t)
    }

    pub fn is_vulnerable(&self, tile: u16) -> bool {
        let t = tile & LOMASK;
        (RESBASE..=LASTZONE).contains(&t) && !self.is_zone_center(t)
    }

    /// Bridges are road tiles that do not burn.
    pub fn is_bridge(&self, tile: u16) -> bool {
        is_road_any(tile) && !self.is_combustible(tile)
    }

    /// Flag bits the classic file format stores alongside the tile number.
    /// `dozeable` comes from the grid context (owner intact or not).
    pub fn synthesize_flags(&self, tile: u16, dozeable: bool) -> u16 {
        let mut z = tile & (LOMASK | PWRBIT);
        if self.is_conductive(z) {
            z |= CONDBIT;
        }
        if self.is_combustible(z) {
            z |= BURNBIT;
        }
        if dozeable {
            z |= BULLBIT;
        }
        if self.is_animated(z) {
            z |= ANIMBIT;
        }
        if self.is_zone_center(z) {
            z |= ZONEBIT;
        }
        z
    }
}

// ---------------------------------------------------------------------------
// Numeric predicates
// ---------------------------------------------------------------------------

pub fn is_river_edge(tile: u16) -> bool {
    (FIRSTRIVEDGE..=LASTRIVEDGE).contains(&(tile & LOMASK))
}

pub fn is_rubble(tile: u16) -> bool {
    (RUBBLE..=LASTRUBBLE).contains(&(tile & LOMASK))
}

pub fn is_tree(tile: u16) -> bool {
    (WOODS_LOW..=WOODS_HIGH).contains(&(tile & LOMASK))
}

pub fn is_water(tile: u16) -> bool {
    let t = tile & LOMASK;
    t > DIRT && t <= LASTRIVEDGE
}

pub fn is_road_any(tile: u16) -> bool {
    let t = tile & LOMASK;
    (ROADBASE..POWERBASE).contains(&t) || t == HRAILROAD || t == VRAILROAD
}

pub fn is_rail(tile: u16) -> bool {
    let t = tile & LOMASK;
    (RAILBASE..RESBASE).contains(&t) || t == RAILHPOWERV || t == RAILVPOWERH
}

pub fn is_residential_clear(tile: u16) -> bool {
    (RESBASE..=RESBASE + 8).contains(&(tile & LOMASK))
}

/// Rubble, flood, radioactive and fire: not rebuilt by zone repair.
pub fn is_indestructible(tile: u16) -> bool {
    let t = tile & LOMASK;
    (RUBBLE..ROADBASE).contains(&t)
}

/// Flood, radioactive and fire: blocks zone placement.
pub fn is_indestructible2(tile: u16) -> bool {
    let t = tile & LOMASK;
    (FLOOD..ROADBASE).contains(&t)
}

pub fn is_constructed(tile: u16) -> bool {
    (tile & LOMASK) >= ROADBASE
}

pub fn can_auto_bulldoze_rrw(tile: u16) -> bool {
    let t = tile & LOMASK;
    (FIRSTRIVEDGE..=LASTRUBBLE).contains(&t) || (TINYEXP..=LASTTINYEXP).contains(&t)
}

pub fn can_auto_bulldoze_z(tile: u16) -> bool {
    let t = tile & LOMASK;
    can_auto_bulldoze_rrw(t) || (POWERBASE + 2..=POWERBASE + 12).contains(&t)
}

/// Water-crossing tiles that a road, rail or wire layer must not overwrite.
pub fn check_wet(tile: u16) -> bool {
    let t = tile & LOMASK;
    matches!(t, POWERBASE | VPOWER | RAILBASE | VRAIL | BRWH | BRWV)
}

pub fn residential_zone_pop(tile: u16) -> i32 {
    let t = (tile & LOMASK) as i32;
    ((t - RZB as i32) / 9) % 4 * 8 + 16
}

pub fn commercial_zone_pop(tile: u16) -> i32 {
    let t = tile & LOMASK;
    if t == COMCLR {
        return 0;
    }
    ((t as i32 - CZB as i32) / 9) % 5 + 1
}

pub fn industrial_zone_pop(tile: u16) -> i32 {
    let t = tile & LOMASK;
    if t == INDCLR {
        return 0;
    }
    ((t as i32 - IZB as i32) / 9) % 4 + 1
}

/// Strip the traffic tier from a road tile.
pub fn neutralize_road(tile: u16) -> u16 {
    let t = tile & LOMASK;
    if (ROADBASE..=LASTROAD).contains(&t) {
        ((t - ROADBASE) & 0xf) + ROADBASE
    } else {
        t
    }
}

pub fn is_road_dynamic(tile: u16) -> bool {
    let t = neutralize_road(tile);
    (ROADS..=INTERSECTION).contains(&t)
}

pub fn road_connects_east(tile: u16) -> bool {
    let t = neutralize_road(tile);
    (t == VRAILROAD || (ROADBASE..=VROADPOWER).contains(&t))
        && t != VROADPOWER
        && t != HRAILROAD
        && t != VBRIDGE
}

pub fn road_connects_west(tile: u16) -> bool {
    road_connects_east(tile)
}

pub fn road_connects_north(tile: u16) -> bool {
    let t = neutralize_road(tile);
    (t == HRAILROAD || (ROADBASE..=VROADPOWER).contains(&t))
        && t != HROADPOWER
        && t != VRAILROAD
        && t != ROADBASE
}

pub fn road_connects_south(tile: u16) -> bool {
    road_connects_north(tile)
}

pub fn is_rail_dynamic(tile: u16) -> bool {
    (LHRAIL..=LVRAIL10).contains(&(tile & LOMASK))
}

pub fn rail_connects_east(tile: u16) -> bool {
    let t = tile & LOMASK;
    (RAILHPOWERV..=VRAILROAD).contains(&t) && t != RAILVPOWERH && t != VRAILROAD && t != VRAIL
}

pub fn rail_connects_west(tile: u16) -> bool {
    rail_connects_east(tile)
}

pub fn rail_connects_north(tile: u16) -> bool {
    let t = tile & LOMASK;
    (RAILHPOWERV..=VRAILROAD).contains(&t) && t != RAILHPOWERV && t != HRAILROAD && t != HRAIL
}

pub fn rail_connects_south(tile: u16) -> bool {
    rail_connects_north(tile)
}

pub fn is_wire_dynamic(tile: u16) -> bool {
    (LHPOWER..=LVPOWER10).contains(&(tile & LOMASK))
}

impl TileCatalog {
    pub fn wire_connects_east(&self, tile: u16) -> bool {
        let t = tile & LOMASK;
        self.is_conductive(t) && t != HPOWER && t != HROADPOWER && t != RAILHPOWERV
    }

    pub fn wire_connects_west(&self, tile: u16) -> bool {
        self.wire_connects_east(tile)
    }

    pub fn wire_connects_north(&self, tile: u16) -> bool {
        let t = tile & LOMASK;
        self.is_conductive(t) && t != VPOWER && t != VROADPOWER && t != RAILVPOWERH
    }

    pub fn wire_connects_south(&self, tile: u16) -> bool {
        self.wire_connects_north(tile)
    }
}
