//! The classic tile set, assembled in code.

use super::{BuildingInfo, TileBehavior, TileCatalog, TileSpec};
use crate::tile_constants::*;

// Building description numbers reported by zone queries.
pub const DESC_CLEAR: i32 = 1;
pub const DESC_WATER: i32 = 2;
pub const DESC_TREES: i32 = 3;
pub const DESC_RUBBLE: i32 = 4;
pub const DESC_FLOOD: i32 = 5;
pub const DESC_RADIOACTIVE: i32 = 6;
pub const DESC_FIRE: i32 = 7;
pub const DESC_ROAD: i32 = 8;
pub const DESC_POWER: i32 = 9;
pub const DESC_RAIL: i32 = 10;
pub const DESC_RESIDENTIAL: i32 = 11;
pub const DESC_COMMERCIAL: i32 = 12;
pub const DESC_INDUSTRIAL: i32 = 13;
pub const DESC_SEAPORT: i32 = 14;
pub const DESC_AIRPORT: i32 = 15;
pub const DESC_COAL: i32 = 16;
pub const DESC_FIRE_DEPT: i32 = 17;
pub const DESC_POLICE_DEPT: i32 = 18;
pub const DESC_STADIUM: i32 = 19;
pub const DESC_NUCLEAR: i32 = 20;
pub const DESC_DRAW_BRIDGE: i32 = 21;
pub const DESC_RADAR: i32 = 22;
pub const DESC_FOUNTAIN: i32 = 23;
pub const DESC_HOSPITAL: i32 = 24;
pub const DESC_CHURCH: i32 = 25;

struct Builder {
    tiles: Vec<TileSpec>,
}

impl Builder {
    fn new() -> Self {
        let tiles = (0..TILE_COUNT as u16)
            .map(|n| TileSpec {
                number: n,
                name: n.to_string(),
                ..Default::default()
            })
            .collect();
        Self { tiles }
    }

    fn each(&mut self, lo: u16, hi: u16, f: impl Fn(&mut TileSpec)) {
        for n in lo..=hi {
            f(&mut self.tiles[n as usize]);
        }
    }

    fn tile(&mut self, n: u16) -> &mut TileSpec {
        &mut self.tiles[n as usize]
    }

    /// A looping animation over `frames` tiles spaced `step` apart.
    fn cycle(&mut self, first: u16, frames: u16, step: u16) {
        for i in 0..frames {
            let next = first + ((i + 1) % frames) * step;
            self.tile(first + i * step).anim_next = Some(next);
        }
    }

    /// Mark a zone center and derive its footprint.
    fn zone(
        &mut self,
        center: u16,
        size: usize,
        behavior: TileBehavior,
        desc: i32,
        population: i32,
    ) {
        let bi = BuildingInfo::from_center(center, size, size);
        for &m in &bi.members {
            let t = self.tile(m);
            t.burnable = true;
            t.conductive = true;
            t.description = Some(desc);
        }
        let t = self.tile(center);
        t.zone = true;
        t.behavior = Some(behavior);
        t.population = population;
        t.building = Some(bi);
    }

    /// Alternate frames for a footprint member while its zone is powered.
    fn powered_member(&mut self, member: u16, owner: u16, offset: (i32, i32), first: u16, frames: u16) {
        self.tile(member).on_power = Some(first);
        self.cycle(first, frames, 1);
        for f in first..first + frames {
            let t = self.tile(f);
            t.owner = Some(owner);
            t.owner_offset = offset;
            t.on_shutdown = Some(member);
            t.burnable = true;
            t.conductive = true;
        }
    }

    /// Owners for footprint members that have none yet.
    fn assign_owners(mut self) -> Vec<TileSpec> {
        let buildings: Vec<(u16, BuildingInfo)> = self
            .tiles
            .iter()
            .filter_map(|t| t.building.clone().map(|b| (t.number, b)))
            .collect();
        for (center, bi) in buildings {
            for (i, &m) in bi.members.iter().enumerate() {
                let offset = bi.member_offset(i);
                let t = self.tile(m);
                if t.owner.is_none() && offset != (0, 0) {
                    t.owner = Some(center);
                    t.owner_offset = offset;
                }
            }
        }
        self.tiles
    }
}

pub(super) fn build() -> TileCatalog {
    let mut b = Builder::new();

    b.tile(DIRT).description = Some(DESC_CLEAR);
    b.each(1, LASTRIVEDGE, |t| t.description = Some(DESC_WATER));
    b.each(FIRSTRIVEDGE, LASTRIVEDGE, |t| t.bulldozable = true);

    b.each(TREEBASE, WOODS5, |t| {
        t.bulldozable = true;
        t.burnable = true;
        t.description = Some(DESC_TREES);
    });

    b.each(RUBBLE, LASTRUBBLE, |t| {
        t.bulldozable = true;
        t.description = Some(DESC_RUBBLE);
    });

    b.each(FLOOD, LASTFLOOD, |t| {
        t.behavior = Some(TileBehavior::Flood);
        t.description = Some(DESC_FLOOD);
    });

    b.each(RADTILE, FIRE - 1, |t| t.description = Some(DESC_RADIOACTIVE));
    b.tile(RADTILE).behavior = Some(TileBehavior::Radioactive);
    b.tile(RADTILE).pollution = Some(255);

    b.each(FIRE, LASTFIRE, |t| {
        t.behavior = Some(TileBehavior::Fire);
        t.description = Some(DESC_FIRE);
        t.pollution = Some(90);
    });
    b.cycle(FIRE, 8, 1);

    build_roads(&mut b);

    b.each(POWERBASE, LASTPOWER, |t| {
        t.bulldozable = true;
        t.burnable = true;
        t.conductive = true;
        t.description = Some(DESC_POWER);
    });
    b.each(HPOWER, VPOWER, |t| {
        t.burnable = false;
        t.overwater = true;
    });
    b.each(RAILHPOWERV, RAILVPOWERH, |t| {
        t.behavior = Some(TileBehavior::Rail);
        t.description = Some(DESC_RAIL);
    });

    b.each(RAILBASE, LASTRAIL, |t| {
        t.bulldozable = true;
        t.burnable = true;
        t.behavior = Some(TileBehavior::Rail);
        t.description = Some(DESC_RAIL);
    });
    b.each(HRAIL, VRAIL, |t| {
        t.burnable = false;
        t.overwater = true;
    });

    build_zones(&mut b);
    build_animations(&mut b);

    TileCatalog::from_specs(b.assign_owners())
}

fn build_roads(b: &mut Builder) {
    for t in ROADBASE..=LASTROAD {
        let o = (t - ROADBASE) & 0xf;
        let level = (t - ROADBASE) / 16;
        let spec = b.tile(t);
        if o == 15 {
            // Open drawbridge centers; the other slots in this column are unused.
            if t == BRWH || t == BRWV {
                spec.overwater = true;
                spec.behavior = Some(TileBehavior::Road);
                spec.description = Some(DESC_DRAW_BRIDGE);
            }
            continue;
        }
        spec.bulldozable = true;
        spec.behavior = Some(TileBehavior::Road);
        spec.description = Some(DESC_ROAD);
        match o {
            0 | 1 => spec.overwater = true,
            13 | 14 => {
                spec.burnable = true;
                spec.conductive = true;
            }
            _ => spec.burnable = true,
        }
        spec.pollution = match level {
            0 => None,
            1..=4 => Some(50),
            _ => Some(75),
        };
    }

    // Traffic tiers cycle through four frames sixteen tiles apart.
    for o in 0..15 {
        b.cycle(LTRFBASE + o, 4, 16);
        b.cycle(HTRFBASE + o, 4, 16);
    }
}

fn build_zones(b: &mut Builder) {
    b.zone(RESCLR, 3, TileBehavior::Residential, DESC_RESIDENTIAL, 0);
    b.each(LHTHR, HHTHR, |t| {
        t.bulldozable = true;
        t.burnable = true;
        t.conductive = true;
        t.description = Some(DESC_RESIDENTIAL);
    });
    for k in 0..16 {
        let center = RZB + 9 * k;
        b.zone(
            center,
            3,
            TileBehavior::Residential,
            DESC_RESIDENTIAL,
            super::residential_zone_pop(center),
        );
    }

    b.zone(HOSPITAL, 3, TileBehavior::HospitalChurch, DESC_HOSPITAL, 0);
    b.zone(CHURCH, 3, TileBehavior::HospitalChurch, DESC_CHURCH, 0);

    b.zone(COMCLR, 3, TileBehavior::Commercial, DESC_COMMERCIAL, 0);
    for k in 0..20 {
        let center = CZB + 9 * k;
        b.zone(
            center,
            3,
            TileBehavior::Commercial,
            DESC_COMMERCIAL,
            super::commercial_zone_pop(center),
        );
    }

    b.zone(INDCLR, 3, TileBehavior::Industrial, DESC_INDUSTRIAL, 0);
    for k in 0..8 {
        let center = IZB + 9 * k;
        b.zone(
            center,
            3,
            TileBehavior::Industrial,
            DESC_INDUSTRIAL,
            super::industrial_zone_pop(center),
        );
    }
    b.each(IZB - 4, LASTIND, |t| t.pollution = Some(50));

    b.zone(PORT, 4, TileBehavior::Seaport, DESC_SEAPORT, 0);
    b.zone(AIRPORT, 6, TileBehavior::Airport, DESC_AIRPORT, 0);
    b.zone(POWERPLANT, 4, TileBehavior::Coal, DESC_COAL, 0);
    b.each(PORTBASE, LASTPOWERPLANT, |t| t.pollution = Some(100));

    b.zone(FIRESTATION, 3, TileBehavior::FireStation, DESC_FIRE_DEPT, 0);
    b.zone(POLICESTATION, 3, TileBehavior::PoliceStation, DESC_POLICE_DEPT, 0);
    b.zone(STADIUM, 4, TileBehavior::StadiumEmpty, DESC_STADIUM, 0);
    b.zone(FULLSTADIUM, 4, TileBehavior::StadiumFull, DESC_STADIUM, 0);
    b.zone(NUCLEAR, 4, TileBehavior::Nuclear, DESC_NUCLEAR, 0);
}

fn build_animations(b: &mut Builder) {
    b.each(HBRDG0, HBRDG3, |t| {
        t.overwater = true;
        t.description = Some(DESC_DRAW_BRIDGE);
    });
    b.each(VBRDG0, VBRDG3, |t| {
        t.overwater = true;
        t.description = Some(DESC_DRAW_BRIDGE);
    });

    b.powered_member(RADTOWER, AIRPORT, (1, -1), RADAR0, 8);
    b.each(RADAR0, LASTRADAR, |t| t.description = Some(DESC_RADAR));

    b.powered_member(COALBASE + 2, POWERPLANT, (1, -1), COALSMOKE1, 4);
    b.powered_member(COALBASE + 3, POWERPLANT, (2, -1), COALSMOKE2, 4);
    b.powered_member(COALBASE + 6, POWERPLANT, (1, 0), COALSMOKE3, 4);
    b.powered_member(COALBASE + 7, POWERPLANT, (2, 0), COALSMOKE4, 4);

    b.powered_member(NUCLEARBASE + 2, NUCLEAR, (1, -1), NUCLEAR_SWIRL, 4);

    b.cycle(FOUNTAIN, 4, 1);
    b.each(FOUNTAIN, LASTFOUNTAIN, |t| {
        t.bulldozable = true;
        t.burnable = true;
        t.description = Some(DESC_FOUNTAIN);
    });

    for (first, offset) in [(FOOTBALLGAME1, (1, 0)), (FOOTBALLGAME2, (1, 1))] {
        b.cycle(first, 8, 1);
        b.each(first, first + 7, |t| {
            t.owner = Some(FULLSTADIUM);
            t.owner_offset = offset;
            t.burnable = true;
            t.conductive = true;
            t.description = Some(DESC_STADIUM);
        });
    }

    // Explosion debris burns out into rubble via the map scan.
    for n in TINYEXP..LASTTINYEXP {
        b.tile(n).anim_next = Some(n + 1);
    }
    b.each(TINYEXP, LASTTINYEXP, |t| {
        t.bulldozable = true;
        t.description = Some(DESC_RUBBLE);
    });
    b.tile(LASTTINYEXP).behavior = Some(TileBehavior::Explosion);
}
