//! Zone traffic generation: a short random drive along roads and rail from a
//! zone's perimeter, looking for the kind of zone its residents need.

use crate::grid::{GridPos, TileMap};
use crate::map_scan::CityScan;
use crate::sim_rng::SimRng;
use crate::sprites::Sprites;
use crate::sub_maps::DensityMaps;
use crate::tile_constants::{
    COMBASE, LASTPOWER, LASTRAIL, LHTHR, LOMASK, NUCLEAR, PORT, POWERBASE, ROADBASE,
};

/// Longest drive attempted, in steps.
const MAX_TRAFFIC_DISTANCE: i32 = 30;

/// The 12 cells bordering a 3×3 zone, clockwise from the top-left.
const PERIMETER: [(i32, i32); 12] = [
    (-1, -2),
    (0, -2),
    (1, -2),
    (2, -1),
    (2, 0),
    (2, 1),
    (1, 2),
    (0, 2),
    (-1, 2),
    (-2, 1),
    (-2, 0),
    (-2, -1),
];

const DX: [i32; 4] = [0, 1, 0, -1];
const DY: [i32; 4] = [-1, 0, 1, 0];

/// Traffic density added per trip checkpoint.
const TRIP_WEIGHT: i32 = 50;
const SOFT_CAP: i32 = 240;
const HARD_CAP: i32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneType {
    Residential,
    Commercial,
    Industrial,
}

impl ZoneType {
    /// Tile range a trip from this zone type is happy to end next to.
    fn destination(self) -> std::ops::RangeInclusive<u16> {
        match self {
            ZoneType::Residential => COMBASE..=NUCLEAR,
            ZoneType::Commercial => LHTHR..=PORT,
            ZoneType::Industrial => LHTHR..=COMBASE,
        }
    }
}

/// Outcome of a traffic attempt. Zone growth treats "no road" and "road but
/// nowhere to go" differently, so this stays three-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficResult {
    NoRoad,
    Failed,
    Reached,
}

impl TrafficResult {
    /// The classic -1 / 0 / 1 encoding.
    pub fn value(self) -> i32 {
        match self {
            TrafficResult::NoRoad => -1,
            TrafficResult::Failed => 0,
            TrafficResult::Reached => 1,
        }
    }
}

/// Roads and rail, but not bare power lines.
pub fn is_drivable(map: &TileMap, x: i32, y: i32) -> bool {
    let Some(cell) = map.get(x, y) else {
        return false;
    };
    let c = cell & LOMASK;
    (ROADBASE..=LASTRAIL).contains(&c) && (c < POWERBASE || c >= LASTPOWER)
}

/// First drivable cell on the perimeter of the zone centred at `(x, y)`.
pub fn find_perimeter_road(map: &TileMap, x: i32, y: i32) -> Option<GridPos> {
    PERIMETER
        .iter()
        .map(|&(dx, dy)| GridPos::new(x + dx, y + dy))
        .find(|p| is_drivable(map, p.x, p.y))
}

struct Drive<'a> {
    map: &'a TileMap,
    pos: GridPos,
    last_dir: usize,
    checkpoints: Vec<GridPos>,
}

impl Drive<'_> {
    fn try_go(&mut self, rng: &mut SimRng, step: i32) -> bool {
        let start = rng.next_int(4) as usize;
        for d in start..start + 4 {
            let dir = d % 4;
            if dir == self.last_dir {
                continue;
            }
            let next = self.pos.offset(DX[dir], DY[dir]);
            if is_drivable(self.map, next.x, next.y) {
                self.pos = next;
                self.last_dir = (dir + 2) % 4;
                if step % 2 != 0 {
                    self.checkpoints.push(next);
                }
                return true;
            }
        }
        false
    }

    fn done(&self, zone: ZoneType) -> bool {
        let wanted = zone.destination();
        let GridPos { x, y } = self.pos;
        [(x, y - 1), (x + 1, y), (x, y + 1), (x - 1, y)]
            .into_iter()
            .filter(|&(nx, ny)| self.map.in_bounds(nx, ny))
            .any(|(nx, ny)| wanted.contains(&self.map.tile(nx, ny)))
    }
}

/// Drive from `start` looking for a destination. On success returns the
/// checkpoints dropped every other step.
pub fn try_drive(
    map: &TileMap,
    rng: &mut SimRng,
    start: GridPos,
    zone: ZoneType,
) -> Option<Vec<GridPos>> {
    let mut drive = Drive {
        map,
        pos: start,
        // no reverse to avoid yet
        last_dir: 5,
        checkpoints: Vec::new(),
    };
    let mut step = 0;
    while step < MAX_TRAFFIC_DISTANCE {
        if drive.try_go(rng, step) {
            if drive.done(zone) {
                return Some(drive.checkpoints);
            }
        } else if drive.checkpoints.pop().is_some() {
            // dead end: back up, and it costs extra distance
            step += 3;
        } else {
            return None;
        }
        step += 1;
    }
    None
}

/// Bump traffic density at a road cell. Past the soft cap a 1-in-6 roll
/// pins it at 240 and calls the traffic helicopter over.
pub fn add_traffic(
    density: &mut DensityMaps,
    sprites: &mut Sprites,
    rng: &mut SimRng,
    x: i32,
    y: i32,
) {
    let mut z = density.traffic.get_world(x, y) + TRIP_WEIGHT;
    if z > SOFT_CAP && rng.chance(6) {
        z = SOFT_CAP;
        sprites.redirect_helicopter(x, y);
    }
    density.traffic.set_world(x, y, z.min(HARD_CAP));
}

/// Generate traffic for the zone centred at `(x, y)`.
pub fn make_traffic(scan: &mut CityScan, x: i32, y: i32, zone: ZoneType) -> TrafficResult {
    let Some(start) = find_perimeter_road(&scan.map, x, y) else {
        return TrafficResult::NoRoad;
    };
    let Some(checkpoints) = try_drive(&scan.map, &mut scan.rng, start, zone) else {
        return TrafficResult::Failed;
    };
    for pos in checkpoints.into_iter().rev() {
        let tile = scan.tile(pos.x, pos.y);
        if (ROADBASE..POWERBASE).contains(&tile) {
            add_traffic(
                &mut scan.density,
                &mut scan.sprites,
                &mut scan.rng,
                pos.x,
                pos.y,
            );
        }
    }
    TrafficResult::Reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_constants::{COMCLR, HPOWER, HRAIL, RESCLR, ROADS};

    fn road_row(map: &mut TileMap, y: i32, x0: i32, x1: i32) {
        for x in x0..=x1 {
            map.set(x, y, ROADS).unwrap();
        }
    }

    #[test]
    fn test_power_lines_are_not_drivable() {
        let mut map = TileMap::new(16, 16);
        map.set(1, 1, HPOWER).unwrap();
        map.set(2, 1, HRAIL).unwrap();
        map.set(3, 1, ROADS).unwrap();
        assert!(!is_drivable(&map, 1, 1));
        assert!(is_drivable(&map, 2, 1));
        assert!(is_drivable(&map, 3, 1));
        assert!(!is_drivable(&map, -1, 1));
    }

    #[test]
    fn test_no_perimeter_road() {
        let map = TileMap::new(16, 16);
        assert_eq!(find_perimeter_road(&map, 8, 8), None);
    }

    #[test]
    fn test_perimeter_scan_order() {
        let mut map = TileMap::new(16, 16);
        map.set(10, 8, ROADS).unwrap();
        map.set(9, 6, ROADS).unwrap();
        // (9, 6) is (+1, -2): third in the ring, before (+2, 0)
        assert_eq!(find_perimeter_road(&map, 8, 8), Some(GridPos::new(9, 6)));
    }

    #[test]
    fn test_drive_reaches_commercial_zone() {
        let mut map = TileMap::new(32, 16);
        road_row(&mut map, 5, 4, 20);
        map.set(21, 5, COMCLR).unwrap();
        let mut rng = SimRng::from_seed_u64(7);
        // a straight road only ever continues forward
        let trip = try_drive(&map, &mut rng, GridPos::new(4, 5), ZoneType::Residential);
        let checkpoints = trip.expect("road leads to commerce");
        assert!(!checkpoints.is_empty());
        assert!(checkpoints.iter().all(|p| p.y == 5));
    }

    #[test]
    fn test_drive_fails_without_destination() {
        let mut map = TileMap::new(32, 16);
        road_row(&mut map, 5, 4, 8);
        map.set(2, 4, RESCLR).unwrap();
        let mut rng = SimRng::from_seed_u64(3);
        assert_eq!(
            try_drive(&map, &mut rng, GridPos::new(4, 5), ZoneType::Residential),
            None
        );
    }

    #[test]
    fn test_add_traffic_caps() {
        let mut density = DensityMaps::new(16, 16);
        let mut sprites = Sprites::default();
        let mut rng = SimRng::from_seed_u64(1);
        add_traffic(&mut density, &mut sprites, &mut rng, 4, 4);
        assert_eq!(density.traffic_at(4, 4), 50);
        for _ in 0..20 {
            add_traffic(&mut density, &mut sprites, &mut rng, 4, 4);
            assert!(density.traffic_at(4, 4) <= 255);
        }
        assert!(density.traffic_at(4, 4) >= SOFT_CAP);
    }

    #[test]
    fn test_result_encoding() {
        assert_eq!(TrafficResult::NoRoad.value(), -1);
        assert_eq!(TrafficResult::Failed.value(), 0);
        assert_eq!(TrafficResult::Reached.value(), 1);
    }
}
