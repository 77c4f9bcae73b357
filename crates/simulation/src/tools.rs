//! Edit tools.
//!
//! A [`ToolStroke`] describes one drag of a tool across the map. Applying it
//! runs in two steps: the tool writes into a [`ToolPreview`] against a
//! read-through view of the live map, then the preview is committed in one
//! piece (bounds check, funds check, writes, charge). A rejected commit
//! changes nothing.
//!
//! Strokes reach the world through the [`ToolQueue`]; the
//! [`execute_tool_strokes`] system drains it, commits each stroke and keeps
//! the outcome in the [`ToolResultLog`].

mod lay;
mod placement;
mod preview;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::budget::CityBudget;
use crate::config::CityOptions;
use crate::grid::{GridPos, TileMap};
use crate::messages::{CityMessage, CityMessageEvent, CityNotification, CitySoundEvent, Sound};
use crate::sim_rng::SimRng;
use crate::tile_catalog::TileCatalog;
use crate::tile_constants::{
    AIRPORT, COMCLR, FIRESTATION, INDCLR, NUCLEAR, POLICESTATION, PORT, POWERPLANT, RESCLR, STADIUM,
};
use crate::SimulationSet;

pub use preview::{ToolPreview, ToolSound};

use preview::EditBuffer;

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Bulldozer,
    Wire,
    Roads,
    Rail,
    Residential,
    Commercial,
    Industrial,
    FireStation,
    PoliceStation,
    Stadium,
    Park,
    Seaport,
    PowerPlant,
    Nuclear,
    Airport,
    Query,
}

impl Tool {
    pub const ALL: [Tool; 16] = [
        Tool::Bulldozer,
        Tool::Wire,
        Tool::Roads,
        Tool::Rail,
        Tool::Residential,
        Tool::Commercial,
        Tool::Industrial,
        Tool::FireStation,
        Tool::PoliceStation,
        Tool::Stadium,
        Tool::Park,
        Tool::Seaport,
        Tool::PowerPlant,
        Tool::Nuclear,
        Tool::Airport,
        Tool::Query,
    ];

    /// Base cost per placement, before any auto-bulldozing.
    pub fn cost(self) -> i32 {
        match self {
            Tool::Bulldozer => 1,
            Tool::Wire => 5,
            Tool::Roads => 10,
            Tool::Rail => 20,
            Tool::Residential | Tool::Commercial | Tool::Industrial => 100,
            Tool::FireStation | Tool::PoliceStation => 500,
            Tool::Stadium => 5000,
            Tool::Park => 10,
            Tool::Seaport | Tool::PowerPlant => 3000,
            Tool::Nuclear => 5000,
            Tool::Airport => 10000,
            Tool::Query => 0,
        }
    }

    /// Footprint edge length.
    pub fn size(self) -> i32 {
        match self {
            Tool::Residential
            | Tool::Commercial
            | Tool::Industrial
            | Tool::FireStation
            | Tool::PoliceStation => 3,
            Tool::Stadium | Tool::Seaport | Tool::PowerPlant | Tool::Nuclear => 4,
            Tool::Airport => 6,
            _ => 1,
        }
    }

    /// Road, rail and wire: laid along a one-wide line.
    pub fn is_line(self) -> bool {
        matches!(self, Tool::Roads | Tool::Rail | Tool::Wire)
    }

    /// Single buildings that follow the cursor instead of tiling an area.
    pub fn is_building(self) -> bool {
        matches!(
            self,
            Tool::FireStation
                | Tool::PoliceStation
                | Tool::Stadium
                | Tool::Seaport
                | Tool::PowerPlant
                | Tool::Nuclear
                | Tool::Airport
        )
    }

    /// Zone center placed by a footprint tool.
    fn zone_center(self) -> Option<u16> {
        match self {
            Tool::Residential => Some(RESCLR),
            Tool::Commercial => Some(COMCLR),
            Tool::Industrial => Some(INDCLR),
            Tool::FireStation => Some(FIRESTATION),
            Tool::PoliceStation => Some(POLICESTATION),
            Tool::Stadium => Some(STADIUM),
            Tool::Seaport => Some(PORT),
            Tool::PowerPlant => Some(POWERPLANT),
            Tool::Nuclear => Some(NUCLEAR),
            Tool::Airport => Some(AIRPORT),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolResult {
    Success,
    /// Nothing to do.
    None,
    /// Blocked or out of bounds.
    UhOh,
    InsufficientFunds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CityRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

// ---------------------------------------------------------------------------
// ToolStroke
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStroke {
    pub tool: Tool,
    pub x: i32,
    pub y: i32,
    pub dest_x: i32,
    pub dest_y: i32,
}

impl ToolStroke {
    pub fn new(tool: Tool, x: i32, y: i32) -> Self {
        Self {
            tool,
            x,
            y,
            dest_x: x,
            dest_y: y,
        }
    }

    /// A stroke dragged from `(x, y)` to `(dest_x, dest_y)`.
    pub fn line(tool: Tool, x: i32, y: i32, dest_x: i32, dest_y: i32) -> Self {
        let mut stroke = Self::new(tool, x, y);
        stroke.drag_to(dest_x, dest_y);
        stroke
    }

    pub fn drag_to(&mut self, dest_x: i32, dest_y: i32) {
        if self.tool.is_building() {
            self.x = dest_x;
            self.y = dest_y;
        }
        self.dest_x = dest_x;
        self.dest_y = dest_y;
    }

    /// Cells the stroke covers. Footprint tools of size 3 or more are
    /// centered on the cursor and tile the drag in whole footprints.
    pub fn bounds(&self) -> CityRect {
        if self.tool.is_line() {
            let (dx, dy) = (self.dest_x - self.x, self.dest_y - self.y);
            return if dx.abs() >= dy.abs() {
                CityRect {
                    x: self.x.min(self.dest_x),
                    y: self.y,
                    width: dx.abs() + 1,
                    height: 1,
                }
            } else {
                CityRect {
                    x: self.x,
                    y: self.y.min(self.dest_y),
                    width: 1,
                    height: dy.abs() + 1,
                }
            };
        }

        let size = self.tool.size();
        let (x, width) = tile_span(self.x, self.dest_x, size);
        let (y, height) = tile_span(self.y, self.dest_y, size);
        CityRect {
            x,
            y,
            width,
            height,
        }
    }

    /// The stroke's effect without touching the map. Random tiles take
    /// their first choice.
    pub fn preview(&self, map: &TileMap, catalog: &TileCatalog, auto_bulldoze: bool) -> ToolPreview {
        self.build(map, catalog, auto_bulldoze, None)
    }

    /// Build and commit in one step.
    pub fn apply(
        &self,
        map: &mut TileMap,
        catalog: &TileCatalog,
        rng: &mut SimRng,
        auto_bulldoze: bool,
        budget: &mut CityBudget,
    ) -> ToolResult {
        let preview = self.build(map, catalog, auto_bulldoze, Some(rng));
        preview.commit(map, budget)
    }

    pub(crate) fn build(
        &self,
        map: &TileMap,
        catalog: &TileCatalog,
        auto_bulldoze: bool,
        rng: Option<&mut SimRng>,
    ) -> ToolPreview {
        let mut eff = EditBuffer::new(map, catalog, auto_bulldoze, rng);
        let bounds = self.bounds();
        match self.tool {
            Tool::Query => {}
            Tool::Bulldozer => placement::apply_bulldozer(&mut eff, bounds),
            tool if tool.is_line() => lay::apply_line(&mut eff, tool, bounds),
            tool => self.apply_area(&mut eff, tool, bounds),
        }
        eff.finish()
    }

    fn apply_area(&self, eff: &mut EditBuffer, tool: Tool, b: CityRect) {
        let size = tool.size() as usize;
        for i in (0..b.height).step_by(size) {
            for j in (0..b.width).step_by(size) {
                eff.shifted(b.x + j, b.y + i, |eff| match tool.zone_center() {
                    Some(center) => placement::apply_zone(eff, center, tool.cost()),
                    None => placement::apply_park(eff, tool.cost()),
                });
            }
        }
    }
}

/// Start and length along one axis for a footprint tool.
fn tile_span(pos: i32, dest: i32, size: i32) -> (i32, i32) {
    let mut start = if size >= 3 { pos - 1 } else { pos };
    let len = ((dest - pos).abs() / size + 1) * size;
    if dest < pos {
        start += size - len;
    }
    (start, len)
}

// ---------------------------------------------------------------------------
// Queue and log
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Default)]
pub struct ToolQueue {
    pending: Vec<ToolStroke>,
}

impl ToolQueue {
    pub fn push(&mut self, stroke: ToolStroke) {
        self.pending.push(stroke);
    }

    pub fn drain(&mut self) -> Vec<ToolStroke> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

const MAX_LOG_ENTRIES: usize = 64;

/// The last 64 committed strokes and their results.
#[derive(Resource, Debug, Clone, Default)]
pub struct ToolResultLog {
    entries: Vec<(ToolStroke, ToolResult)>,
}

impl ToolResultLog {
    pub fn push(&mut self, stroke: ToolStroke, result: ToolResult) {
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.remove(0);
        }
        self.entries.push((stroke, result));
    }

    pub fn last(&self) -> Option<&(ToolStroke, ToolResult)> {
        self.entries.last()
    }

    pub fn last_n(&self, n: usize) -> &[(ToolStroke, ToolResult)] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

#[derive(bevy::ecs::system::SystemParam)]
pub struct ToolCommit<'w> {
    map: ResMut<'w, TileMap>,
    catalog: Res<'w, TileCatalog>,
    rng: ResMut<'w, SimRng>,
    options: Res<'w, CityOptions>,
    budget: ResMut<'w, CityBudget>,
    messages: EventWriter<'w, CityMessageEvent>,
    sounds: EventWriter<'w, CitySoundEvent>,
    notify: EventWriter<'w, CityNotification>,
}

impl ToolCommit<'_> {
    fn run(&mut self, stroke: &ToolStroke) -> ToolResult {
        let preview = stroke.build(
            &self.map,
            &self.catalog,
            self.options.auto_bulldoze,
            Some(&mut *self.rng),
        );
        let result = preview.commit(&mut self.map, &mut self.budget);
        let at = GridPos::new(stroke.x, stroke.y);

        match result {
            ToolResult::Success | ToolResult::None => {
                for (pos, _) in preview.writes() {
                    self.notify.send(CityNotification::TileChanged(pos));
                }
                for s in preview.sounds() {
                    self.sounds.send(CitySoundEvent {
                        sound: s.sound,
                        location: s.pos,
                    });
                }
                if result == ToolResult::Success {
                    self.notify.send(CityNotification::FundsChanged);
                    let sound = if stroke.tool == Tool::Bulldozer {
                        Sound::Bulldoze
                    } else {
                        Sound::Build
                    };
                    self.sounds.send(CitySoundEvent {
                        sound,
                        location: at,
                    });
                }
            }
            ToolResult::UhOh => {
                debug!("{:?} at ({}, {}) blocked", stroke.tool, stroke.x, stroke.y);
                self.messages.send(CityMessageEvent {
                    message: CityMessage::BulldozeFirst,
                    location: Some(at),
                });
                self.sounds.send(CitySoundEvent {
                    sound: Sound::UhUh,
                    location: at,
                });
            }
            ToolResult::InsufficientFunds => {
                debug!(
                    "{:?} at ({}, {}) needs {} funds, have {}",
                    stroke.tool,
                    stroke.x,
                    stroke.y,
                    preview.cost(),
                    self.budget.total_funds
                );
                self.messages.send(CityMessageEvent {
                    message: CityMessage::InsufficientFunds,
                    location: Some(at),
                });
                self.sounds.send(CitySoundEvent {
                    sound: Sound::Sorry,
                    location: at,
                });
            }
        }
        result
    }
}

/// Drains the queue and commits every stroke in order.
pub fn execute_tool_strokes(
    mut queue: ResMut<ToolQueue>,
    mut log: ResMut<ToolResultLog>,
    mut commit: ToolCommit,
) {
    for stroke in queue.drain() {
        let result = commit.run(&stroke);
        log.push(stroke, result);
    }
}

pub struct ToolsPlugin;

impl Plugin for ToolsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ToolQueue>()
            .init_resource::<ToolResultLog>()
            .add_systems(
                FixedUpdate,
                execute_tool_strokes.in_set(SimulationSet::PreSim),
            );
    }
}
