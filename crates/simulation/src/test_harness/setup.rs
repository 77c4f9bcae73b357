//! Builder methods for laying out tiles, networks and zones.

use crate::grid::TileMap;
use crate::tools::{Tool, ToolResult, ToolStroke};

use super::TestCity;

impl TestCity {
    // -----------------------------------------------------------------------
    // Money and options
    // -----------------------------------------------------------------------

    pub fn with_funds(mut self, funds: i32) -> Self {
        self.city.set_funds(funds);
        self
    }

    pub fn with_tax_rate(mut self, rate: i32) -> Self {
        self.city.set_tax_rate(rate);
        self
    }

    pub fn with_auto_budget(mut self, on: bool) -> Self {
        self.city.set_auto_budget(on);
        self
    }

    // -----------------------------------------------------------------------
    // Map edits
    // -----------------------------------------------------------------------

    /// Write a tile straight into the map, bypassing tools and costs.
    pub fn with_tile(mut self, x: i32, y: i32, tile: u16) -> Self {
        let result = self
            .city
            .world_mut()
            .resource_mut::<TileMap>()
            .set(x, y, tile);
        if let Err(e) = result {
            panic!("with_tile({x}, {y}): {e}");
        }
        self
    }

    /// Fill a rectangle with one tile, bypassing tools and costs.
    pub fn with_tile_rect(mut self, x: i32, y: i32, w: i32, h: i32, tile: u16) -> Self {
        for yy in y..y + h {
            for xx in x..x + w {
                self = self.with_tile(xx, yy, tile);
            }
        }
        self
    }

    /// Apply a single-position tool and require it to succeed.
    pub fn with_tool(mut self, tool: Tool, x: i32, y: i32) -> Self {
        let result = self.city.apply_tool(ToolStroke::new(tool, x, y));
        assert_eq!(
            result,
            ToolResult::Success,
            "Expected {tool:?} at ({x}, {y}) to succeed, got {result:?}"
        );
        self
    }

    /// Drag a line tool from one point to another and require success.
    pub fn with_line(mut self, tool: Tool, x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let result = self
            .city
            .apply_tool(ToolStroke::line(tool, x0, y0, x1, y1));
        assert_eq!(
            result,
            ToolResult::Success,
            "Expected {tool:?} line ({x0}, {y0})-({x1}, {y1}) to succeed, got {result:?}"
        );
        self
    }

    pub fn with_road(self, x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        self.with_line(Tool::Roads, x0, y0, x1, y1)
    }

    pub fn with_wire(self, x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        self.with_line(Tool::Wire, x0, y0, x1, y1)
    }

    /// A coal plant wired east to a row of zones that share a road along
    /// their southern edge. Occupies x 4..=24, y 4..=7.
    pub fn with_starter_town(self) -> Self {
        self.with_tool(Tool::PowerPlant, 5, 5)
            .with_wire(8, 5, 10, 5)
            .with_tool(Tool::Residential, 12, 5)
            .with_tool(Tool::Residential, 15, 5)
            .with_tool(Tool::Commercial, 18, 5)
            .with_tool(Tool::Industrial, 21, 5)
            .with_road(10, 7, 24, 7)
    }
}
