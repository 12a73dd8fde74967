//! # World Module
//!
//! Static terrain of the loaded map.
//!
//! Terrain never changes during play; a travel event swaps the whole grid.
//! Occupancy by players and NPCs is layered on top by
//! [`GameWorld::is_blocked`](crate::GameWorld::is_blocked).

use crate::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A populated terrain cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainCell {
    pub x: i32,
    pub y: i32,
    /// Material or sprite tag, e.g. `tree`, `rock`, `bush`
    #[serde(rename = "type")]
    pub kind: String,
    pub blocks_vision: bool,
    pub blocks_movement: bool,
}

impl TerrainCell {
    /// Creates a cell that blocks movement.
    pub fn new(position: Position, kind: impl Into<String>, blocks_vision: bool) -> Self {
        Self {
            x: position.x,
            y: position.y,
            kind: kind.into(),
            blocks_vision,
            blocks_movement: true,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Bounded terrain grid. Cells absent from the terrain list are open ground.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    /// Cells in load order, kept for snapshots
    cells: Vec<TerrainCell>,
    index: HashMap<Position, usize>,
}

impl Grid {
    /// Creates an empty grid.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a grid from terrain cells. A later cell at the same position replaces
    /// an earlier one, keeping positions unique.
    pub fn with_cells(width: i32, height: i32, cells: impl IntoIterator<Item = TerrainCell>) -> Self {
        let mut grid = Self::new(width, height);
        for cell in cells {
            grid.set_cell(cell);
        }
        grid
    }

    /// Places a terrain cell, replacing any cell already at its position.
    pub fn set_cell(&mut self, cell: TerrainCell) {
        match self.index.get(&cell.position()) {
            Some(&slot) => self.cells[slot] = cell,
            None => {
                self.index.insert(cell.position(), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Checks whether a position lies inside the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Gets the terrain cell at a position, if any.
    pub fn terrain_at(&self, pos: Position) -> Option<&TerrainCell> {
        self.index.get(&pos).map(|&slot| &self.cells[slot])
    }

    /// Checks whether terrain alone blocks movement into a position.
    pub fn blocks_movement(&self, pos: Position) -> bool {
        self.terrain_at(pos).is_some_and(|cell| cell.blocks_movement)
    }

    /// All terrain cells in load order.
    pub fn cells(&self) -> &[TerrainCell] {
        &self.cells
    }
}
