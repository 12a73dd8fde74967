//! # Terrain Files
//!
//! Maps saved by the map editor, one per file as `<sanitized name>.json`:
//!
//! ```json
//! {
//!   "gridWidth": 3,
//!   "gridHeight": 1,
//!   "terrain": [
//!     { "terrain": { "sprite": "rock", "properties": { "blockingVision": true } }, "background": "grass" },
//!     { "terrain": null, "background": "grass" },
//!     { "terrain": null, "background": null }
//!   ],
//!   "npcs": [ { "id": "npc1", "x": 2, "y": 0 } ]
//! }
//! ```
//!
//! `terrain` is row-major with exactly `gridWidth * gridHeight` slots. Older files
//! list placed cells instead (`{"x":..,"y":..,"type":..,"blocksVision":..}`); both
//! layouts load. `npcs` is optional and replaces the roster when present.

use super::sanitize_file_stem;
use crate::{
    config, GameMap, Grid, MapSource, Npc, Position, TacticaError, TacticaResult, TerrainCell,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileProperties {
    #[serde(default)]
    pub blocking_vision: bool,
    #[serde(default = "default_true")]
    pub blocking_movement: bool,
}

/// The object placed in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTile {
    pub sprite: String,
    #[serde(default)]
    pub properties: TileProperties,
}

/// One grid slot: an optional blocking object over a cosmetic background.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSlot {
    #[serde(default)]
    pub terrain: Option<TerrainTile>,
    #[serde(default)]
    pub background: Option<String>,
}

/// A terrain cell listed with explicit coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedTile {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub blocks_vision: bool,
    #[serde(default = "default_true")]
    pub blocks_movement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TerrainEntry {
    Placed(PlacedTile),
    Slot(TerrainSlot),
}

/// On-disk map format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainFile {
    pub grid_width: i32,
    pub grid_height: i32,
    #[serde(default)]
    pub terrain: Vec<TerrainEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npcs: Option<Vec<Npc>>,
}

impl TerrainFile {
    /// Builds the file for a grid in the slot layout.
    pub fn from_grid(grid: &Grid, npcs: Option<Vec<Npc>>) -> Self {
        let mut terrain = Vec::new();
        for y in 0..grid.height {
            for x in 0..grid.width {
                let tile = grid.terrain_at(Position::new(x, y)).map(|cell| TerrainTile {
                    sprite: cell.kind.clone(),
                    properties: TileProperties {
                        blocking_vision: cell.blocks_vision,
                        blocking_movement: cell.blocks_movement,
                    },
                });
                terrain.push(TerrainEntry::Slot(TerrainSlot {
                    terrain: tile,
                    background: None,
                }));
            }
        }
        Self {
            grid_width: grid.width,
            grid_height: grid.height,
            terrain,
            npcs,
        }
    }

    fn cells(&self) -> TacticaResult<Vec<TerrainCell>> {
        let width = self.grid_width;
        // Only a non-empty list of placed cells is read as the placed layout
        let slotted = self.terrain.is_empty()
            || self
                .terrain
                .iter()
                .any(|entry| matches!(entry, TerrainEntry::Slot(_)));
        let expected = i64::from(self.grid_width) * i64::from(self.grid_height);
        if slotted && i64::try_from(self.terrain.len()).ok() != Some(expected) {
            return Err(TacticaError::MapLoad(format!(
                "expected {} terrain slots for a {}x{} grid, found {}",
                expected,
                self.grid_width,
                self.grid_height,
                self.terrain.len()
            )));
        }

        let mut cells = Vec::new();
        for (index, entry) in self.terrain.iter().enumerate() {
            match entry {
                TerrainEntry::Slot(slot) => {
                    let Some(tile) = &slot.terrain else {
                        continue;
                    };
                    let index = i32::try_from(index)
                        .map_err(|_| TacticaError::MapLoad("terrain too large".to_string()))?;
                    let mut cell = TerrainCell::new(
                        Position::new(index % width, index / width),
                        tile.sprite.clone(),
                        tile.properties.blocking_vision,
                    );
                    cell.blocks_movement = tile.properties.blocking_movement;
                    cells.push(cell);
                }
                TerrainEntry::Placed(placed) => {
                    let mut cell = TerrainCell::new(
                        Position::new(placed.x, placed.y),
                        placed.kind.clone(),
                        placed.blocks_vision,
                    );
                    cell.blocks_movement = placed.blocks_movement;
                    cells.push(cell);
                }
            }
        }
        Ok(cells)
    }
}

impl MapSource for TerrainFile {
    fn build(&self) -> TacticaResult<GameMap> {
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(TacticaError::MapLoad(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        // Checked before the grid is allocated
        if self.grid_width > config::MAX_GRID_DIMENSION
            || self.grid_height > config::MAX_GRID_DIMENSION
        {
            return Err(TacticaError::MapLoad(format!(
                "grid {}x{} exceeds the {} cell side limit",
                self.grid_width,
                self.grid_height,
                config::MAX_GRID_DIMENSION
            )));
        }
        let cells = self.cells()?;
        let grid = Grid::new(self.grid_width, self.grid_height);
        if let Some(cell) = cells.iter().find(|c| !grid.in_bounds(c.position())) {
            return Err(TacticaError::MapLoad(format!(
                "terrain cell ({}, {}) lies outside the grid",
                cell.x, cell.y
            )));
        }
        Ok(GameMap {
            grid: Grid::with_cells(self.grid_width, self.grid_height, cells),
            npcs: self.npcs.clone(),
        })
    }

    fn source_name(&self) -> String {
        format!("terrain file {}x{}", self.grid_width, self.grid_height)
    }
}

/// Directory of terrain files.
#[derive(Debug, Clone)]
pub struct TerrainStore {
    dir: PathBuf,
}

impl TerrainStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> TacticaResult<PathBuf> {
        let stem = sanitize_file_stem(name);
        if stem.is_empty() {
            return Err(TacticaError::MapLoad(format!(
                "invalid terrain name {:?}",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.json", stem)))
    }

    /// Reads a terrain file by name.
    pub fn load(&self, name: &str) -> TacticaResult<TerrainFile> {
        let path = self.path_for(name)?;
        debug!("Reading terrain file {}", path.display());
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reads a terrain file and turns it into a validated map.
    pub fn load_map(&self, name: &str) -> TacticaResult<GameMap> {
        self.load(name)?.load()
    }

    /// Writes a terrain file, replacing any file with the same name.
    pub fn save(&self, name: &str, file: &TerrainFile) -> TacticaResult<PathBuf> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(file)?)?;
        debug!("Saved terrain file {}", path.display());
        Ok(path)
    }
}
