//! # Generation Module
//!
//! Map sources: anything that can produce a terrain grid and, optionally, an NPC
//! roster for a [`GameWorld`](crate::GameWorld).
//!
//! The built-in [`DefaultMaze`] is the map a server starts with when no terrain
//! file is given. Saved terrain files are a second source, see
//! [`TerrainFile`](crate::TerrainFile).

use crate::{config, Grid, Npc, Position, TacticaError, TacticaResult, TerrainCell};
use std::collections::HashSet;

/// A playable map.
#[derive(Debug, Clone)]
pub struct GameMap {
    pub grid: Grid,
    /// NPC roster. `None` keeps the current NPCs when the map is swapped in.
    pub npcs: Option<Vec<Npc>>,
}

impl GameMap {
    /// An open map without terrain and with an empty NPC roster.
    ///
    /// # Examples
    ///
    /// ```
    /// use tactica::{GameMap, Position};
    ///
    /// let map = GameMap::empty(10, 8);
    /// assert!(map.grid.in_bounds(Position::new(9, 7)));
    /// assert!(map.grid.cells().is_empty());
    /// ```
    pub fn empty(width: i32, height: i32) -> Self {
        Self {
            grid: Grid::new(width, height),
            npcs: Some(Vec::new()),
        }
    }
}

/// Common interface of map sources.
pub trait MapSource {
    /// Produces the map.
    fn build(&self) -> TacticaResult<GameMap>;

    /// Short name used in log lines.
    fn source_name(&self) -> String;

    /// Checks a built map: size between 1x1 and the configured maximum, unique NPC
    /// ids, and every NPC alone on an in-bounds cell that does not block movement.
    fn validate(&self, map: &GameMap) -> TacticaResult<()> {
        let (width, height) = (map.grid.width, map.grid.height);
        if width <= 0 || height <= 0 {
            return Err(TacticaError::MapLoad(format!(
                "{}: grid must be at least 1x1, got {}x{}",
                self.source_name(),
                width,
                height
            )));
        }
        if width > config::MAX_GRID_DIMENSION || height > config::MAX_GRID_DIMENSION {
            return Err(TacticaError::MapLoad(format!(
                "{}: grid {}x{} exceeds the {} tile limit per side",
                self.source_name(),
                width,
                height,
                config::MAX_GRID_DIMENSION
            )));
        }

        let mut seen = HashSet::new();
        let mut occupied = HashSet::new();
        for npc in map.npcs.iter().flatten() {
            if !seen.insert(npc.id.as_str()) {
                return Err(TacticaError::MapLoad(format!(
                    "{}: duplicate NPC id {}",
                    self.source_name(),
                    npc.id
                )));
            }
            if !occupied.insert(npc.position) {
                return Err(TacticaError::MapLoad(format!(
                    "{}: NPC {} shares ({}, {}) with another NPC",
                    self.source_name(),
                    npc.id,
                    npc.position.x,
                    npc.position.y
                )));
            }
            if !map.grid.in_bounds(npc.position) || map.grid.blocks_movement(npc.position) {
                return Err(TacticaError::MapLoad(format!(
                    "{}: NPC {} stands on an unusable cell ({}, {})",
                    self.source_name(),
                    npc.id,
                    npc.position.x,
                    npc.position.y
                )));
            }
        }
        Ok(())
    }

    /// Builds and validates the map.
    fn load(&self) -> TacticaResult<GameMap> {
        let map = self.build()?;
        self.validate(&map)?;
        log::debug!(
            "Built map '{}' ({}x{}, {} terrain cells)",
            self.source_name(),
            map.grid.width,
            map.grid.height,
            map.grid.cells().len()
        );
        Ok(map)
    }
}

/// The built-in 25x25 maze with four rats.
///
/// A tree border encloses three vertical and two horizontal walls with corridor
/// gaps, plus a few bushes and lone trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMaze;

impl DefaultMaze {
    fn terrain() -> Vec<TerrainCell> {
        let (w, h) = (config::DEFAULT_GRID_WIDTH, config::DEFAULT_GRID_HEIGHT);
        let mut cells = Vec::new();
        let mut put = |x: i32, y: i32, kind: &str, blocks_vision: bool| {
            cells.push(TerrainCell::new(Position::new(x, y), kind, blocks_vision));
        };

        for x in 0..w {
            put(x, 0, "tree", true);
            put(x, h - 1, "tree", true);
        }
        for y in 1..h - 1 {
            put(0, y, "tree", true);
            put(w - 1, y, "tree", true);
        }

        for y in 2..23 {
            if y != 7 && y != 11 {
                put(6, y, "rock", true);
            }
            if y != 5 && y != 8 && y != 15 {
                put(12, y, "tree", true);
            }
            if y != 12 {
                put(18, y, "rock", true);
            }
        }
        for x in 2..23 {
            if x != 12 {
                put(x, 8, "tree", true);
            }
            if x != 18 {
                put(x, 16, "rock", true);
            }
        }

        for (x, y) in [(3, 12), (4, 12), (20, 3), (21, 3), (10, 20), (11, 20)] {
            put(x, y, "bush", false);
        }
        put(16, 5, "tree", true);
        put(7, 19, "tree", true);
        cells
    }

    fn npcs() -> Vec<Npc> {
        [("npc1", 11, 3), ("npc2", 13, 23), ("npc3", 20, 12), ("npc4", 5, 17)]
            .into_iter()
            .map(|(id, x, y)| Npc::hostile(id, Position::new(x, y)))
            .collect()
    }
}

impl MapSource for DefaultMaze {
    fn build(&self) -> TacticaResult<GameMap> {
        Ok(GameMap {
            grid: Grid::with_cells(
                config::DEFAULT_GRID_WIDTH,
                config::DEFAULT_GRID_HEIGHT,
                Self::terrain(),
            ),
            npcs: Some(Self::npcs()),
        })
    }

    fn source_name(&self) -> String {
        "default maze".to_string()
    }
}
