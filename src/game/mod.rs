//! # Game Module
//!
//! Core game state, grid representation, entities and the battle machinery.
//!
//! This module contains the fundamental building blocks of the engine:
//! - Grid and terrain representation
//! - Player and NPC entities and their registry
//! - The turn scheduler and action resolver, both implemented on [`GameWorld`]
//! - Versioned wire events produced by every state change

pub mod actions;
pub mod ai;
pub mod battle;
pub mod entities;
pub mod events;
pub mod registry;
pub mod rules;
pub mod state;
pub mod timers;
pub mod world;

pub use ai::NpcTurnOutcome;
pub use battle::*;
pub use entities::*;
pub use events::*;
pub use registry::*;
pub use rules::*;
pub use state::*;
pub use timers::*;
pub use world::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a 2D coordinate on the grid.
///
/// # Examples
///
/// ```
/// use tactica::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// let adjacent = pos.cardinal_adjacent_positions();
/// assert_eq!(adjacent.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use tactica::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Calculates the Euclidean distance to another position.
    pub fn euclidean_distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Calculates the Chebyshev (king-move) distance to another position.
    ///
    /// Weapon reach and NPC target selection are measured with this metric.
    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Returns the 4 orthogonal neighbours in search order: east, west, south, north.
    ///
    /// The order matters: the pathfinder and the NPC target picker both break ties
    /// by the first candidate found.
    pub fn cardinal_adjacent_positions(self) -> [Position; 4] {
        [
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y),
            Position::new(self.x, self.y + 1),
            Position::new(self.x, self.y - 1),
        ]
    }
}

/// Connection-scoped identifier of a player.
pub type PlayerId = Uuid;

/// Static identifier of an NPC, taken from the map roster.
pub type NpcId = String;

/// Creates a new unique player ID.
pub fn new_player_id() -> PlayerId {
    Uuid::new_v4()
}
