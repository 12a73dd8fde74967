//! # Utilities Module
//!
//! Grid search used by movement and the NPC AI.

pub mod pathfinding;

pub use pathfinding::*;
