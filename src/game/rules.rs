//! # Rules Configuration
//!
//! Tunable numbers of the battle rules, loadable from a JSON file.

use crate::config;
use crate::utils::Heuristic;
use crate::{Position, TacticaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Rule set used by a [`GameWorld`](crate::GameWorld).
///
/// Every field falls back to the matching constant in [`crate::config`] when it is
/// missing from a loaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Action points a player gets when its battle turn starts
    pub player_turn_points: i32,
    /// Action points an NPC gets when its battle turn starts
    pub npc_turn_points: i32,
    /// Action points of a freshly admitted player
    pub player_starting_points: i32,
    /// Cost of one attack
    pub attack_cost: i32,
    /// Hostile NPCs closer than this (Euclidean) engage the player
    pub aggro_distance: f64,
    /// Delay between two steps of a player move, in milliseconds
    pub move_step_interval_ms: u64,
    /// Delay between two NPC actions, in milliseconds
    pub npc_action_interval_ms: u64,
    /// Health of a freshly admitted player
    pub player_health: i32,
    /// Preferred spawn cell
    pub spawn: Position,
    /// Weapon reach given to new players
    pub weapon_range: i32,
    /// Weapon attack given to new players
    pub weapon_attack: i32,
    /// Heuristic used by the pathfinder
    pub heuristic: Heuristic,
}

impl GameConfig {
    /// Creates the standard rule set.
    pub fn new() -> Self {
        Self {
            player_turn_points: config::PLAYER_TURN_POINTS,
            npc_turn_points: config::NPC_TURN_POINTS,
            player_starting_points: config::PLAYER_STARTING_POINTS,
            attack_cost: config::ATTACK_COST,
            aggro_distance: config::AGGRO_DISTANCE,
            move_step_interval_ms: config::MOVE_STEP_INTERVAL_MS,
            npc_action_interval_ms: config::NPC_ACTION_INTERVAL_MS,
            player_health: config::DEFAULT_PLAYER_HEALTH,
            spawn: Position::new(config::DEFAULT_SPAWN.0, config::DEFAULT_SPAWN.1),
            weapon_range: config::DEFAULT_WEAPON_RANGE,
            weapon_attack: config::DEFAULT_WEAPON_ATTACK,
            heuristic: Heuristic::default(),
        }
    }

    /// Creates a rule set for tests: standard numbers with the Chebyshev heuristic.
    pub fn for_testing() -> Self {
        Self {
            heuristic: Heuristic::Chebyshev,
            ..Self::new()
        }
    }

    /// Loads a rule set from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> TacticaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn move_step_interval(&self) -> Duration {
        Duration::from_millis(self.move_step_interval_ms)
    }

    pub fn npc_action_interval(&self) -> Duration {
        Duration::from_millis(self.npc_action_interval_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allotments() {
        let config = GameConfig::default();
        assert_eq!(config.player_turn_points, 12);
        assert_eq!(config.npc_turn_points, 10);
        assert_eq!(config.attack_cost, 4);
        assert_eq!(config.move_step_interval(), Duration::from_millis(200));
        assert_eq!(config.npc_action_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "attackCost": 3, "heuristic": "chebyshev" }"#).unwrap();
        assert_eq!(config.attack_cost, 3);
        assert_eq!(config.heuristic, Heuristic::Chebyshev);
        assert_eq!(config.player_turn_points, 12);
        assert_eq!(config.spawn, Position::new(2, 2));
    }
}
