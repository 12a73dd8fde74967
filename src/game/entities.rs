//! # Entities
//!
//! Players and NPCs share a spatial shape (position, health, action points, turn
//! flag). Players carry a character sheet and may have a move in flight; NPCs carry
//! the friendly and engagement flags.

use crate::{config, NpcId, PlayerId, Position};
use serde::{Deserialize, Serialize};

/// Base attributes read from a saved character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub luck: i32,
    #[serde(default)]
    pub intelligence: i32,
    #[serde(default)]
    pub perception: i32,
}

/// A saved character, as produced by the character creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSheet {
    pub name: String,
    pub char_class: String,
    pub stats: CharacterStats,
}

impl CharacterSheet {
    /// Checks that the required fields carry data.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.char_class.trim().is_empty()
    }
}

/// A paced multi-step move in flight.
///
/// Each step is one scheduled timer task carrying `token`; a task whose token no
/// longer matches the player's current animation is stale and does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveAnimation {
    /// Full path, start cell first
    pub path: Vec<Position>,
    /// Number of steps this move will take
    pub steps: usize,
    /// Steps already taken
    pub current_step: usize,
    pub token: u64,
    /// Whether the steps are billed against action points on completion
    pub billed: bool,
}

impl MoveAnimation {
    pub fn is_finished(&self) -> bool {
        self.current_step >= self.steps
    }

    /// Cell of the next step, if any remain.
    pub fn next_cell(&self) -> Option<Position> {
        if self.is_finished() {
            return None;
        }
        self.path.get(self.current_step + 1).copied()
    }
}

/// A connected player.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub char_class: String,
    pub sprite: String,
    #[serde(flatten)]
    pub position: Position,
    pub health: i32,
    pub action_points: i32,
    pub is_turn: bool,
    #[serde(flatten)]
    pub stats: CharacterStats,
    pub weapon_range: i32,
    pub weapon_attack: i32,
    #[serde(skip)]
    pub animation: Option<MoveAnimation>,
}

impl Player {
    /// Creates a player from a saved character with default combat numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use tactica::{CharacterSheet, CharacterStats, Player, Position, new_player_id};
    ///
    /// let sheet = CharacterSheet {
    ///     name: "Aria".to_string(),
    ///     char_class: "warrior".to_string(),
    ///     stats: CharacterStats { strength: 3, ..Default::default() },
    /// };
    /// let player = Player::from_sheet(new_player_id(), &sheet, Position::new(2, 2));
    /// assert_eq!(player.sprite, "warrior");
    /// assert_eq!(player.max_damage(), 7);
    /// ```
    pub fn from_sheet(id: PlayerId, sheet: &CharacterSheet, position: Position) -> Self {
        Self {
            id,
            name: sheet.name.clone(),
            char_class: sheet.char_class.clone(),
            sprite: sheet.char_class.clone(),
            position,
            health: config::DEFAULT_PLAYER_HEALTH,
            action_points: config::PLAYER_STARTING_POINTS,
            is_turn: false,
            stats: sheet.stats,
            weapon_range: config::DEFAULT_WEAPON_RANGE,
            weapon_attack: config::DEFAULT_WEAPON_ATTACK,
            animation: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Upper bound of this player's damage roll, never below 1.
    pub fn max_damage(&self) -> i32 {
        (self.weapon_attack + self.stats.strength).max(1)
    }

    /// Whether a move is currently in flight.
    pub fn is_moving(&self) -> bool {
        self.animation.is_some()
    }
}

fn default_npc_health() -> i32 {
    20
}

fn default_npc_sprite() -> String {
    "rat".to_string()
}

fn default_attack_die() -> i32 {
    config::NPC_ATTACK_DIE
}

/// A computer-controlled creature.
///
/// Also the roster entry format of terrain files, where only `id`, `x` and `y`
/// are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: NpcId,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub friendly: bool,
    #[serde(default = "default_npc_health")]
    pub health: i32,
    /// Latched once a player comes within aggro distance; never cleared while the
    /// NPC lives.
    #[serde(default)]
    pub is_in_battle: bool,
    #[serde(default)]
    pub action_points: i32,
    #[serde(default)]
    pub is_turn: bool,
    #[serde(default = "default_npc_sprite")]
    pub sprite: String,
    /// Upper bound of this NPC's damage roll
    #[serde(default = "default_attack_die")]
    pub attack_die: i32,
}

impl Npc {
    /// Creates a hostile rat, the standard maze inhabitant.
    pub fn hostile(id: impl Into<NpcId>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            friendly: false,
            health: default_npc_health(),
            is_in_battle: false,
            action_points: 0,
            is_turn: false,
            sprite: default_npc_sprite(),
            attack_die: default_attack_die(),
        }
    }

    /// Creates a friendly NPC that never joins a battle.
    pub fn friendly(id: impl Into<NpcId>, position: Position, sprite: impl Into<String>) -> Self {
        Self {
            friendly: true,
            sprite: sprite.into(),
            ..Self::hostile(id, position)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_player_id;

    fn sheet() -> CharacterSheet {
        CharacterSheet {
            name: "Aria".to_string(),
            char_class: "rogue".to_string(),
            stats: CharacterStats {
                strength: 2,
                luck: 1,
                intelligence: 3,
                perception: 4,
            },
        }
    }

    #[test]
    fn test_player_from_sheet() {
        let player = Player::from_sheet(new_player_id(), &sheet(), Position::new(2, 2));
        assert_eq!(player.health, 24);
        assert_eq!(player.action_points, 10);
        assert_eq!(player.weapon_range, 1);
        assert_eq!(player.max_damage(), 6);
        assert!(!player.is_turn);
        assert!(!player.is_moving());
    }

    #[test]
    fn test_player_wire_shape() {
        let player = Player::from_sheet(new_player_id(), &sheet(), Position::new(3, 4));
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["x"], 3);
        assert_eq!(json["y"], 4);
        assert_eq!(json["charClass"], "rogue");
        assert_eq!(json["actionPoints"], 10);
        assert_eq!(json["perception"], 4);
        assert!(json.get("animation").is_none());
    }

    #[test]
    fn test_npc_roster_defaults() {
        let npc: Npc = serde_json::from_str(r#"{ "id": "npc9", "x": 4, "y": 7 }"#).unwrap();
        assert_eq!(npc, Npc::hostile("npc9", Position::new(4, 7)));
    }

    #[test]
    fn test_move_animation_steps() {
        let mut anim = MoveAnimation {
            path: vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)],
            steps: 2,
            current_step: 0,
            token: 1,
            billed: true,
        };
        assert_eq!(anim.next_cell(), Some(Position::new(1, 0)));
        anim.current_step = 2;
        assert!(anim.is_finished());
        assert_eq!(anim.next_cell(), None);
    }

    #[test]
    fn test_incomplete_sheet() {
        let mut sheet = sheet();
        sheet.char_class = "  ".to_string();
        assert!(!sheet.is_complete());
    }
}
