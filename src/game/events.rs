//! # Wire Events
//!
//! Explicit schemas for everything crossing the session boundary.
//!
//! Outbound messages are wrapped in a [`WireMessage`] envelope carrying the
//! protocol version, the event name and its payload:
//!
//! ```json
//! {"v":1,"event":"playerMoved","data":{"id":"…","x":3,"y":2,"actionPoints":9}}
//! ```

use crate::{config, Combatant, GameMode, Grid, Npc, NpcId, Player, PlayerId, TerrainCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sprite name to asset path, as served to clients.
pub type SpriteManifest = BTreeMap<String, String>;

/// Terrain as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainSnapshot {
    pub grid_width: i32,
    pub grid_height: i32,
    pub cells: Vec<TerrainCell>,
}

impl From<&Grid> for TerrainSnapshot {
    fn from(grid: &Grid) -> Self {
        Self {
            grid_width: grid.width,
            grid_height: grid.height,
            cells: grid.cells().to_vec(),
        }
    }
}

/// Every event the server emits.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full snapshot for a freshly admitted session
    Init {
        player: Player,
        players: Vec<Player>,
        npcs: Vec<Npc>,
        terrain: TerrainSnapshot,
        game_mode: GameMode,
        sprites: SpriteManifest,
    },
    PlayerJoined(Player),
    /// One step of a player move. `action_points` is `None` outside battle.
    PlayerMoved {
        id: PlayerId,
        x: i32,
        y: i32,
        action_points: Option<i32>,
    },
    PlayerUpdated {
        id: PlayerId,
        #[serde(skip_serializing_if = "Option::is_none")]
        health: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action_points: Option<i32>,
    },
    NpcMoved {
        id: NpcId,
        x: i32,
        y: i32,
        action_points: i32,
    },
    NpcUpdated {
        id: NpcId,
        health: i32,
    },
    NpcRemoved {
        id: NpcId,
    },
    /// A player died
    PlayerRemoved {
        id: PlayerId,
    },
    PlayerDisconnected {
        id: PlayerId,
    },
    /// Battle started
    BattleMode {
        battle_queue: Vec<Combatant>,
        game_mode: GameMode,
        players: Vec<Player>,
        npcs: Vec<Npc>,
        terrain: TerrainSnapshot,
    },
    TurnUpdate {
        battle_queue: Vec<Combatant>,
        players: Vec<Player>,
        npcs: Vec<Npc>,
    },
    BattleEnded {
        game_mode: GameMode,
        players: Vec<Player>,
        npcs: Vec<Npc>,
    },
    DamageFeedback {
        attacker: String,
        target: String,
        damage: i32,
        x: i32,
        y: i32,
    },
    DamageLog(String),
    ConsoleLog(String),
    /// The map was swapped by a travel intent
    TerrainUpdated {
        terrain: TerrainSnapshot,
        players: Vec<Player>,
        npcs: Vec<Npc>,
    },
    Error(String),
}

impl ServerEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Init { .. } => "init",
            ServerEvent::PlayerJoined(_) => "playerJoined",
            ServerEvent::PlayerMoved { .. } => "playerMoved",
            ServerEvent::PlayerUpdated { .. } => "playerUpdated",
            ServerEvent::NpcMoved { .. } => "npcMoved",
            ServerEvent::NpcUpdated { .. } => "npcUpdated",
            ServerEvent::NpcRemoved { .. } => "npcRemoved",
            ServerEvent::PlayerRemoved { .. } => "playerRemoved",
            ServerEvent::PlayerDisconnected { .. } => "playerDisconnected",
            ServerEvent::BattleMode { .. } => "battleMode",
            ServerEvent::TurnUpdate { .. } => "turnUpdate",
            ServerEvent::BattleEnded { .. } => "battleEnded",
            ServerEvent::DamageFeedback { .. } => "damageFeedback",
            ServerEvent::DamageLog(_) => "damageLog",
            ServerEvent::ConsoleLog(_) => "consoleLog",
            ServerEvent::TerrainUpdated { .. } => "terrainUpdated",
            ServerEvent::Error(_) => "error",
        }
    }
}

/// Versioned envelope around an outbound event.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage<'a> {
    pub v: u32,
    #[serde(flatten)]
    pub event: &'a ServerEvent,
}

impl<'a> WireMessage<'a> {
    pub fn new(event: &'a ServerEvent) -> Self {
        Self {
            v: config::PROTOCOL_VERSION,
            event,
        }
    }

    /// Serializes the message as one JSON line without the trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Who receives an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

impl Audience {
    pub fn includes(self, session: PlayerId) -> bool {
        match self {
            Audience::All => true,
            Audience::AllExcept(excluded) => excluded != session,
            Audience::Only(target) => target == session,
        }
    }
}

/// Output of the core, drained by the session gateway after every operation.
#[derive(Debug, Clone)]
pub enum Outbound {
    Event { to: Audience, event: ServerEvent },
    /// Close the session's connection
    Close(PlayerId),
}

/// First line a client sends: the character it wants to play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientHello {
    #[serde(default)]
    pub character: Option<String>,
}

/// Intents a connected client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    Move { dest_x: i32, dest_y: i32 },
    Attack { npc_id: NpcId },
    SkipTurn,
    Travel { file_name: String },
}
