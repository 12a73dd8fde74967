//! # Tactica
//!
//! A server-authoritative, turn-based tactics engine for small multiplayer grid games.
//!
//! ## Architecture Overview
//!
//! Players explore a tile map in real time. When one of them wanders too close to a
//! hostile NPC, the whole world switches into a strict turn-order battle that lasts
//! until every engaged NPC is dead or no player remains.
//!
//! - **Grid Model**: terrain and occupancy queries over a bounded 2D map
//! - **Pathfinder**: 4-directional A* with a reproducible open-set scan
//! - **Entity Registry**: ordered collections of connected players and NPCs
//! - **Turn Scheduler**: battle lifecycle, turn queue and action-point allotments
//! - **Action Resolver**: paced movement, attacks and NPC turns
//! - **Session Gateway**: maps client intents onto the core and routes broadcasts
//!
//! All game state lives in an explicit [`GameWorld`] driven by a virtual clock, so
//! several worlds can run side by side and every scenario can be replayed in tests.

pub mod game;
pub mod generation;
pub mod input;
pub mod server;
pub mod storage;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use input::*;
pub use server::*;
pub use storage::*;
pub use utils::*;

/// Core error type for the Tactica engine.
#[derive(thiserror::Error, Debug)]
pub enum TacticaError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A client intent was refused
    #[error("Rejected intent: {0}")]
    Rejected(#[from] Rejection),

    /// A connection could not be admitted
    #[error("Admission failed: {0}")]
    Admission(#[from] AdmissionError),

    /// A terrain file could not be turned into a map
    #[error("Map load failed: {0}")]
    MapLoad(String),

    /// A character with this name is already saved
    #[error("Character already exists: {0}")]
    CharacterExists(String),
}

/// Reasons a client intent is dropped without touching game state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no player is registered for this session")]
    UnknownPlayer,
    #[error("it is not this player's turn")]
    OutOfTurn,
    #[error("the game is not in battle mode")]
    NotInBattle,
    #[error("a battle is in progress")]
    BattleInProgress,
    #[error("destination is outside the grid")]
    OutOfBounds,
    #[error("destination is blocked")]
    DestinationBlocked,
    #[error("no path to destination")]
    NoPath,
    #[error("unknown target")]
    UnknownTarget,
    #[error("not enough action points")]
    InsufficientActionPoints,
    #[error("target is out of range")]
    OutOfRange,
}

/// Connection admission failures. The display text is sent verbatim to the client.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("No character selected.")]
    NoCharacterSelected,
    #[error("This character is already connected.")]
    AlreadyConnected,
    #[error("Character file not found.")]
    CharacterNotFound,
    #[error("Saved character has missing or invalid data.")]
    InvalidCharacter,
    #[error("Error reading character file.")]
    Unreadable,
}

/// Result type used throughout the Tactica codebase.
pub type TacticaResult<T> = Result<T, TacticaError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Default grid width in tiles
    pub const DEFAULT_GRID_WIDTH: i32 = 25;

    /// Default grid height in tiles
    pub const DEFAULT_GRID_HEIGHT: i32 = 25;

    /// Largest grid side a loaded map may have
    pub const MAX_GRID_DIMENSION: i32 = 256;

    /// Action points a player receives at the start of each battle turn
    pub const PLAYER_TURN_POINTS: i32 = 12;

    /// Action points an NPC receives at the start of each battle turn
    pub const NPC_TURN_POINTS: i32 = 10;

    /// Action points a freshly connected player starts with
    pub const PLAYER_STARTING_POINTS: i32 = 10;

    /// Action points consumed by one attack
    pub const ATTACK_COST: i32 = 4;

    /// Euclidean distance under which a hostile NPC engages a player
    pub const AGGRO_DISTANCE: f64 = 4.0;

    /// Delay between two steps of a player move
    pub const MOVE_STEP_INTERVAL_MS: u64 = 200;

    /// Delay between two actions of an NPC turn
    pub const NPC_ACTION_INTERVAL_MS: u64 = 300;

    /// Starting health of a player
    pub const DEFAULT_PLAYER_HEALTH: i32 = 24;

    /// Spawn cell for new players
    pub const DEFAULT_SPAWN: (i32, i32) = (2, 2);

    /// Default weapon reach (Chebyshev distance)
    pub const DEFAULT_WEAPON_RANGE: i32 = 1;

    /// Default weapon attack bonus
    pub const DEFAULT_WEAPON_ATTACK: i32 = 4;

    /// Upper bound of the NPC damage roll
    pub const NPC_ATTACK_DIE: i32 = 6;

    /// Wire protocol version stamped on every outbound message
    pub const PROTOCOL_VERSION: u32 = 1;

    /// Default listening port
    pub const DEFAULT_PORT: u16 = 3000;
}
