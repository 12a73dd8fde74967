//! # Input Module
//!
//! The session gateway: admission of connecting clients, dispatch of their
//! intents onto the core, and collection of the resulting outbound events.
//!
//! The gateway knows nothing about sockets. The server feeds it parsed messages
//! and routes whatever [`SessionGateway::drain`] returns.

pub mod commands;

pub use commands::*;

use crate::{
    AdmissionError, CharacterStore, ClientHello, ClientIntent, GameMode, GameWorld, Outbound,
    PlayerId, Position, Rejection, TacticaError, TacticaResult, TerrainStore,
};
use log::{debug, info, warn};
use std::time::Duration;

/// Maps client sessions onto one [`GameWorld`].
#[derive(Debug)]
pub struct SessionGateway {
    world: GameWorld,
    characters: CharacterStore,
    terrains: TerrainStore,
}

impl SessionGateway {
    pub fn new(world: GameWorld, characters: CharacterStore, terrains: TerrainStore) -> Self {
        Self {
            world,
            characters,
            terrains,
        }
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    /// Admits a session with the character named in its hello.
    ///
    /// On failure the session gets an `error` event followed by a close; the world
    /// is left untouched. Returns whether the session was admitted.
    pub fn connect(&mut self, session: PlayerId, hello: &ClientHello) -> bool {
        match self.admit(session, hello) {
            Ok(()) => true,
            Err(e) => {
                warn!("Refused session {}: {}", session, e);
                let message = match e {
                    TacticaError::Admission(reason) => reason.to_string(),
                    other => other.to_string(),
                };
                self.world.reject_session(session, message);
                false
            }
        }
    }

    fn admit(&mut self, session: PlayerId, hello: &ClientHello) -> TacticaResult<()> {
        let selection = hello
            .character
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(AdmissionError::NoCharacterSelected)?;
        if self.world.registry().has_character(selection) {
            return Err(AdmissionError::AlreadyConnected.into());
        }
        let sheet = self.characters.load(selection)?;
        self.world.add_player(session, &sheet)
    }

    /// Applies one intent. Rejections are logged and dropped.
    pub fn handle_intent(&mut self, session: PlayerId, intent: ClientIntent) {
        let result = match intent {
            ClientIntent::Move { dest_x, dest_y } => {
                self.world.handle_move(session, Position::new(dest_x, dest_y))
            }
            ClientIntent::Attack { npc_id } => self.world.handle_attack(session, &npc_id),
            ClientIntent::SkipTurn => self.world.handle_skip_turn(session),
            ClientIntent::Travel { file_name } => self.travel(session, &file_name),
        };
        match result {
            Ok(()) => {}
            Err(TacticaError::Rejected(reason)) => {
                debug!("Dropped intent from {}: {}", session, reason);
            }
            Err(e) => warn!("Intent from {} failed: {}", session, e),
        }
    }

    /// Parses and applies one raw intent line.
    pub fn handle_line(&mut self, session: PlayerId, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match parse_intent(line) {
            Ok(intent) => self.handle_intent(session, intent),
            Err(e) => debug!("Malformed intent from {}: {}", session, e),
        }
    }

    /// Swaps in a saved terrain. A file that fails to load leaves the current map
    /// in place.
    fn travel(&mut self, session: PlayerId, file_name: &str) -> TacticaResult<()> {
        if self.world.registry().player(&session).is_none() {
            return Err(Rejection::UnknownPlayer.into());
        }
        if self.world.mode() == GameMode::Battle {
            return Err(Rejection::BattleInProgress.into());
        }
        let map = self.terrains.load_map(file_name)?;
        self.world.load_map(map)?;
        info!("Player {} travelled to {}", session, file_name);
        Ok(())
    }

    pub fn disconnect(&mut self, session: PlayerId) {
        self.world.remove_player(session);
    }

    /// Advances the world clock.
    pub fn tick(&mut self, elapsed: Duration) {
        self.world.advance(elapsed);
    }

    /// Takes the events produced since the last drain.
    pub fn drain(&mut self) -> Vec<Outbound> {
        self.world.drain_outbox()
    }
}
