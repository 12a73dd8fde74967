//! # Game State Module
//!
//! The [`GameWorld`] context object that every core operation runs against.
//!
//! A world owns the terrain grid, the entity registry, the game mode and battle
//! queue, a virtual clock with its pending timer tasks, the damage RNG and an
//! outbox of wire events. Nothing is global: the session gateway owns one world and
//! drains its outbox after each call, and tests build as many worlds as they like.
//!
//! The scheduler, resolver and NPC AI are further `impl GameWorld` blocks in
//! [`battle`](crate::game::battle), [`actions`](crate::game::actions) and
//! [`ai`](crate::game::ai).

use crate::utils::Pathfinder;
use crate::{
    AdmissionError, Audience, BattleQueue, CharacterSheet, EntityRegistry, GameConfig, GameMap,
    GameMode, Grid, Npc, Outbound, Player, PlayerId, Position, Rejection, ServerEvent,
    SpriteManifest, TacticaError, TacticaResult, Task, TerrainSnapshot, TimerQueue,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Central game context.
#[derive(Debug)]
pub struct GameWorld {
    pub(crate) config: GameConfig,
    pub(crate) grid: Grid,
    pub(crate) registry: EntityRegistry,
    pub(crate) mode: GameMode,
    pub(crate) queue: BattleQueue,
    /// Bumped on every battle start and end; NPC tasks from an older battle are stale
    pub(crate) battle_epoch: u64,
    pub(crate) timers: TimerQueue,
    pub(crate) now: Duration,
    next_token: u64,
    rng: StdRng,
    outbox: Vec<Outbound>,
    sprites: SpriteManifest,
    pathfinder: Pathfinder,
}

impl GameWorld {
    /// Creates a world on the given map.
    ///
    /// # Examples
    ///
    /// ```
    /// use tactica::{GameConfig, GameMap, GameMode, GameWorld};
    ///
    /// let world = GameWorld::new(GameMap::empty(25, 25), GameConfig::default(), 12345);
    /// assert_eq!(world.mode(), GameMode::Free);
    /// assert_eq!(world.registry().player_count(), 0);
    /// ```
    pub fn new(map: GameMap, config: GameConfig, seed: u64) -> Self {
        Self {
            pathfinder: Pathfinder::new(config.heuristic),
            config,
            grid: map.grid,
            registry: EntityRegistry::new(map.npcs.unwrap_or_default()),
            mode: GameMode::Free,
            queue: BattleQueue::default(),
            battle_epoch: 0,
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            next_token: 0,
            rng: StdRng::seed_from_u64(seed),
            outbox: Vec::new(),
            sprites: SpriteManifest::new(),
        }
    }

    /// Sets the sprite manifest sent in `init` snapshots.
    pub fn with_sprites(mut self, sprites: SpriteManifest) -> Self {
        self.sprites = sprites;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Direct registry access for setup and tooling. No rule checks apply.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn battle_queue(&self) -> &BattleQueue {
        &self.queue
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Due time of the earliest pending timer task.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Checks whether terrain or any live entity occupies a position.
    ///
    /// Occupancy is read at call time; a player halfway through a move blocks the
    /// cell it currently stands on and nothing else.
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.grid.blocks_movement(pos) || self.registry.is_occupied(pos)
    }

    /// Shortest 4-directional path over the current occupancy.
    pub fn find_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        self.pathfinder
            .find_path(self.grid.width, self.grid.height, from, to, |p| {
                self.is_blocked(p)
            })
    }

    /// Takes every event produced since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Advances the virtual clock, running every timer task that falls due.
    ///
    /// Tasks run in due order; tasks scheduled while running are picked up in the
    /// same call when they fall inside the window.
    pub fn advance(&mut self, elapsed: Duration) {
        let target = self.now + elapsed;
        while let Some((due, task)) = self.timers.pop_due(target) {
            self.now = self.now.max(due);
            self.run_task(task);
        }
        self.now = target;
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::MoveStep { player, token } => self.run_move_step(player, token),
            Task::NpcAction { npc, battle } => {
                if battle == self.battle_epoch && self.mode == GameMode::Battle {
                    self.continue_npc_turn(&npc);
                }
            }
        }
    }

    /// Admits a player for a session, placing it at the configured spawn or the
    /// nearest free cell, and emits `init` to the session and `playerJoined` to
    /// everybody else.
    pub fn add_player(&mut self, id: PlayerId, sheet: &CharacterSheet) -> TacticaResult<()> {
        if self.registry.has_character(&sheet.name) {
            return Err(AdmissionError::AlreadyConnected.into());
        }
        let spawn = self
            .spawn_position()
            .ok_or_else(|| TacticaError::InvalidState("No free spawn cell".to_string()))?;

        let mut player = Player::from_sheet(id, sheet, spawn);
        player.health = self.config.player_health;
        player.action_points = self.config.player_starting_points;
        player.weapon_range = self.config.weapon_range;
        player.weapon_attack = self.config.weapon_attack;

        info!(
            "Player {} joined as {} the {} at ({}, {})",
            id, player.name, player.char_class, spawn.x, spawn.y
        );
        self.registry.add_player(player.clone());

        let init = ServerEvent::Init {
            player: player.clone(),
            players: self.player_snapshots(),
            npcs: self.npc_snapshots(),
            terrain: self.terrain_snapshot(),
            game_mode: self.mode,
            sprites: self.sprites.clone(),
        };
        self.send(Audience::Only(id), init);
        self.send(Audience::AllExcept(id), ServerEvent::PlayerJoined(player));
        Ok(())
    }

    /// Removes a disconnected player. If it held the active battle turn the turn
    /// advances; otherwise the battle re-checks whether it can continue.
    pub fn remove_player(&mut self, id: PlayerId) {
        let was_active = self.is_active(&crate::Combatant::Player(id));
        if self.registry.remove_player(&id).is_none() {
            return;
        }
        info!("Player {} disconnected", id);
        self.broadcast(ServerEvent::PlayerDisconnected { id });

        if self.mode == GameMode::Battle {
            if was_active {
                self.finish_turn();
            } else {
                self.prune_battle_queue();
                self.check_battle_over();
            }
        }
    }

    /// Swaps the terrain (and the NPC roster when the map carries one).
    ///
    /// In-flight moves are cancelled and players left on a blocked or out-of-bounds
    /// cell are moved to the nearest free cell around the spawn point. Refused while
    /// a battle runs.
    pub fn load_map(&mut self, map: GameMap) -> TacticaResult<()> {
        if self.mode == GameMode::Battle {
            return Err(Rejection::BattleInProgress.into());
        }

        self.grid = map.grid;
        if let Some(npcs) = map.npcs {
            self.registry.replace_npcs(npcs);
        }

        for player in self.registry.players_mut() {
            player.animation = None;
        }
        for id in self.registry.player_ids() {
            if !self.is_misplaced(id) {
                continue;
            }
            if let Some(cell) = self.spawn_position() {
                debug!("Relocating player {} to ({}, {})", id, cell.x, cell.y);
                if let Some(player) = self.registry.player_mut(&id) {
                    player.position = cell;
                }
            }
        }

        info!(
            "Loaded {}x{} map with {} terrain cells",
            self.grid.width,
            self.grid.height,
            self.grid.cells().len()
        );
        self.broadcast(ServerEvent::TerrainUpdated {
            terrain: self.terrain_snapshot(),
            players: self.player_snapshots(),
            npcs: self.npc_snapshots(),
        });
        Ok(())
    }

    fn is_misplaced(&self, id: PlayerId) -> bool {
        let Some(pos) = self.registry.player(&id).map(|p| p.position) else {
            return false;
        };
        !self.grid.in_bounds(pos)
            || self.grid.blocks_movement(pos)
            || self.registry.npcs().any(|n| n.position == pos)
            || self.registry.players().any(|p| p.id != id && p.position == pos)
    }

    /// First free cell in breadth-first order from the configured spawn, expanding
    /// through terrain only.
    fn spawn_position(&self) -> Option<Position> {
        let start = self.config.spawn;
        ::pathfinding::prelude::bfs_reach(start, |&pos: &Position| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|&n| self.grid.in_bounds(n) && !self.grid.blocks_movement(n))
                .collect::<Vec<_>>()
        })
        .find(|&pos| self.grid.in_bounds(pos) && !self.is_blocked(pos))
    }

    pub(crate) fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Uniform roll in `1..=max`.
    pub(crate) fn roll(&mut self, max: i32) -> i32 {
        self.rng.gen_range(1..=max.max(1))
    }

    pub(crate) fn broadcast(&mut self, event: ServerEvent) {
        self.send(Audience::All, event);
    }

    pub(crate) fn send(&mut self, to: Audience, event: ServerEvent) {
        debug!("emit {} to {:?}", event.name(), to);
        self.outbox.push(Outbound::Event { to, event });
    }

    /// Queues an `error` event followed by a forced disconnect for a session.
    pub fn reject_session(&mut self, session: PlayerId, message: String) {
        self.send(Audience::Only(session), ServerEvent::Error(message));
        self.outbox.push(Outbound::Close(session));
    }

    pub fn player_snapshots(&self) -> Vec<Player> {
        self.registry.players().cloned().collect()
    }

    pub fn npc_snapshots(&self) -> Vec<Npc> {
        self.registry.npcs().cloned().collect()
    }

    pub fn terrain_snapshot(&self) -> TerrainSnapshot {
        TerrainSnapshot::from(&self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterStats, TerrainCell};

    fn sheet(name: &str) -> CharacterSheet {
        CharacterSheet {
            name: name.to_string(),
            char_class: "warrior".to_string(),
            stats: CharacterStats::default(),
        }
    }

    fn world() -> GameWorld {
        GameWorld::new(GameMap::empty(25, 25), GameConfig::for_testing(), 7)
    }

    #[test]
    fn test_is_blocked_covers_terrain_and_entities() {
        let mut map = GameMap::empty(10, 10);
        map.grid.set_cell(TerrainCell::new(Position::new(4, 4), "rock", true));
        map.npcs = Some(vec![Npc::hostile("npc1", Position::new(6, 6))]);
        let mut world = GameWorld::new(map, GameConfig::for_testing(), 1);
        world.add_player(crate::new_player_id(), &sheet("Aria")).unwrap();

        assert!(world.is_blocked(Position::new(4, 4)));
        assert!(world.is_blocked(Position::new(6, 6)));
        assert!(world.is_blocked(Position::new(2, 2)));
        assert!(!world.is_blocked(Position::new(3, 3)));
    }

    #[test]
    fn test_add_player_emits_init_and_joined() {
        let mut world = world();
        let id = crate::new_player_id();
        world.add_player(id, &sheet("Aria")).unwrap();

        let outbox = world.drain_outbox();
        assert_eq!(outbox.len(), 2);
        match &outbox[0] {
            Outbound::Event {
                to: Audience::Only(to),
                event: ServerEvent::Init { player, game_mode, .. },
            } => {
                assert_eq!(*to, id);
                assert_eq!(player.position, Position::new(2, 2));
                assert_eq!(*game_mode, GameMode::Free);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            &outbox[1],
            Outbound::Event { to: Audience::AllExcept(ex), event: ServerEvent::PlayerJoined(_) } if *ex == id
        ));
    }

    #[test]
    fn test_duplicate_character_is_refused() {
        let mut world = world();
        world.add_player(crate::new_player_id(), &sheet("Aria")).unwrap();
        let err = world
            .add_player(crate::new_player_id(), &sheet("Aria"))
            .unwrap_err();
        assert!(matches!(
            err,
            TacticaError::Admission(AdmissionError::AlreadyConnected)
        ));
        assert_eq!(world.registry().player_count(), 1);
    }

    #[test]
    fn test_second_player_spawns_next_to_first() {
        let mut world = world();
        let a = crate::new_player_id();
        let b = crate::new_player_id();
        world.add_player(a, &sheet("Aria")).unwrap();
        world.add_player(b, &sheet("Bran")).unwrap();

        let pos_a = world.registry().player(&a).unwrap().position;
        let pos_b = world.registry().player(&b).unwrap().position;
        assert_eq!(pos_a, Position::new(2, 2));
        assert_eq!(pos_b.manhattan_distance(pos_a), 1);
    }

    #[test]
    fn test_reject_session_queues_error_then_close() {
        let mut world = world();
        let id = crate::new_player_id();
        world.reject_session(id, AdmissionError::NoCharacterSelected.to_string());

        let outbox = world.drain_outbox();
        assert!(matches!(
            &outbox[0],
            Outbound::Event { event: ServerEvent::Error(msg), .. } if msg == "No character selected."
        ));
        assert!(matches!(outbox[1], Outbound::Close(s) if s == id));
    }

    #[test]
    fn test_load_map_relocates_buried_players() {
        let mut world = world();
        let id = crate::new_player_id();
        world.add_player(id, &sheet("Aria")).unwrap();
        world.drain_outbox();

        let mut map = GameMap::empty(10, 10);
        map.grid.set_cell(TerrainCell::new(Position::new(2, 2), "tree", true));
        world.load_map(map).unwrap();

        let pos = world.registry().player(&id).unwrap().position;
        assert_ne!(pos, Position::new(2, 2));
        assert!(world.grid().in_bounds(pos));
        let outbox = world.drain_outbox();
        assert!(matches!(
            &outbox[0],
            Outbound::Event { event: ServerEvent::TerrainUpdated { terrain, .. }, .. } if terrain.grid_width == 10
        ));
    }
}
