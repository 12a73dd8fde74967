//! # Action Resolver
//!
//! Player intents that change the world: paced movement, attacks and skipping a
//! battle turn.
//!
//! Every handler validates first and mutates second. A rejected intent returns
//! `Err(TacticaError::Rejected(..))` and leaves both the state and the outbox
//! untouched.

use crate::{
    Combatant, GameMode, GameWorld, MoveAnimation, PlayerId, Position, Rejection, ServerEvent,
    TacticaResult, Task,
};
use log::{debug, info};

impl GameWorld {
    /// Starts a paced move of a player towards `dest`.
    ///
    /// A move already in flight is cancelled first; in battle its completed steps
    /// are billed and the turn ends if that drains the budget. The first step is
    /// taken immediately, the rest follow one per step interval.
    pub fn handle_move(&mut self, id: PlayerId, dest: Position) -> TacticaResult<()> {
        let from = self
            .registry
            .player(&id)
            .map(|p| p.position)
            .ok_or(Rejection::UnknownPlayer)?;
        if self.mode == GameMode::Battle && !self.is_active(&Combatant::Player(id)) {
            return Err(Rejection::OutOfTurn.into());
        }
        if !self.grid.in_bounds(dest) {
            return Err(Rejection::OutOfBounds.into());
        }
        if self.is_blocked(dest) {
            return Err(Rejection::DestinationBlocked.into());
        }
        let path = self.find_path(from, dest).ok_or(Rejection::NoPath)?;

        if self.settle_move(id) {
            return Ok(());
        }

        let billed = self.mode == GameMode::Battle;
        let budget = self
            .registry
            .player(&id)
            .map(|p| usize::try_from(p.action_points).unwrap_or(0))
            .unwrap_or(0);
        let steps = if billed {
            budget.min(path.len() - 1)
        } else {
            path.len() - 1
        };
        if steps == 0 {
            return Ok(());
        }

        let token = self.next_token();
        debug!(
            "Player {} moving to ({}, {}) in {} steps",
            id, dest.x, dest.y, steps
        );
        if let Some(player) = self.registry.player_mut(&id) {
            player.animation = Some(MoveAnimation {
                path,
                steps,
                current_step: 0,
                token,
                billed,
            });
        }
        self.run_move_step(id, token);
        Ok(())
    }

    /// Cancels a player's in-flight move, billing its completed steps in battle.
    ///
    /// Returns `true` when the billing exhausted the budget and ended the turn.
    pub(crate) fn settle_move(&mut self, id: PlayerId) -> bool {
        let billing = self.mode == GameMode::Battle;
        let Some(player) = self.registry.player_mut(&id) else {
            return false;
        };
        let Some(animation) = player.animation.take() else {
            return false;
        };
        if !(billing && animation.billed) {
            return false;
        }

        player.action_points = (player.action_points - step_count(animation.current_step)).max(0);
        let action_points = player.action_points;
        debug!(
            "Cancelled move of player {} after {} steps",
            id, animation.current_step
        );
        self.broadcast(ServerEvent::PlayerUpdated {
            id,
            health: None,
            action_points: Some(action_points),
        });
        if action_points <= 0 {
            self.finish_turn();
            return true;
        }
        false
    }

    /// Runs one step of a paced move; stale tokens are ignored.
    pub(crate) fn run_move_step(&mut self, id: PlayerId, token: u64) {
        let Some(animation) = self
            .registry
            .player(&id)
            .and_then(|p| p.animation.as_ref())
        else {
            return;
        };
        if animation.token != token {
            return;
        }
        let Some(next) = animation.next_cell() else {
            self.complete_move(id);
            return;
        };

        if self.is_blocked(next) {
            debug!(
                "Player {} stopped early: ({}, {}) is blocked",
                id, next.x, next.y
            );
            if let Some(animation) = self
                .registry
                .player_mut(&id)
                .and_then(|p| p.animation.as_mut())
            {
                animation.steps = animation.current_step;
            }
            self.complete_move(id);
            return;
        }

        let show_budget = self.mode == GameMode::Battle;
        let Some(player) = self.registry.player_mut(&id) else {
            return;
        };
        let Some(animation) = player.animation.as_mut() else {
            return;
        };
        animation.current_step += 1;
        let taken = animation.current_step;
        let billed = animation.billed;
        player.position = next;
        let action_points =
            (show_budget && billed).then(|| (player.action_points - step_count(taken)).max(0));

        self.latch_aggro(next);
        self.broadcast(ServerEvent::PlayerMoved {
            id,
            x: next.x,
            y: next.y,
            action_points,
        });

        let due = self.now + self.config.move_step_interval();
        self.timers
            .schedule(due, Task::MoveStep { player: id, token });
    }

    /// Finishes a move whose steps are all taken.
    fn complete_move(&mut self, id: PlayerId) {
        let in_battle = self.mode == GameMode::Battle;
        let Some(player) = self.registry.player_mut(&id) else {
            return;
        };
        let Some(animation) = player.animation.take() else {
            return;
        };
        let position = player.position;

        if in_battle && animation.billed {
            player.action_points =
                (player.action_points - step_count(animation.current_step)).max(0);
            let action_points = player.action_points;
            self.broadcast(ServerEvent::PlayerUpdated {
                id,
                health: None,
                action_points: Some(action_points),
            });
            if action_points <= 0 && self.is_active(&Combatant::Player(id)) {
                self.finish_turn();
            }
            return;
        }

        self.broadcast(ServerEvent::PlayerMoved {
            id,
            x: position.x,
            y: position.y,
            action_points: None,
        });
        if !in_battle && self.hostile_within_aggro(position) {
            info!(
                "Player {} came within aggro distance at ({}, {})",
                id, position.x, position.y
            );
            self.start_battle();
        }
    }

    /// Resolves a player attack against an NPC.
    pub fn handle_attack(&mut self, id: PlayerId, npc_id: &str) -> TacticaResult<()> {
        let player = self.registry.player(&id).ok_or(Rejection::UnknownPlayer)?;
        if self.mode != GameMode::Battle {
            return Err(Rejection::NotInBattle.into());
        }
        if !self.is_active(&Combatant::Player(id)) {
            return Err(Rejection::OutOfTurn.into());
        }
        let target = self
            .registry
            .npc(npc_id)
            .filter(|npc| !npc.friendly && npc.is_alive())
            .ok_or(Rejection::UnknownTarget)?;

        // Points left once an in-flight move is billed
        let pending = player
            .animation
            .as_ref()
            .filter(|a| a.billed)
            .map_or(0, |a| step_count(a.current_step));
        if player.action_points - pending < self.config.attack_cost {
            return Err(Rejection::InsufficientActionPoints.into());
        }
        if player.position.chebyshev_distance(target.position) > player.weapon_range {
            return Err(Rejection::OutOfRange.into());
        }
        let max_damage = player.max_damage();
        let target_position = target.position;

        if self.settle_move(id) {
            return Ok(());
        }

        let damage = self.roll(max_damage);
        let cost = self.config.attack_cost;
        let action_points = match self.registry.player_mut(&id) {
            Some(player) => {
                player.action_points = (player.action_points - cost).max(0);
                player.action_points
            }
            None => return Ok(()),
        };
        let remaining_health = match self.registry.npc_mut(npc_id) {
            Some(npc) => {
                npc.health -= damage;
                npc.health
            }
            None => return Ok(()),
        };

        self.broadcast(ServerEvent::DamageFeedback {
            attacker: id.to_string(),
            target: npc_id.to_string(),
            damage,
            x: target_position.x,
            y: target_position.y,
        });
        self.broadcast(ServerEvent::DamageLog(format!(
            "Player {} attacked NPC {} for {} damage.",
            id, npc_id, damage
        )));

        if remaining_health <= 0 {
            info!("NPC {} was killed by player {}", npc_id, id);
            self.registry.remove_npc(npc_id);
            self.broadcast(ServerEvent::NpcRemoved {
                id: npc_id.to_string(),
            });
            self.check_battle_over();
        } else {
            self.broadcast(ServerEvent::NpcUpdated {
                id: npc_id.to_string(),
                health: remaining_health,
            });
        }

        self.broadcast(ServerEvent::PlayerUpdated {
            id,
            health: None,
            action_points: Some(action_points),
        });
        if action_points <= 0 {
            self.finish_turn();
        }
        Ok(())
    }

    /// Ends the active player's battle turn at once.
    pub fn handle_skip_turn(&mut self, id: PlayerId) -> TacticaResult<()> {
        if self.registry.player(&id).is_none() {
            return Err(Rejection::UnknownPlayer.into());
        }
        if self.mode != GameMode::Battle {
            return Err(Rejection::NotInBattle.into());
        }
        if !self.is_active(&Combatant::Player(id)) {
            return Err(Rejection::OutOfTurn.into());
        }

        if let Some(player) = self.registry.player_mut(&id) {
            player.animation = None;
        }
        self.broadcast(ServerEvent::ConsoleLog(format!(
            "Player {} skipped their turn.",
            id
        )));
        self.finish_turn();
        Ok(())
    }

    /// Engages every hostile NPC close enough to a player standing on `pos`.
    fn latch_aggro(&mut self, pos: Position) {
        let range = self.config.aggro_distance;
        for npc in self.registry.npcs_mut() {
            if npc.friendly || npc.is_in_battle {
                continue;
            }
            if npc.position.euclidean_distance(pos) < range {
                debug!("NPC {} is now engaged", npc.id);
                npc.is_in_battle = true;
            }
        }
    }

    fn hostile_within_aggro(&self, pos: Position) -> bool {
        let range = self.config.aggro_distance;
        self.registry
            .npcs()
            .any(|npc| !npc.friendly && npc.position.euclidean_distance(pos) < range)
    }
}

fn step_count(steps: usize) -> i32 {
    i32::try_from(steps).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        new_player_id, CharacterSheet, CharacterStats, GameConfig, GameMap, Npc, Outbound,
        TacticaError, TerrainCell,
    };
    use std::time::Duration;

    fn sheet(name: &str) -> CharacterSheet {
        CharacterSheet {
            name: name.to_string(),
            char_class: "warrior".to_string(),
            stats: CharacterStats::default(),
        }
    }

    fn events(world: &mut GameWorld) -> Vec<ServerEvent> {
        world
            .drain_outbox()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Event { event, .. } => Some(event),
                Outbound::Close(_) => None,
            })
            .collect()
    }

    fn free_world(npcs: Vec<Npc>) -> (GameWorld, PlayerId) {
        let mut map = GameMap::empty(25, 25);
        map.npcs = Some(npcs);
        let mut world = GameWorld::new(map, GameConfig::for_testing(), 11);
        let id = new_player_id();
        world.add_player(id, &sheet("Aria")).unwrap();
        world.drain_outbox();
        (world, id)
    }

    #[test]
    fn test_free_move_runs_to_completion() {
        let (mut world, id) = free_world(vec![]);
        world.handle_move(id, Position::new(5, 2)).unwrap();

        // First step is immediate
        assert_eq!(
            world.registry().player(&id).unwrap().position,
            Position::new(3, 2)
        );
        world.advance(Duration::from_millis(600));
        let player = world.registry().player(&id).unwrap();
        assert_eq!(player.position, Position::new(5, 2));
        assert!(!player.is_moving());

        let moved: Vec<Option<i32>> = events(&mut world)
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::PlayerMoved { action_points, .. } => Some(action_points),
                _ => None,
            })
            .collect();
        // Three steps plus the completion broadcast, all unlimited
        assert_eq!(moved, vec![None; 4]);
        assert_eq!(world.registry().player(&id).unwrap().action_points, 10);
    }

    #[test]
    fn test_move_onto_self_is_rejected_silently() {
        let (mut world, id) = free_world(vec![]);
        let err = world.handle_move(id, Position::new(2, 2)).unwrap_err();
        assert!(matches!(
            err,
            TacticaError::Rejected(Rejection::DestinationBlocked)
        ));
        assert!(world.drain_outbox().is_empty());
    }

    #[test]
    fn test_out_of_bounds_and_unknown_player() {
        let (mut world, id) = free_world(vec![]);
        assert!(matches!(
            world.handle_move(id, Position::new(25, 3)),
            Err(TacticaError::Rejected(Rejection::OutOfBounds))
        ));
        assert!(matches!(
            world.handle_move(new_player_id(), Position::new(3, 3)),
            Err(TacticaError::Rejected(Rejection::UnknownPlayer))
        ));
    }

    #[test]
    fn test_walled_in_destination_has_no_path() {
        let mut map = GameMap::empty(10, 10);
        for pos in Position::new(7, 7).cardinal_adjacent_positions() {
            map.grid.set_cell(TerrainCell::new(pos, "rock", true));
        }
        let mut world = GameWorld::new(map, GameConfig::for_testing(), 1);
        let id = new_player_id();
        world.add_player(id, &sheet("Aria")).unwrap();
        world.drain_outbox();

        assert!(matches!(
            world.handle_move(id, Position::new(7, 7)),
            Err(TacticaError::Rejected(Rejection::NoPath))
        ));
        assert!(world.drain_outbox().is_empty());
    }

    #[test]
    fn test_second_move_cancels_first() {
        let (mut world, id) = free_world(vec![]);
        world.handle_move(id, Position::new(10, 2)).unwrap();
        world.advance(Duration::from_millis(200));
        assert_eq!(
            world.registry().player(&id).unwrap().position,
            Position::new(4, 2)
        );

        world.handle_move(id, Position::new(4, 5)).unwrap();
        world.advance(Duration::from_millis(2000));
        assert_eq!(
            world.registry().player(&id).unwrap().position,
            Position::new(4, 5)
        );
        assert!(world.next_due().is_none());
    }

    #[test]
    fn test_move_near_hostile_starts_battle() {
        let (mut world, id) = free_world(vec![Npc::hostile("npc1", Position::new(8, 2))]);
        world.handle_move(id, Position::new(5, 2)).unwrap();
        world.advance(Duration::from_millis(600));

        assert_eq!(world.mode(), GameMode::Battle);
        assert!(world.registry().npc("npc1").unwrap().is_in_battle);
        assert!(world.is_active(&Combatant::Player(id)));
        assert_eq!(world.registry().player(&id).unwrap().action_points, 12);
        assert!(events(&mut world)
            .iter()
            .any(|e| matches!(e, ServerEvent::BattleMode { .. })));
    }

    #[test]
    fn test_friendly_npcs_never_aggro() {
        let (mut world, id) = free_world(vec![Npc::friendly(
            "merchant",
            Position::new(6, 2),
            "merchant",
        )]);
        world.handle_move(id, Position::new(5, 2)).unwrap();
        world.advance(Duration::from_millis(600));
        assert_eq!(world.mode(), GameMode::Free);
        assert!(!world.registry().npc("merchant").unwrap().is_in_battle);
    }

    #[test]
    fn test_attack_outside_battle_is_rejected() {
        let (mut world, id) = free_world(vec![Npc::hostile("npc1", Position::new(3, 2))]);
        assert!(matches!(
            world.handle_attack(id, "npc1"),
            Err(TacticaError::Rejected(Rejection::NotInBattle))
        ));
        assert!(matches!(
            world.handle_skip_turn(id),
            Err(TacticaError::Rejected(Rejection::NotInBattle))
        ));
    }

    #[test]
    fn test_adjacent_attack_costs_four() {
        let mut npc = Npc::hostile("npc1", Position::new(3, 2));
        npc.is_in_battle = true;
        npc.health = 100;
        let (mut world, id) = free_world(vec![npc]);
        world.start_battle();
        world.drain_outbox();

        world.handle_attack(id, "npc1").unwrap();
        assert_eq!(world.registry().player(&id).unwrap().action_points, 8);
        let health = world.registry().npc("npc1").unwrap().health;
        assert!((96..=99).contains(&health));

        let events = events(&mut world);
        assert!(matches!(events[0], ServerEvent::DamageFeedback { .. }));
        assert!(matches!(&events[1], ServerEvent::DamageLog(line) if line.starts_with("Player ")));
        assert!(matches!(events[2], ServerEvent::NpcUpdated { health: h, .. } if h == health));
        assert!(matches!(
            events[3],
            ServerEvent::PlayerUpdated {
                action_points: Some(8),
                ..
            }
        ));
    }

    #[test]
    fn test_attack_on_friendly_is_unknown_target() {
        let mut rat = Npc::hostile("npc1", Position::new(20, 20));
        rat.is_in_battle = true;
        let (mut world, id) = free_world(vec![
            rat,
            Npc::friendly("merchant", Position::new(3, 2), "merchant"),
        ]);
        world.start_battle();
        world.drain_outbox();

        assert!(matches!(
            world.handle_attack(id, "merchant"),
            Err(TacticaError::Rejected(Rejection::UnknownTarget))
        ));
        assert!(matches!(
            world.handle_attack(id, "ghost"),
            Err(TacticaError::Rejected(Rejection::UnknownTarget))
        ));
        assert!(world.drain_outbox().is_empty());
    }

    #[test]
    fn test_skip_turn_hands_over() {
        let mut rat = Npc::hostile("npc1", Position::new(20, 20));
        rat.is_in_battle = true;
        let (mut world, id) = free_world(vec![rat]);
        world.start_battle();
        world.drain_outbox();

        world.handle_skip_turn(id).unwrap();
        assert!(world.is_active(&Combatant::Npc("npc1".to_string())));
        let events = events(&mut world);
        assert!(matches!(&events[0], ServerEvent::ConsoleLog(line) if line.ends_with("skipped their turn.")));

        assert!(matches!(
            world.handle_skip_turn(id),
            Err(TacticaError::Rejected(Rejection::OutOfTurn))
        ));
    }

    #[test]
    fn test_battle_move_reports_remaining_points() {
        let mut rat = Npc::hostile("npc1", Position::new(20, 20));
        rat.is_in_battle = true;
        let (mut world, id) = free_world(vec![rat]);
        world.start_battle();
        world.drain_outbox();

        world.handle_move(id, Position::new(5, 2)).unwrap();
        world.advance(Duration::from_millis(600));

        let trace: Vec<ServerEvent> = events(&mut world);
        let moved: Vec<Option<i32>> = trace
            .iter()
            .filter_map(|e| match e {
                ServerEvent::PlayerMoved { action_points, .. } => Some(*action_points),
                _ => None,
            })
            .collect();
        assert_eq!(moved, vec![Some(11), Some(10), Some(9)]);
        assert!(matches!(
            trace.last(),
            Some(ServerEvent::PlayerUpdated {
                action_points: Some(9),
                ..
            })
        ));
        assert_eq!(world.registry().player(&id).unwrap().action_points, 9);
    }

    #[test]
    fn test_cancelled_battle_move_bills_completed_steps() {
        let mut rat = Npc::hostile("npc1", Position::new(20, 20));
        rat.is_in_battle = true;
        let (mut world, id) = free_world(vec![rat]);
        world.start_battle();
        world.drain_outbox();

        world.handle_move(id, Position::new(8, 2)).unwrap();
        world.advance(Duration::from_millis(200));
        // Two steps taken, then redirected
        world.handle_move(id, Position::new(4, 4)).unwrap();
        world.advance(Duration::from_millis(1000));

        let player = world.registry().player(&id).unwrap();
        assert_eq!(player.position, Position::new(4, 4));
        assert_eq!(player.action_points, 12 - 2 - 2);
    }

    #[test]
    fn test_cancel_that_exhausts_points_ends_turn() {
        let mut rat = Npc::hostile("npc1", Position::new(20, 20));
        rat.is_in_battle = true;
        let (mut world, id) = free_world(vec![rat]);
        world.start_battle();
        world.drain_outbox();
        world.registry_mut().player_mut(&id).unwrap().action_points = 2;

        world.handle_move(id, Position::new(8, 2)).unwrap();
        world.advance(Duration::from_millis(200));
        assert_eq!(
            world.registry().player(&id).unwrap().position,
            Position::new(4, 2)
        );

        // Both points already spent on the way: the redirect ends the turn
        world.handle_move(id, Position::new(4, 5)).unwrap();
        let player = world.registry().player(&id).unwrap();
        assert_eq!(player.action_points, 0);
        assert!(!player.is_turn);
        assert!(!player.is_moving());
        assert_eq!(player.position, Position::new(4, 2));
        assert!(world.is_active(&Combatant::Npc("npc1".to_string())));
    }
}
