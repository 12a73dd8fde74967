//! # NPC AI
//!
//! Battle behaviour of hostile NPCs: close in on the nearest player and attack
//! while adjacent, one paced action at a time.

use crate::{Combatant, GameWorld, NpcId, PlayerId, Position, ServerEvent, Task};
use log::{debug, info};

/// What an NPC turn step left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcTurnOutcome {
    /// Another action is scheduled after the pacing delay
    Waiting,
    /// The NPC has nothing left to do this turn
    Done,
    /// The NPC does not hold the turn; nothing happened
    NotActive,
}

impl GameWorld {
    /// Takes one action for the NPC at the head of the battle queue.
    pub(crate) fn npc_act(&mut self, id: &str) -> NpcTurnOutcome {
        let combatant = Combatant::Npc(id.to_string());
        if !self.is_active(&combatant) {
            return NpcTurnOutcome::NotActive;
        }
        let Some(npc) = self.registry.npc(id).filter(|npc| npc.is_in_battle) else {
            return NpcTurnOutcome::Done;
        };
        let (origin, action_points, attack_die) = (npc.position, npc.action_points, npc.attack_die);

        let Some((target, target_pos, distance)) = self.nearest_player(origin) else {
            return NpcTurnOutcome::Done;
        };

        if distance <= 1 {
            if action_points < self.config.attack_cost {
                return NpcTurnOutcome::Done;
            }
            self.npc_attack(id, target, target_pos, attack_die);
            self.schedule_npc_action(id);
            return NpcTurnOutcome::Waiting;
        }

        let dest = self.approach_cell(origin, target_pos);
        let Some(next) = self
            .find_path(origin, dest)
            .and_then(|path| path.get(1).copied())
        else {
            debug!("NPC {} has no way towards player {}", id, target);
            return NpcTurnOutcome::Done;
        };
        if action_points < 1 {
            return NpcTurnOutcome::Done;
        }

        let Some(npc) = self.registry.npc_mut(id) else {
            return NpcTurnOutcome::Done;
        };
        npc.position = next;
        npc.action_points -= 1;
        let action_points = npc.action_points;
        self.broadcast(ServerEvent::NpcMoved {
            id: id.to_string(),
            x: next.x,
            y: next.y,
            action_points,
        });
        self.schedule_npc_action(id);
        NpcTurnOutcome::Waiting
    }

    /// Runs a scheduled NPC action and hands the turn on once the NPC is done.
    pub(crate) fn continue_npc_turn(&mut self, id: &str) {
        if self.npc_act(id) == NpcTurnOutcome::Done {
            self.finish_turn();
        }
    }

    fn npc_attack(&mut self, id: &str, target: PlayerId, target_pos: Position, attack_die: i32) {
        let damage = self.roll(attack_die);
        let cost = self.config.attack_cost;
        if let Some(npc) = self.registry.npc_mut(id) {
            npc.action_points -= cost;
        }
        let Some(player) = self.registry.player_mut(&target) else {
            return;
        };
        player.health -= damage;
        let health = player.health;

        let line = format!("NPC {} attacked player {} for {} damage.", id, target, damage);
        self.broadcast(ServerEvent::DamageFeedback {
            attacker: id.to_string(),
            target: target.to_string(),
            damage,
            x: target_pos.x,
            y: target_pos.y,
        });
        self.broadcast(ServerEvent::DamageLog(line.clone()));
        self.broadcast(ServerEvent::ConsoleLog(line));

        if health <= 0 {
            info!("Player {} was killed by NPC {}", target, id);
            self.registry.remove_player(&target);
            self.broadcast(ServerEvent::PlayerRemoved { id: target });
        } else {
            self.broadcast(ServerEvent::PlayerUpdated {
                id: target,
                health: Some(health),
                action_points: None,
            });
        }
    }

    /// Nearest player by Chebyshev distance; the first registered wins ties.
    fn nearest_player(&self, from: Position) -> Option<(PlayerId, Position, i32)> {
        let mut best: Option<(PlayerId, Position, i32)> = None;
        for player in self.registry.players() {
            let distance = from.chebyshev_distance(player.position);
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((player.id, player.position, distance));
            }
        }
        best
    }

    /// Free orthogonal neighbour of `target` closest to `from`, or `target` itself
    /// when every neighbour is taken.
    fn approach_cell(&self, from: Position, target: Position) -> Position {
        let mut best: Option<(Position, i32)> = None;
        for cell in target.cardinal_adjacent_positions() {
            if !self.grid.in_bounds(cell) || self.is_blocked(cell) {
                continue;
            }
            let distance = from.chebyshev_distance(cell);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((cell, distance));
            }
        }
        best.map_or(target, |(cell, _)| cell)
    }

    fn schedule_npc_action(&mut self, id: &str) {
        let due = self.now + self.config.npc_action_interval();
        let task = Task::NpcAction {
            npc: NpcId::from(id),
            battle: self.battle_epoch,
        };
        self.timers.schedule(due, task);
    }
}
