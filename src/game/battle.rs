//! # Turn Scheduler
//!
//! Battle lifecycle: entering battle, rotating the turn queue, handing out action
//! points, and falling back to free mode once no engaged NPC or no player is left.
//!
//! Invariant while in battle: at most one combatant has its turn flag set, and it
//! is the head of the queue.

use crate::{EntityRegistry, GameWorld, NpcId, NpcTurnOutcome, PlayerId, ServerEvent};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Process-wide play mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Real-time exploration with unlimited movement
    #[default]
    Free,
    /// Strict turn order against hostile NPCs
    Battle,
}

/// An entry of the battle queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Combatant {
    Player(PlayerId),
    Npc(NpcId),
}

/// Turn order for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleQueue {
    entries: VecDeque<Combatant>,
}

impl BattleQueue {
    /// Builds a fresh round: every player, then every non-friendly NPC, each in
    /// registration order.
    pub fn build(registry: &EntityRegistry) -> Self {
        let players = registry.player_ids().into_iter().map(Combatant::Player);
        let npcs = registry.hostile_npc_ids().into_iter().map(Combatant::Npc);
        Self {
            entries: players.chain(npcs).collect(),
        }
    }

    pub fn front(&self) -> Option<&Combatant> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<Combatant> {
        self.entries.pop_front()
    }

    pub fn contains(&self, combatant: &Combatant) -> bool {
        self.entries.contains(combatant)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Combatant> {
        self.entries.iter().cloned().collect()
    }

    /// Drops entries that no longer reference a registered entity.
    pub fn prune(&mut self, registry: &EntityRegistry) {
        self.entries.retain(|entry| match entry {
            Combatant::Player(id) => registry.player(id).is_some(),
            Combatant::Npc(id) => registry.npc(id).is_some(),
        });
    }
}

impl GameWorld {
    /// Enters battle mode.
    ///
    /// Builds the queue, cancels every in-flight move, gives each hostile NPC its
    /// allotment and activates the head. An NPC head acts immediately, right after
    /// the `battleMode` broadcast.
    pub fn start_battle(&mut self) {
        if self.mode == GameMode::Battle {
            return;
        }
        self.mode = GameMode::Battle;
        self.battle_epoch += 1;

        for player in self.registry.players_mut() {
            player.animation = None;
            player.is_turn = false;
        }
        let npc_points = self.config.npc_turn_points;
        for npc in self.registry.npcs_mut().filter(|npc| !npc.friendly) {
            npc.action_points = npc_points;
            npc.is_turn = false;
        }

        self.queue = BattleQueue::build(&self.registry);
        info!("Battle started with {} combatants", self.queue.len());

        let head = self.queue.front().cloned();
        if let Some(head) = &head {
            self.activate(head);
        }
        self.broadcast(ServerEvent::BattleMode {
            battle_queue: self.queue.to_vec(),
            game_mode: self.mode,
            players: self.player_snapshots(),
            npcs: self.npc_snapshots(),
            terrain: self.terrain_snapshot(),
        });

        if let Some(Combatant::Npc(id)) = head {
            if self.npc_act(&id) == NpcTurnOutcome::Done {
                self.finish_turn();
            }
        }
    }

    /// Ends the active turn and activates the next combatant.
    ///
    /// NPC heads act right away; an NPC with nothing to do hands the turn on within
    /// the same call, so this only returns once a player holds the turn, an NPC is
    /// waiting on its pacing timer, or the battle is over.
    pub fn finish_turn(&mut self) {
        loop {
            if self.mode != GameMode::Battle {
                return;
            }

            let previous = self.queue.front().cloned();
            self.prune_battle_queue();
            if self.check_battle_over() {
                return;
            }

            if let Some(previous) = previous {
                // A head that was pruned already left the queue
                if self.queue.front() == Some(&previous) {
                    self.queue.pop_front();
                }
                self.set_turn_flag(&previous, false);
            }

            if self.queue.is_empty() {
                self.queue = BattleQueue::build(&self.registry);
            }

            let Some(next) = self.queue.front().cloned() else {
                return;
            };
            self.activate(&next);
            self.broadcast(ServerEvent::TurnUpdate {
                battle_queue: self.queue.to_vec(),
                players: self.player_snapshots(),
                npcs: self.npc_snapshots(),
            });

            match next {
                Combatant::Npc(id) if self.npc_act(&id) == NpcTurnOutcome::Done => continue,
                _ => return,
            }
        }
    }

    /// Reverts to free mode when no player is registered or no NPC is engaged.
    ///
    /// Returns `true` when the world is (now) out of battle. `battleEnded` fires
    /// only on the actual transition.
    pub fn check_battle_over(&mut self) -> bool {
        if self.mode != GameMode::Battle {
            return true;
        }

        let reason = if self.registry.player_count() == 0 {
            "No players remain"
        } else if !self.registry.npcs().any(|npc| npc.is_in_battle) {
            "No engaged NPCs remain"
        } else {
            return false;
        };

        info!("{}. Ending battle mode and switching to free mode.", reason);
        self.mode = GameMode::Free;
        self.queue.clear();
        self.battle_epoch += 1;
        for player in self.registry.players_mut() {
            player.is_turn = false;
        }
        for npc in self.registry.npcs_mut() {
            npc.is_turn = false;
        }
        self.broadcast(ServerEvent::BattleEnded {
            game_mode: self.mode,
            players: self.player_snapshots(),
            npcs: self.npc_snapshots(),
        });
        true
    }

    /// Drops queue entries whose entity has left the registry.
    pub fn prune_battle_queue(&mut self) {
        self.queue.prune(&self.registry);
    }

    /// Whether this combatant holds the active battle turn.
    pub fn is_active(&self, combatant: &Combatant) -> bool {
        self.mode == GameMode::Battle && self.queue.front() == Some(combatant)
    }

    /// Counts entities whose turn flag is set.
    pub fn active_turn_count(&self) -> usize {
        self.registry.players().filter(|p| p.is_turn).count()
            + self.registry.npcs().filter(|n| n.is_turn).count()
    }

    fn activate(&mut self, combatant: &Combatant) {
        match combatant {
            Combatant::Player(id) => {
                let points = self.config.player_turn_points;
                if let Some(player) = self.registry.player_mut(id) {
                    player.is_turn = true;
                    player.action_points = points;
                }
            }
            Combatant::Npc(id) => {
                let points = self.config.npc_turn_points;
                if let Some(npc) = self.registry.npc_mut(id) {
                    npc.is_turn = true;
                    npc.action_points = points;
                }
            }
        }
    }

    fn set_turn_flag(&mut self, combatant: &Combatant, value: bool) {
        match combatant {
            Combatant::Player(id) => {
                if let Some(player) = self.registry.player_mut(id) {
                    player.is_turn = value;
                }
            }
            Combatant::Npc(id) => {
                if let Some(npc) = self.registry.npc_mut(id) {
                    npc.is_turn = value;
                }
            }
        }
    }
}
