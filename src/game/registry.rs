//! # Entity Registry
//!
//! Ordered collections of connected players and map NPCs.
//!
//! Registration order is significant: the battle queue lists players and then
//! NPCs in the order they were registered. The registry holds no game rules;
//! callers decide what is legal.

use crate::{NpcId, Npc, Player, PlayerId, Position};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    players: IndexMap<PlayerId, Player>,
    npcs: IndexMap<NpcId, Npc>,
}

impl EntityRegistry {
    /// Creates a registry seeded with a map's NPC roster.
    pub fn new(npcs: impl IntoIterator<Item = Npc>) -> Self {
        let mut registry = Self::default();
        registry.replace_npcs(npcs);
        registry
    }

    /// Registers a player, replacing any player with the same id.
    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Removes a player, keeping the order of the rest.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.shift_remove(id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Checks whether a connected player already plays this character.
    pub fn has_character(&self, name: &str) -> bool {
        self.players.values().any(|p| p.name == name)
    }

    pub fn npc(&self, id: &str) -> Option<&Npc> {
        self.npcs.get(id)
    }

    pub fn npc_mut(&mut self, id: &str) -> Option<&mut Npc> {
        self.npcs.get_mut(id)
    }

    /// Removes an NPC, keeping the order of the rest.
    pub fn remove_npc(&mut self, id: &str) -> Option<Npc> {
        self.npcs.shift_remove(id)
    }

    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    pub fn npcs_mut(&mut self) -> impl Iterator<Item = &mut Npc> {
        self.npcs.values_mut()
    }

    /// Ids of every non-friendly NPC in registration order.
    pub fn hostile_npc_ids(&self) -> Vec<NpcId> {
        self.npcs
            .values()
            .filter(|npc| !npc.friendly)
            .map(|npc| npc.id.clone())
            .collect()
    }

    /// Replaces the NPC roster wholesale.
    pub fn replace_npcs(&mut self, npcs: impl IntoIterator<Item = Npc>) {
        self.npcs = npcs.into_iter().map(|npc| (npc.id.clone(), npc)).collect();
    }

    /// Checks whether any player or NPC stands on a position.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.players.values().any(|p| p.position == pos)
            || self.npcs.values().any(|n| n.position == pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{new_player_id, CharacterSheet, CharacterStats};

    fn player(name: &str, pos: Position) -> Player {
        let sheet = CharacterSheet {
            name: name.to_string(),
            char_class: "warrior".to_string(),
            stats: CharacterStats::default(),
        };
        Player::from_sheet(new_player_id(), &sheet, pos)
    }

    #[test]
    fn test_registration_order_survives_removal() {
        let mut registry = EntityRegistry::default();
        let a = player("a", Position::new(1, 1));
        let b = player("b", Position::new(2, 1));
        let c = player("c", Position::new(3, 1));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        registry.add_player(a);
        registry.add_player(b);
        registry.add_player(c);

        registry.remove_player(&b_id);
        assert_eq!(registry.player_ids(), vec![a_id, c_id]);
    }

    #[test]
    fn test_hostile_ids_skip_friendly() {
        let registry = EntityRegistry::new([
            Npc::hostile("npc1", Position::new(1, 1)),
            Npc::friendly("shopkeeper", Position::new(2, 2), "merchant"),
            Npc::hostile("npc2", Position::new(3, 3)),
        ]);
        assert_eq!(registry.hostile_npc_ids(), vec!["npc1", "npc2"]);
    }

    #[test]
    fn test_occupancy_and_character_names() {
        let mut registry = EntityRegistry::new([Npc::hostile("npc1", Position::new(5, 5))]);
        registry.add_player(player("Aria", Position::new(2, 2)));

        assert!(registry.is_occupied(Position::new(5, 5)));
        assert!(registry.is_occupied(Position::new(2, 2)));
        assert!(!registry.is_occupied(Position::new(3, 3)));
        assert!(registry.has_character("Aria"));
        assert!(!registry.has_character("Bran"));

        registry.remove_npc("npc1");
        assert!(!registry.is_occupied(Position::new(5, 5)));
    }
}
