//! NPC-specific components and supporting resources.
use bevy::prelude::*;

use crate::dialogue::roster::CharacterId;

/// Identity data attached to every villager entity.
#[derive(Component, Debug, Clone)]
pub struct Identity {
    pub id: CharacterId,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: CharacterId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Issues monotonically increasing character ids. Id 0 belongs to the
/// player, so the counter starts at 1.
#[derive(Resource)]
pub struct CharacterIdGenerator {
    next: u64,
}

impl Default for CharacterIdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl CharacterIdGenerator {
    pub fn next_id(&mut self) -> CharacterId {
        let id = self.next;
        self.next += 1;
        CharacterId::new(id)
    }
}

/// Ids of the spawned villagers, published for the tree loader.
#[derive(Resource, Debug, Clone, Copy)]
pub struct VillageCast {
    pub maren: CharacterId,
    pub tam: CharacterId,
    pub edda: CharacterId,
}
