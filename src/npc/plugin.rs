//! NPC plugin wiring villager spawning and tree authoring.
use bevy::prelude::*;

use crate::{
    npc::{
        components::CharacterIdGenerator,
        systems::{author_dialogue_trees, spawn_villagers},
    },
    player::systems::register_player_character,
};

pub struct NpcPlugin;

impl Plugin for NpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CharacterIdGenerator>().add_systems(
            Startup,
            (spawn_villagers, author_dialogue_trees)
                .chain()
                .after(register_player_character),
        );
    }
}
