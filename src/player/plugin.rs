//! Player plugin wiring spawning, input, and movement.
use bevy::prelude::*;

use crate::player::{
    components::MovementLocked,
    systems::{
        apply_movement_lock, move_player, read_dialogue_input, register_player_character,
        spawn_player,
    },
};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MovementLocked>()
            .add_systems(Startup, (register_player_character, spawn_player).chain())
            .add_systems(
                Update,
                (
                    read_dialogue_input,
                    apply_movement_lock,
                    move_player.after(apply_movement_lock),
                ),
            );
    }
}
