use bevy::prelude::*;

mod dialogue;
mod npc;
mod player;
mod ui;
mod world;

use crate::{
    dialogue::DialoguePlugin, npc::NpcPlugin, player::PlayerPlugin, ui::UiPlugin,
    world::WorldPlugin,
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            DialoguePlugin,
            WorldPlugin,
            NpcPlugin,
            PlayerPlugin,
            UiPlugin, // After DialoguePlugin to receive DialogueBoxRequestEvent
        ))
        .run();
}
