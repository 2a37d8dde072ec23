//! UI modules layered over the world view.
pub mod dialogue_box;

use bevy::prelude::*;

use dialogue_box::DialogueBoxPlugin;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DialogueBoxPlugin);
    }
}
