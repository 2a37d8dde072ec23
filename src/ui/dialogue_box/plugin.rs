//! Plugin registration for dialogue box systems.
use bevy::prelude::*;

use super::{
    components::DialogueBoxTracker,
    systems::{
        advance_typewriters, apply_box_requests, position_dialogue_boxes, setup_dialogue_box_root,
    },
};

pub struct DialogueBoxPlugin;

impl Plugin for DialogueBoxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogueBoxTracker>()
            .add_systems(Startup, setup_dialogue_box_root)
            .add_systems(
                Update,
                (
                    apply_box_requests,
                    advance_typewriters.after(apply_box_requests),
                    position_dialogue_boxes.after(advance_typewriters),
                ),
            );
    }
}
