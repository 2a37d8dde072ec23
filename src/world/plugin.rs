//! World plugin wiring scene setup and the proximity sweep.
use bevy::prelude::*;

use crate::{
    dialogue::systems::apply_proximity_events,
    world::{
        components::ProximityLedger,
        systems::{detect_proximity, spawn_world_environment},
    },
};

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProximityLedger>()
            .add_systems(Startup, spawn_world_environment)
            .add_systems(Update, detect_proximity.before(apply_proximity_events));
    }
}
