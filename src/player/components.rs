//! Player-specific components and resources.
use bevy::prelude::*;

/// Marker component for the player entity.
#[derive(Component, Default)]
pub struct Player;

/// Set while a player conversation is running; movement systems stand down.
#[derive(Resource, Debug, Default)]
pub struct MovementLocked {
    pub locked: bool,
}
