//! Systems for the world module: scene setup and the proximity sweep.
use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::{
    dialogue::{
        events::{RangeEnteredEvent, RangeExitedEvent},
        roster::CharacterId,
        settings::DialogueSettings,
    },
    world::components::{ordered_pair, ProximityLedger, WorldCamera},
};

const GROUND_COLOR: Color = Color::srgb_u8(74, 102, 58);
const GROUND_SIZE: Vec2 = Vec2::new(2048.0, 2048.0);

/// Spawns the camera and a flat ground backdrop.
pub fn spawn_world_environment(mut commands: Commands) {
    commands.spawn((Camera2d, WorldCamera));

    commands.spawn((
        Sprite::from_color(GROUND_COLOR, GROUND_SIZE),
        Transform::from_xyz(0.0, 0.0, -10.0),
    ));
}

/// Compares every character pair against the interaction range and emits
/// enter/exit events for pairs that crossed the boundary since last tick.
/// Events fire once per direction so each character's range set stays
/// symmetric.
pub fn detect_proximity(
    settings: Res<DialogueSettings>,
    mut ledger: ResMut<ProximityLedger>,
    characters: Query<(&CharacterId, &Transform)>,
    mut entered: MessageWriter<RangeEnteredEvent>,
    mut exited: MessageWriter<RangeExitedEvent>,
) {
    let positions: Vec<(CharacterId, Vec2)> = characters
        .iter()
        .map(|(id, transform)| (*id, transform.translation.truncate()))
        .collect();

    let range_squared = settings.interaction_range * settings.interaction_range;
    let mut current: BTreeSet<(CharacterId, CharacterId)> = BTreeSet::new();
    for (index, (a, a_pos)) in positions.iter().enumerate() {
        for (b, b_pos) in positions.iter().skip(index + 1) {
            if a_pos.distance_squared(*b_pos) <= range_squared {
                current.insert(ordered_pair(*a, *b));
            }
        }
    }

    let (new_pairs, gone_pairs) = ledger.replace(current);
    for (a, b) in new_pairs {
        debug!("{} and {} are now in range", a, b);
        entered.write(RangeEnteredEvent {
            character: a,
            other: b,
        });
        entered.write(RangeEnteredEvent {
            character: b,
            other: a,
        });
    }
    for (a, b) in gone_pairs {
        debug!("{} and {} drifted apart", a, b);
        exited.write(RangeExitedEvent {
            character: a,
            other: b,
        });
        exited.write(RangeExitedEvent {
            character: b,
            other: a,
        });
    }
}
