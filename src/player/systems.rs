//! Player spawning, movement, and dialogue input.
use bevy::prelude::*;

use crate::{
    dialogue::{
        events::{AdvanceInputEvent, ChoiceInputEvent, InteractInputEvent, MovementLockEvent},
        fsm::MAX_CHOICE_INDEX,
        roster::{CharacterId, CharacterRoster},
    },
    player::components::{MovementLocked, Player},
};

const PLAYER_COLOR: Color = Color::srgb_u8(230, 220, 170);
const PLAYER_SIZE: Vec2 = Vec2::new(24.0, 32.0);
const PLAYER_SPEED: f32 = 140.0;

const CHOICE_KEYS: [(KeyCode, u8); 9] = [
    (KeyCode::Digit1, 1),
    (KeyCode::Digit2, 2),
    (KeyCode::Digit3, 3),
    (KeyCode::Digit4, 4),
    (KeyCode::Digit5, 5),
    (KeyCode::Digit6, 6),
    (KeyCode::Digit7, 7),
    (KeyCode::Digit8, 8),
    (KeyCode::Digit9, 9),
];

/// Puts the player's id in the roster before any tree references it.
pub fn register_player_character(mut roster: ResMut<CharacterRoster>) {
    roster.register_character(CharacterId::player(), "Player", true);
}

pub fn spawn_player(mut commands: Commands) {
    commands.spawn((
        Sprite::from_color(PLAYER_COLOR, PLAYER_SIZE),
        Transform::from_xyz(0.0, -60.0, 0.0),
        CharacterId::player(),
        Player,
    ));
}

/// Translates raw key presses into dialogue input events. E interacts,
/// Space or Enter advances, and the digit row selects choices.
pub fn read_dialogue_input(
    keys: Res<ButtonInput<KeyCode>>,
    mut interacts: MessageWriter<InteractInputEvent>,
    mut advances: MessageWriter<AdvanceInputEvent>,
    mut choices: MessageWriter<ChoiceInputEvent>,
) {
    if keys.just_pressed(KeyCode::KeyE) {
        interacts.write(InteractInputEvent);
    }
    if keys.just_pressed(KeyCode::Space) || keys.just_pressed(KeyCode::Enter) {
        advances.write(AdvanceInputEvent);
    }
    for (key, index) in CHOICE_KEYS {
        if keys.just_pressed(key) {
            debug_assert!(index <= MAX_CHOICE_INDEX);
            choices.write(ChoiceInputEvent { index });
        }
    }
}

/// Mirrors movement-lock events into the [`MovementLocked`] resource.
pub fn apply_movement_lock(
    mut events: MessageReader<MovementLockEvent>,
    mut movement: ResMut<MovementLocked>,
) {
    for event in events.read() {
        movement.locked = event.locked;
        debug!("Player movement locked: {}", event.locked);
    }
}

/// WASD / arrow-key movement, suspended while a conversation holds the lock.
pub fn move_player(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    movement: Res<MovementLocked>,
    mut players: Query<&mut Transform, With<Player>>,
) {
    if movement.locked {
        return;
    }

    let mut direction = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        direction.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        direction.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        direction.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        direction.x += 1.0;
    }
    if direction == Vec2::ZERO {
        return;
    }

    let step = direction.normalize() * PLAYER_SPEED * time.delta_secs();
    for mut transform in players.iter_mut() {
        transform.translation += step.extend(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_events_toggle_the_resource() {
        let mut app = App::new();
        app.add_event::<MovementLockEvent>()
            .init_resource::<MovementLocked>()
            .add_systems(Update, apply_movement_lock);
        app.add_systems(Startup, |mut writer: MessageWriter<MovementLockEvent>| {
            writer.write(MovementLockEvent { locked: true });
        });

        app.update();
        assert!(app.world().resource::<MovementLocked>().locked);
    }

    #[test]
    fn locked_player_does_not_move() {
        let mut app = App::new();
        app.init_resource::<Time>()
            .insert_resource(MovementLocked { locked: true })
            .init_resource::<ButtonInput<KeyCode>>()
            .add_systems(Update, move_player);

        let player = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 0.0), Player))
            .id();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyW);

        app.update();

        let transform = app.world().entity(player).get::<Transform>().unwrap();
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 0.0));
    }
}
