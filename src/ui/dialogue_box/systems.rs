//! Systems for spawning, typing, and positioning dialogue boxes.
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::{
    dialogue::{
        events::{BoxPrintingFinishedEvent, BoxPrintingStartedEvent, DialogueBoxRequestEvent},
        handler::DialogueCommand,
        roster::CharacterId,
        settings::DialogueSettings,
    },
    world::components::WorldCamera,
};

use super::components::{BoxAnchor, DialogueBox, DialogueBoxTracker, DialogueBoxUiRoot};

const BACKGROUND_COLOR: Color = Color::srgba(0.08, 0.08, 0.1, 0.9);
const TEXT_COLOR: Color = Color::srgb(0.95, 0.95, 0.9);
const MAX_WIDTH_PX: f32 = 260.0;
const PADDING_PX: f32 = 8.0;
const FONT_SIZE: f32 = 16.0;
const VERTICAL_OFFSET: f32 = 28.0;

/// Sets up the full-screen overlay that dialogue boxes are parented to.
pub fn setup_dialogue_box_root(mut commands: Commands) {
    let root = commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .insert(ZIndex(100))
        .insert(BackgroundColor(Color::NONE))
        .id();

    commands.insert_resource(DialogueBoxUiRoot(root));
}

/// Applies the handler's box commands: create, print, show choices, destroy.
pub fn apply_box_requests(
    mut commands: Commands,
    mut tracker: ResMut<DialogueBoxTracker>,
    mut events: MessageReader<DialogueBoxRequestEvent>,
    mut started: MessageWriter<BoxPrintingStartedEvent>,
    characters: Query<(Entity, &CharacterId)>,
    root: Res<DialogueBoxUiRoot>,
) {
    for event in events.read() {
        match &event.command {
            DialogueCommand::CreateBox { character, .. } => {
                create_box(&mut commands, &mut tracker, &characters, &root, *character);
            }
            DialogueCommand::Print {
                character, line, ..
            } => {
                let Some(&entity) = tracker.by_character.get(character) else {
                    warn!("Print for {} with no box", character);
                    continue;
                };
                commands
                    .entity(entity)
                    .insert(DialogueBox::printing(*character, line.clone()));
                started.write(BoxPrintingStartedEvent {
                    character: *character,
                });
            }
            DialogueCommand::PrintChoices {
                character, options, ..
            } => {
                let Some(&entity) = tracker.by_character.get(character) else {
                    warn!("Choice menu for {} with no box", character);
                    continue;
                };
                commands
                    .entity(entity)
                    .insert(DialogueBox::menu(*character, render_menu(options)));
            }
            DialogueCommand::DestroyBox { character } => {
                if let Some(entity) = tracker.by_character.remove(character) {
                    commands.entity(entity).despawn();
                }
            }
            other => {
                debug!("Dialogue box layer ignoring {:?}", other);
            }
        }
    }
}

fn create_box(
    commands: &mut Commands,
    tracker: &mut DialogueBoxTracker,
    characters: &Query<(Entity, &CharacterId)>,
    root: &DialogueBoxUiRoot,
    character: CharacterId,
) {
    if tracker.by_character.contains_key(&character) {
        return;
    }
    let Some((speaker, _)) = characters.iter().find(|(_, id)| **id == character) else {
        warn!("Cannot create dialogue box: {} has no entity", character);
        return;
    };

    let entity = commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                max_width: Val::Px(MAX_WIDTH_PX),
                padding: UiRect::all(Val::Px(PADDING_PX)),
                display: Display::None,
                ..default()
            },
            BackgroundColor(BACKGROUND_COLOR),
            ZIndex(101),
            DialogueBox::idle(character),
            BoxAnchor { speaker },
            Text::new(""),
            TextFont {
                font_size: FONT_SIZE,
                ..default()
            },
            TextColor(TEXT_COLOR),
        ))
        .id();

    commands.entity(root.0).add_child(entity);
    tracker.by_character.insert(character, entity);
}

fn render_menu(options: &[(u8, String)]) -> String {
    options
        .iter()
        .map(|(index, label)| format!("{}) {}", index, label))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reveals each typing box a little further and reports finished lines.
pub fn advance_typewriters(
    time: Res<Time>,
    settings: Res<DialogueSettings>,
    mut boxes: Query<(&mut DialogueBox, &mut Text)>,
    mut finished: MessageWriter<BoxPrintingFinishedEvent>,
) {
    let chars = settings.characters_per_second * time.delta_secs();
    for (mut shown, mut text) in boxes.iter_mut() {
        let done = shown.advance(chars);
        let visible = shown.visible_text();
        if text.0 != visible {
            *text = Text::new(visible);
        }
        if done {
            finished.write(BoxPrintingFinishedEvent {
                character: shown.character(),
            });
        }
    }
}

/// Keeps each box hovering above its speaker in screen space.
pub fn position_dialogue_boxes(
    mut commands: Commands,
    mut tracker: ResMut<DialogueBoxTracker>,
    camera_query: Query<(&Camera, &GlobalTransform), With<WorldCamera>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    speakers: Query<&GlobalTransform, Without<DialogueBox>>,
    mut boxes: Query<(Entity, &DialogueBox, &BoxAnchor, &mut Node)>,
) {
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Ok(window) = window_query.single() else {
        return;
    };
    let window_height = window.resolution.height();

    for (entity, shown, anchor, mut node) in boxes.iter_mut() {
        let Ok(speaker_transform) = speakers.get(anchor.speaker) else {
            // Speaker entity is gone; the box goes with it.
            tracker.by_character.remove(&shown.character());
            commands.entity(entity).despawn();
            continue;
        };

        let mut world_position = speaker_transform.translation();
        world_position.y += VERTICAL_OFFSET;

        let Ok(viewport_position) = camera.world_to_viewport(camera_transform, world_position)
        else {
            node.display = Display::None;
            continue;
        };

        // UI origin is top-left, so flip Y.
        node.display = Display::Flex;
        node.left = Val::Px(viewport_position.x);
        node.top = Val::Px(window_height - viewport_position.y);
    }
}
