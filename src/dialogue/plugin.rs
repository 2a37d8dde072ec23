//! Dialogue plugin wiring conversation resources and systems.
use bevy::prelude::*;

use super::{
    events::{
        AdvanceInputEvent, BoxPrintingFinishedEvent, BoxPrintingStartedEvent, ChoiceInputEvent,
        ConversationEndedEvent, ConversationStartedEvent, DialogueBoxRequestEvent,
        InteractInputEvent, MovementLockEvent, RangeEnteredEvent, RangeExitedEvent,
    },
    handler::{ConversationGate, ConversationHandler},
    library::DialogueLibrary,
    roster::CharacterRoster,
    settings::DialogueSettings,
    systems::{
        apply_proximity_events, drain_dialogue_commands, drive_conversations,
        handle_interact_requests,
    },
};

pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DialogueSettings::load_or_default())
            .init_resource::<DialogueLibrary>()
            .init_resource::<CharacterRoster>()
            .init_resource::<ConversationHandler>()
            .init_resource::<ConversationGate>()
            .add_event::<RangeEnteredEvent>()
            .add_event::<RangeExitedEvent>()
            .add_event::<InteractInputEvent>()
            .add_event::<AdvanceInputEvent>()
            .add_event::<ChoiceInputEvent>()
            .add_event::<BoxPrintingStartedEvent>()
            .add_event::<BoxPrintingFinishedEvent>()
            .add_event::<DialogueBoxRequestEvent>()
            .add_event::<MovementLockEvent>()
            .add_event::<ConversationStartedEvent>()
            .add_event::<ConversationEndedEvent>()
            .add_systems(
                Update,
                (
                    apply_proximity_events,
                    handle_interact_requests,
                    drive_conversations,
                    drain_dialogue_commands,
                )
                    .chain(),
            );
    }
}
