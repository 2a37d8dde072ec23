//! Systems connecting the conversation handler to proximity, input, and UI.
use bevy::prelude::*;

use super::{
    events::{
        AdvanceInputEvent, BoxPrintingFinishedEvent, BoxPrintingStartedEvent, ChoiceInputEvent,
        ConversationEndedEvent, ConversationStartedEvent, DialogueBoxRequestEvent,
        InteractInputEvent, MovementLockEvent, RangeEnteredEvent, RangeExitedEvent,
    },
    handler::{ConversationGate, ConversationHandler, DialogueCommand},
    library::DialogueLibrary,
    roster::{CharacterId, CharacterRoster},
    settings::DialogueSettings,
};

/// Applies proximity changes to the roster. An NPC whose range set just grew
/// immediately looks for an eligible tree; the player only starts
/// conversations through the interact key.
pub fn apply_proximity_events(
    mut entered: MessageReader<RangeEnteredEvent>,
    mut exited: MessageReader<RangeExitedEvent>,
    mut handler: ResMut<ConversationHandler>,
    mut roster: ResMut<CharacterRoster>,
    library: Res<DialogueLibrary>,
    gate: Res<ConversationGate>,
) {
    for event in exited.read() {
        roster.remove_in_range(event.character, event.other);
    }
    for event in entered.read() {
        roster.add_in_range(event.character, event.other);
        if !roster.is_player(event.character) {
            handler.check_for_and_activate_conversation(
                event.character,
                &library,
                &mut roster,
                &gate,
            );
        }
    }
}

/// Runs the player's activation sweep when the interact key fires.
pub fn handle_interact_requests(
    mut interactions: MessageReader<InteractInputEvent>,
    mut handler: ResMut<ConversationHandler>,
    mut roster: ResMut<CharacterRoster>,
    library: Res<DialogueLibrary>,
    gate: Res<ConversationGate>,
) {
    if interactions.read().next().is_none() {
        return;
    }
    if handler
        .check_for_and_activate_conversation(CharacterId::player(), &library, &mut roster, &gate)
        .is_none()
    {
        debug!("Interact pressed with nobody to talk to");
    }
}

/// Per-tick conversation driver: routes printing reports to their owning
/// conversations, then steps every active instance once.
pub fn drive_conversations(
    time: Res<Time>,
    settings: Res<DialogueSettings>,
    mut started: MessageReader<BoxPrintingStartedEvent>,
    mut finished: MessageReader<BoxPrintingFinishedEvent>,
    mut advances: MessageReader<AdvanceInputEvent>,
    mut choices: MessageReader<ChoiceInputEvent>,
    mut handler: ResMut<ConversationHandler>,
    mut roster: ResMut<CharacterRoster>,
    library: Res<DialogueLibrary>,
) {
    for event in started.read() {
        let Some(conversation) = roster.lock_of(event.character).conversation() else {
            continue;
        };
        if let Err(err) = handler.character_started_printing(conversation, event.character) {
            debug!("Ignoring printing report: {err}");
        }
    }
    for event in finished.read() {
        // A box can outlive its conversation by a tick; stale reports are
        // dropped here.
        let Some(conversation) = roster.lock_of(event.character).conversation() else {
            continue;
        };
        if let Err(err) = handler.character_stopped_printing(conversation, event.character) {
            debug!("Ignoring printing report: {err}");
        }
    }

    let advance = advances.read().next().is_some();
    let selected: Vec<u8> = choices.read().map(|event| event.index).collect();
    let delta = time.delta_secs();

    for id in handler.active_ids() {
        handler.step_conversation(
            id,
            delta,
            advance,
            &selected,
            settings.auto_advance_dwell_seconds,
            &library,
            &mut roster,
        );
    }
}

/// Forwards the handler's queued side effects to their listeners.
pub fn drain_dialogue_commands(
    mut handler: ResMut<ConversationHandler>,
    mut boxes: MessageWriter<DialogueBoxRequestEvent>,
    mut locks: MessageWriter<MovementLockEvent>,
    mut started: MessageWriter<ConversationStartedEvent>,
    mut ended: MessageWriter<ConversationEndedEvent>,
) {
    for command in handler.take_commands() {
        match command {
            DialogueCommand::LockMovement => {
                locks.write(MovementLockEvent { locked: true });
            }
            DialogueCommand::UnlockMovement => {
                locks.write(MovementLockEvent { locked: false });
            }
            DialogueCommand::Started { conversation } => {
                started.write(ConversationStartedEvent { conversation });
            }
            DialogueCommand::Ended { conversation } => {
                ended.write(ConversationEndedEvent {
                    conversation,
                    cancelled: false,
                });
            }
            DialogueCommand::Cancelled { conversation } => {
                ended.write(ConversationEndedEvent {
                    conversation,
                    cancelled: true,
                });
            }
            other => {
                boxes.write(DialogueBoxRequestEvent { command: other });
            }
        }
    }
}
