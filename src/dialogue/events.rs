//! Events crossing the dialogue module boundary.
use bevy::prelude::{Event, Message};

use super::{conversation::ConversationId, handler::DialogueCommand, roster::CharacterId};

/// Fired by the proximity sweep when `other` enters `character`'s
/// interaction range. One event per direction of the pair.
#[derive(Event, Message, Debug, Clone)]
pub struct RangeEnteredEvent {
    pub character: CharacterId,
    pub other: CharacterId,
}

/// Counterpart of [`RangeEnteredEvent`] for characters drifting apart.
#[derive(Event, Message, Debug, Clone)]
pub struct RangeExitedEvent {
    pub character: CharacterId,
    pub other: CharacterId,
}

/// Player pressed the interact key: attempt to start a conversation.
#[derive(Event, Message, Debug, Clone)]
pub struct InteractInputEvent;

/// Player pressed the advance key while a line was waiting.
#[derive(Event, Message, Debug, Clone)]
pub struct AdvanceInputEvent;

/// Player pressed a numbered choice key.
#[derive(Event, Message, Debug, Clone)]
pub struct ChoiceInputEvent {
    pub index: u8,
}

/// Fired by a dialogue box when its typewriter starts revealing a line.
#[derive(Event, Message, Debug, Clone)]
pub struct BoxPrintingStartedEvent {
    pub character: CharacterId,
}

/// Fired by a dialogue box once its typewriter has revealed the full line.
#[derive(Event, Message, Debug, Clone)]
pub struct BoxPrintingFinishedEvent {
    pub character: CharacterId,
}

/// Box-facing side effect forwarded from the handler's outbox to the UI.
#[derive(Event, Message, Debug, Clone)]
pub struct DialogueBoxRequestEvent {
    pub command: DialogueCommand,
}

/// Raised when the player's movement should be frozen or released.
#[derive(Event, Message, Debug, Clone)]
pub struct MovementLockEvent {
    pub locked: bool,
}

#[derive(Event, Message, Debug, Clone)]
pub struct ConversationStartedEvent {
    pub conversation: ConversationId,
}

/// `cancelled` distinguishes a player interruption from a natural finish.
#[derive(Event, Message, Debug, Clone)]
pub struct ConversationEndedEvent {
    pub conversation: ConversationId,
    pub cancelled: bool,
}
