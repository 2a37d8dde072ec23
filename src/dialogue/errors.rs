//! Error types surfaced by the conversation handler.
use std::fmt;

use super::{conversation::ConversationId, fsm::StateId};

/// Failure modes of handler operations. All of these are handled locally:
/// nothing propagates to the UI layer, which only ever observes explicit
/// print/activate/deactivate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationError {
    /// The initiator (or a required participant) is already locked, or the
    /// start gate did not pass. Callers silently retry on the next proximity
    /// check.
    NotEligible,
    /// The referenced id is not in the active map. A benign race: delayed
    /// input events routinely arrive after cancellation.
    UnknownConversation { id: ConversationId },
    /// The choice index has no mapping in the current state. Choice turns
    /// ignore this and keep waiting.
    NoSuchTransition { state: StateId, choice: u8 },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEligible => write!(f, "participants not eligible to start a conversation"),
            Self::UnknownConversation { id } => write!(f, "{} is not active", id),
            Self::NoSuchTransition { state, choice } => {
                write!(f, "{} has no transition for choice {}", state, choice)
            }
        }
    }
}

impl std::error::Error for ConversationError {}
