//! Dialogue box components: one screen-space box per speaking character.
use std::collections::HashMap;

use bevy::prelude::*;

use crate::dialogue::roster::CharacterId;

/// What a box is currently doing with its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxState {
    /// Created but nothing printed yet.
    Idle,
    /// Revealing a line character by character.
    Typing,
    /// Showing a fully revealed line or choice menu.
    Revealed,
}

/// A dialogue box bound to one character for the lifetime of a conversation.
#[derive(Component, Debug)]
pub struct DialogueBox {
    character: CharacterId,
    text: String,
    revealed: f32,
    state: BoxState,
    finished_reported: bool,
}

impl DialogueBox {
    /// An empty box, spawned when a conversation claims the character.
    pub fn idle(character: CharacterId) -> Self {
        Self {
            character,
            text: String::new(),
            revealed: 0.0,
            state: BoxState::Idle,
            finished_reported: false,
        }
    }

    /// A box starting to type out `line`.
    pub fn printing(character: CharacterId, line: impl Into<String>) -> Self {
        Self {
            character,
            text: line.into(),
            revealed: 0.0,
            state: BoxState::Typing,
            finished_reported: false,
        }
    }

    /// A box showing a choice menu. Menus appear at once and never report a
    /// printing-finished event.
    pub fn menu(character: CharacterId, menu_text: impl Into<String>) -> Self {
        let text = menu_text.into();
        let revealed = text.chars().count() as f32;
        Self {
            character,
            text,
            revealed,
            state: BoxState::Revealed,
            finished_reported: true,
        }
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    /// Advances the typewriter by `chars` characters. Returns true exactly
    /// once, on the tick the full line becomes visible.
    pub fn advance(&mut self, chars: f32) -> bool {
        if self.state != BoxState::Typing {
            return false;
        }
        let total = self.text.chars().count() as f32;
        self.revealed = (self.revealed + chars).min(total);
        if self.revealed >= total {
            self.state = BoxState::Revealed;
            if !self.finished_reported {
                self.finished_reported = true;
                return true;
            }
        }
        false
    }

    /// The currently visible prefix of the line.
    pub fn visible_text(&self) -> String {
        self.text.chars().take(self.revealed as usize).collect()
    }

    pub fn is_revealed(&self) -> bool {
        self.state == BoxState::Revealed
    }
}

/// Screen-space anchor: the world entity this box hovers above.
#[derive(Component, Debug)]
pub struct BoxAnchor {
    pub speaker: Entity,
}

/// Root node that all dialogue boxes are parented to.
#[derive(Resource)]
pub struct DialogueBoxUiRoot(pub Entity);

/// Maps characters to their live box entities. One box per character.
#[derive(Resource, Debug, Default)]
pub struct DialogueBoxTracker {
    pub by_character: HashMap<CharacterId, Entity>,
}
