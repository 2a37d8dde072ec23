//! Per-character conversation bookkeeping: locks, in-range sets, owned trees.
//!
//! Characters are tracked by id in a flat table rather than holding references
//! to each other or to the handler; the lock carries the bound conversation id
//! so nothing points back into the active-instance map.
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use bevy::prelude::*;

use super::{conversation::ConversationId, library::FsmId};

/// Unique identifier for a speaking character. Id 0 is reserved for the
/// player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Component)]
pub struct CharacterId(u64);

impl CharacterId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn player() -> Self {
        Self(0)
    }

    pub fn is_player(self) -> bool {
        self.0 == 0
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_player() {
            write!(f, "Player")
        } else {
            write!(f, "CH-{:03}", self.0)
        }
    }
}

/// Mutually exclusive conversation lock. A character holds at most one, and
/// it names the conversation that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationLock {
    #[default]
    Free,
    InNpcConversation(ConversationId),
    InPlayerConversation(ConversationId),
}

impl ConversationLock {
    pub fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    /// The conversation currently binding this character, if any.
    pub fn conversation(self) -> Option<ConversationId> {
        match self {
            Self::Free => None,
            Self::InNpcConversation(id) | Self::InPlayerConversation(id) => Some(id),
        }
    }
}

/// Everything the dialogue core tracks about one character.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub name: String,
    pub is_player: bool,
    pub lock: ConversationLock,
    pub in_range: BTreeSet<CharacterId>,
    /// Trees whose initiating participant is this character, in registration
    /// order. Order matters: the first eligible tree wins.
    pub trees: Vec<FsmId>,
}

impl CharacterRecord {
    fn new(name: impl Into<String>, is_player: bool) -> Self {
        Self {
            name: name.into(),
            is_player,
            lock: ConversationLock::Free,
            in_range: BTreeSet::new(),
            trees: Vec::new(),
        }
    }
}

/// Table of every character able to speak, keyed by id.
#[derive(Resource, Debug, Default)]
pub struct CharacterRoster {
    characters: HashMap<CharacterId, CharacterRecord>,
}

impl CharacterRoster {
    pub fn register_character(
        &mut self,
        id: CharacterId,
        name: impl Into<String>,
        is_player: bool,
    ) {
        let previous = self
            .characters
            .insert(id, CharacterRecord::new(name, is_player));
        debug_assert!(previous.is_none(), "character id registered twice: {id}");
    }

    /// Registers a tree against its initiating character. Called by the tree
    /// loader at startup.
    pub fn add_fsm(&mut self, character: CharacterId, fsm: FsmId) {
        if let Some(record) = self.characters.get_mut(&character) {
            record.trees.push(fsm);
        } else {
            warn!("Ignoring tree registration for unknown character {character}");
        }
    }

    /// Idempotent: adding a character already in range is a no-op.
    pub fn add_in_range(&mut self, character: CharacterId, other: CharacterId) {
        if character == other {
            return;
        }
        if let Some(record) = self.characters.get_mut(&character) {
            record.in_range.insert(other);
        }
    }

    /// Idempotent removal.
    pub fn remove_in_range(&mut self, character: CharacterId, other: CharacterId) {
        if let Some(record) = self.characters.get_mut(&character) {
            record.in_range.remove(&other);
        }
    }

    /// True iff the character exists and its lock is `Free`.
    pub fn can_talk(&self, character: CharacterId) -> bool {
        self.characters
            .get(&character)
            .map(|record| record.lock.is_free())
            .unwrap_or(false)
    }

    pub fn record(&self, character: CharacterId) -> Option<&CharacterRecord> {
        self.characters.get(&character)
    }

    pub fn lock_of(&self, character: CharacterId) -> ConversationLock {
        self.characters
            .get(&character)
            .map(|record| record.lock)
            .unwrap_or_default()
    }

    pub fn set_lock(&mut self, character: CharacterId, lock: ConversationLock) {
        if let Some(record) = self.characters.get_mut(&character) {
            record.lock = lock;
        }
    }

    pub fn is_player(&self, character: CharacterId) -> bool {
        self.characters
            .get(&character)
            .map(|record| record.is_player)
            .unwrap_or(false)
    }

    pub fn name(&self, character: CharacterId) -> &str {
        self.characters
            .get(&character)
            .map(|record| record.name.as_str())
            .unwrap_or("<unknown>")
    }
}
