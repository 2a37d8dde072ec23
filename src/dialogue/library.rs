//! Arena of built dialogue trees shared by every conversation.
use std::fmt;

use bevy::prelude::*;

use super::fsm::DialogueFsm;

/// Handle to a tree registered in the [`DialogueLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FsmId(usize);

impl FsmId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree {}", self.0)
    }
}

/// Append-only store of dialogue trees. The external loader registers trees
/// here at startup; nothing is ever removed or mutated afterwards.
#[derive(Resource, Debug, Default)]
pub struct DialogueLibrary {
    fsms: Vec<DialogueFsm>,
}

impl DialogueLibrary {
    pub fn register(&mut self, fsm: DialogueFsm) -> FsmId {
        let id = FsmId::new(self.fsms.len());
        self.fsms.push(fsm);
        id
    }

    pub fn get(&self, id: FsmId) -> Option<&DialogueFsm> {
        self.fsms.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.fsms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fsms.is_empty()
    }
}
