//! Runtime state for one live run of a dialogue tree.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use super::{
    fsm::{DialogueFsm, DialogueState, StateId},
    library::FsmId,
    roster::CharacterId,
};

/// Monotonically assigned conversation identifier. Never reused while the
/// handler is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationId(u64);

impl ConversationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conversation #{}", self.0)
    }
}

/// Lifecycle of a conversation instance. `Cancelled` and `Completed` are
/// terminal; no further transitions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    Active,
    Cancelled,
    Completed,
}

impl ConversationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Where an instance currently sits in its turn. Each variant is a
/// well-defined suspension point; the drive system steps the phase once per
/// scheduling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnPhase {
    /// Waiting for every speaker of the current state to finish printing.
    Printing,
    /// Line printed; waiting for a single "advance" signal.
    AwaitingAdvance,
    /// Choice menu revealed; waiting for a selection with a valid mapping.
    AwaitingChoice,
    /// All lines printed; counting down the fixed dwell before auto-advance.
    Dwell { remaining: f32 },
}

/// One live run of a [`DialogueFsm`] bound to specific participants.
#[derive(Debug, Clone)]
pub struct ConversationInstance {
    id: ConversationId,
    fsm: FsmId,
    current: StateId,
    status: ConversationStatus,
    phase: TurnPhase,
    participants: BTreeSet<CharacterId>,
    finished_printing: BTreeMap<CharacterId, bool>,
}

impl ConversationInstance {
    pub fn new(id: ConversationId, fsm_id: FsmId, fsm: &DialogueFsm) -> Self {
        let mut instance = Self {
            id,
            fsm: fsm_id,
            current: fsm.start(),
            status: ConversationStatus::Active,
            phase: TurnPhase::Printing,
            participants: fsm.participants().clone(),
            finished_printing: BTreeMap::new(),
        };
        instance.enter_state(fsm.start(), fsm.state(fsm.start()));
        instance
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn fsm(&self) -> FsmId {
        self.fsm
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn participants(&self) -> &BTreeSet<CharacterId> {
        &self.participants
    }

    pub(crate) fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_status(&mut self, status: ConversationStatus) {
        self.status = status;
    }

    /// Moves to `state` and resets the per-speaker printing flags for it.
    pub(crate) fn enter_state(&mut self, id: StateId, state: &DialogueState) {
        self.current = id;
        self.phase = TurnPhase::Printing;
        self.finished_printing.clear();
        for speaker in state.speakers() {
            self.finished_printing.insert(speaker, false);
        }
    }

    /// Re-arms the finished flag when a speaker's box starts a line.
    /// Reports from characters without a line in the current state are
    /// ignored, like stopped-reports.
    pub(crate) fn mark_started_printing(&mut self, character: CharacterId) {
        if let Some(flag) = self.finished_printing.get_mut(&character) {
            *flag = false;
        }
    }

    pub(crate) fn mark_stopped_printing(&mut self, character: CharacterId) {
        if let Some(flag) = self.finished_printing.get_mut(&character) {
            *flag = true;
        }
    }

    /// True once every speaker of the current state has reported its box
    /// finished. Vacuously true for states with no lines.
    pub fn is_state_finished_printing(&self) -> bool {
        self.finished_printing.values().all(|finished| *finished)
    }
}
