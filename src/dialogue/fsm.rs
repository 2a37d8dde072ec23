//! Immutable dialogue trees: states, transitions, and eligibility checks.
//!
//! A [`DialogueFsm`] is built once at startup and never mutated afterwards.
//! States live in an arena indexed by [`StateId`], so walking the graph is a
//! plain index lookup with no shared ownership or back-references.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::dialogue::roster::CharacterId;

/// Transition index reserved for "no choice, advance automatically".
pub const AUTO_ADVANCE_INDEX: u8 = 0;

/// Highest transition index selectable by the player.
pub const MAX_CHOICE_INDEX: u8 = 9;

/// Index of a state within its owning FSM's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(usize);

impl StateId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state {}", self.0)
    }
}

/// How a conversation suspends and advances while sitting in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// Print, then wait for a single "advance" signal before taking index 0.
    WaitForAdvance,
    /// Print, then reveal numbered options and wait for a valid selection.
    WaitForChoice,
    /// Print, dwell a fixed interval, then take index 0 with no input.
    AutoAdvance,
}

/// One line of dialogue spoken by a bound participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: CharacterId,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: CharacterId, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// A node in the dialogue graph. A state may carry several lines spoken
/// concurrently by different participants; the conversation only advances
/// once every speaker has finished printing.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueState {
    lines: Vec<DialogueLine>,
    mode: TurnMode,
    transitions: BTreeMap<u8, StateId>,
}

impl DialogueState {
    pub fn new(mode: TurnMode) -> Self {
        Self {
            lines: Vec::new(),
            mode,
            transitions: BTreeMap::new(),
        }
    }

    pub fn line(mut self, speaker: CharacterId, text: impl Into<String>) -> Self {
        self.lines.push(DialogueLine::new(speaker, text));
        self
    }

    pub fn transition_to(mut self, choice: u8, target: StateId) -> Self {
        self.transitions.insert(choice, target);
        self
    }

    pub fn lines(&self) -> &[DialogueLine] {
        &self.lines
    }

    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    pub fn speakers(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.lines.iter().map(|line| line.speaker)
    }

    pub fn transition(&self, choice: u8) -> Option<StateId> {
        self.transitions.get(&choice).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (u8, StateId)> + '_ {
        self.transitions.iter().map(|(choice, target)| (*choice, *target))
    }

    /// A state with no outgoing transitions ends the conversation after its
    /// lines have printed.
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Text shown for this state when it appears as a choice-menu option.
    pub fn preview(&self) -> &str {
        self.lines.first().map(|line| line.text.as_str()).unwrap_or("")
    }
}

/// An immutable directed graph of dialogue states rooted at a start state.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueFsm {
    initiator: CharacterId,
    participants: BTreeSet<CharacterId>,
    start: StateId,
    start_chance: f32,
    states: Vec<DialogueState>,
}

impl DialogueFsm {
    pub fn initiator(&self) -> CharacterId {
        self.initiator
    }

    pub fn participants(&self) -> &BTreeSet<CharacterId> {
        &self.participants
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn start_chance(&self) -> f32 {
        self.start_chance
    }

    pub fn state(&self, id: StateId) -> &DialogueState {
        &self.states[id.index()]
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// True when every required participant is the initiator itself or is
    /// currently inside the initiator's in-range set.
    pub fn is_eligible(&self, in_range: &BTreeSet<CharacterId>) -> bool {
        self.participants
            .iter()
            .all(|participant| *participant == self.initiator || in_range.contains(participant))
    }
}

/// Validation failures raised while assembling a [`DialogueFsm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmBuildError {
    NoStates,
    MissingStart,
    StartOutOfBounds { start: StateId },
    TargetOutOfBounds { state: StateId, choice: u8, target: StateId },
    ChoiceIndexOutOfRange { state: StateId, choice: u8 },
    UnknownSpeaker { state: StateId, speaker: CharacterId },
}

impl fmt::Display for FsmBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStates => write!(f, "dialogue tree has no states"),
            Self::MissingStart => write!(f, "dialogue tree has no start state"),
            Self::StartOutOfBounds { start } => {
                write!(f, "start {} is outside the tree", start)
            }
            Self::TargetOutOfBounds { state, choice, target } => write!(
                f,
                "{} transition {} targets out-of-bounds {}",
                state, choice, target
            ),
            Self::ChoiceIndexOutOfRange { state, choice } => {
                write!(f, "{} uses choice index {} above 9", state, choice)
            }
            Self::UnknownSpeaker { state, speaker } => {
                write!(f, "{} has a line for unregistered speaker {}", state, speaker)
            }
        }
    }
}

impl std::error::Error for FsmBuildError {}

/// Builder used by the tree loader to assemble FSMs at startup.
pub struct FsmBuilder {
    initiator: CharacterId,
    participants: BTreeSet<CharacterId>,
    start: Option<StateId>,
    start_chance: f32,
    states: Vec<DialogueState>,
}

impl FsmBuilder {
    pub fn new(initiator: CharacterId) -> Self {
        let mut participants = BTreeSet::new();
        participants.insert(initiator);
        Self {
            initiator,
            participants,
            start: None,
            start_chance: 1.0,
            states: Vec::new(),
        }
    }

    pub fn participant(mut self, character: CharacterId) -> Self {
        self.participants.insert(character);
        self
    }

    /// Start gate chance in `0.0..=1.0`; evaluated by the pluggable
    /// conversation gate each time the tree is considered for activation.
    pub fn start_chance(mut self, chance: f32) -> Self {
        self.start_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn add_state(&mut self, state: DialogueState) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(state);
        id
    }

    pub fn set_start(&mut self, start: StateId) {
        self.start = Some(start);
    }

    pub fn build(self) -> Result<DialogueFsm, FsmBuildError> {
        if self.states.is_empty() {
            return Err(FsmBuildError::NoStates);
        }
        let start = self.start.ok_or(FsmBuildError::MissingStart)?;
        if start.index() >= self.states.len() {
            return Err(FsmBuildError::StartOutOfBounds { start });
        }

        for (index, state) in self.states.iter().enumerate() {
            let id = StateId::new(index);
            for (choice, target) in state.transitions() {
                if choice > MAX_CHOICE_INDEX {
                    return Err(FsmBuildError::ChoiceIndexOutOfRange { state: id, choice });
                }
                if target.index() >= self.states.len() {
                    return Err(FsmBuildError::TargetOutOfBounds {
                        state: id,
                        choice,
                        target,
                    });
                }
            }
            for speaker in state.speakers() {
                if !self.participants.contains(&speaker) {
                    return Err(FsmBuildError::UnknownSpeaker { state: id, speaker });
                }
            }
        }

        Ok(DialogueFsm {
            initiator: self.initiator,
            participants: self.participants,
            start,
            start_chance: self.start_chance,
            states: self.states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_id(value: u64) -> CharacterId {
        CharacterId::new(value)
    }

    #[test]
    fn builds_a_two_state_tree() {
        let alice = char_id(1);
        let bryn = char_id(2);

        let mut builder = FsmBuilder::new(alice).participant(bryn);
        let reply = builder.add_state(DialogueState::new(TurnMode::AutoAdvance).line(bryn, "Aye."));
        let greeting = builder.add_state(
            DialogueState::new(TurnMode::AutoAdvance)
                .line(alice, "Fine morning.")
                .transition_to(AUTO_ADVANCE_INDEX, reply),
        );
        builder.set_start(greeting);

        let fsm = builder.build().expect("valid tree");
        assert_eq!(fsm.state_count(), 2);
        assert_eq!(fsm.start(), greeting);
        assert_eq!(fsm.state(greeting).transition(AUTO_ADVANCE_INDEX), Some(reply));
        assert!(fsm.state(reply).is_terminal());
        assert!(!fsm.state(greeting).is_terminal());
    }

    #[test]
    fn rejects_out_of_bounds_target() {
        let alice = char_id(1);
        let mut builder = FsmBuilder::new(alice);
        let start = builder.add_state(
            DialogueState::new(TurnMode::WaitForAdvance)
                .line(alice, "Hello?")
                .transition_to(AUTO_ADVANCE_INDEX, StateId::new(7)),
        );
        builder.set_start(start);

        assert!(matches!(
            builder.build(),
            Err(FsmBuildError::TargetOutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_choice_index_above_nine() {
        let alice = char_id(1);
        let mut builder = FsmBuilder::new(alice);
        let start = builder.add_state(
            DialogueState::new(TurnMode::WaitForChoice)
                .line(alice, "Pick one.")
                .transition_to(10, StateId::new(0)),
        );
        builder.set_start(start);

        assert!(matches!(
            builder.build(),
            Err(FsmBuildError::ChoiceIndexOutOfRange { choice: 10, .. })
        ));
    }

    #[test]
    fn rejects_unregistered_speaker() {
        let alice = char_id(1);
        let stranger = char_id(9);
        let mut builder = FsmBuilder::new(alice);
        let start =
            builder.add_state(DialogueState::new(TurnMode::WaitForAdvance).line(stranger, "Psst."));
        builder.set_start(start);

        assert!(matches!(
            builder.build(),
            Err(FsmBuildError::UnknownSpeaker { speaker, .. }) if speaker == stranger
        ));
    }

    #[test]
    fn rejects_empty_and_startless_trees() {
        let alice = char_id(1);
        assert_eq!(FsmBuilder::new(alice).build(), Err(FsmBuildError::NoStates));

        let mut builder = FsmBuilder::new(alice);
        builder.add_state(DialogueState::new(TurnMode::WaitForAdvance).line(alice, "..."));
        assert_eq!(builder.build(), Err(FsmBuildError::MissingStart));
    }

    #[test]
    fn rejects_out_of_bounds_start() {
        let alice = char_id(1);
        let mut builder = FsmBuilder::new(alice);
        builder.add_state(DialogueState::new(TurnMode::WaitForAdvance).line(alice, "Hm."));
        builder.set_start(StateId::new(7));

        assert_eq!(
            builder.build(),
            Err(FsmBuildError::StartOutOfBounds {
                start: StateId::new(7)
            })
        );
    }

    #[test]
    fn eligibility_requires_all_participants_in_range() {
        let alice = char_id(1);
        let bryn = char_id(2);
        let cedric = char_id(3);

        let mut builder = FsmBuilder::new(alice).participant(bryn).participant(cedric);
        let start = builder.add_state(
            DialogueState::new(TurnMode::AutoAdvance)
                .line(alice, "Gather round.")
                .line(bryn, "Hm?")
                .line(cedric, "What now."),
        );
        builder.set_start(start);
        let fsm = builder.build().expect("valid tree");

        let mut in_range = BTreeSet::new();
        in_range.insert(bryn);
        assert!(!fsm.is_eligible(&in_range));

        in_range.insert(cedric);
        assert!(fsm.is_eligible(&in_range));
    }

    #[test]
    fn preview_uses_first_line() {
        let alice = char_id(1);
        let state = DialogueState::new(TurnMode::WaitForAdvance)
            .line(alice, "First.")
            .line(alice, "Second.");
        assert_eq!(state.preview(), "First.");
        assert_eq!(DialogueState::new(TurnMode::WaitForAdvance).preview(), "");
    }
}
