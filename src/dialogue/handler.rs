//! Conversation handler: owns every active instance and drives its lifecycle.
//!
//! The handler is the only place conversations are created, advanced, and
//! torn down. It never touches the ECS directly; side effects for the UI
//! widget and the movement-lock listener are pushed onto an outbox of
//! [`DialogueCommand`]s that a system drains into messages each tick.
use std::collections::HashMap;

use bevy::prelude::*;

use super::{
    conversation::{ConversationId, ConversationInstance, ConversationStatus, TurnPhase},
    errors::ConversationError,
    fsm::{DialogueState, StateId, TurnMode, AUTO_ADVANCE_INDEX},
    library::{DialogueLibrary, FsmId},
    roster::{CharacterRoster, ConversationLock},
};
use crate::dialogue::roster::CharacterId;

/// Pluggable predicate deciding whether a tree's start gate passes.
///
/// Trees carry a start chance in `0.0..=1.0`; the default gate is
/// deterministic and only admits trees with a certain (1.0) chance, so
/// behaviour without a randomness source is predictable. Games wanting
/// probability-gated ambient chatter install their own roll.
#[derive(Resource)]
pub struct ConversationGate {
    roll: Box<dyn Fn(f32) -> bool + Send + Sync>,
}

impl ConversationGate {
    pub fn new(roll: impl Fn(f32) -> bool + Send + Sync + 'static) -> Self {
        Self {
            roll: Box::new(roll),
        }
    }

    pub fn passes(&self, chance: f32) -> bool {
        (self.roll)(chance)
    }
}

impl Default for ConversationGate {
    fn default() -> Self {
        Self::new(|chance| chance >= 1.0)
    }
}

/// Side effects emitted by the handler, drained once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueCommand {
    CreateBox {
        conversation: ConversationId,
        character: CharacterId,
    },
    Print {
        conversation: ConversationId,
        character: CharacterId,
        line: String,
    },
    PrintChoices {
        conversation: ConversationId,
        character: CharacterId,
        options: Vec<(u8, String)>,
    },
    DestroyBox {
        character: CharacterId,
    },
    LockMovement,
    UnlockMovement,
    Started {
        conversation: ConversationId,
    },
    Ended {
        conversation: ConversationId,
    },
    Cancelled {
        conversation: ConversationId,
    },
}

/// Result of a successful transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Advanced(StateId),
    /// The current state had no mapping for the index; the conversation was
    /// treated as exhausted and ended.
    Ended,
}

/// Owns the active-conversation map and the monotonic id counter.
#[derive(Resource, Default)]
pub struct ConversationHandler {
    active: HashMap<ConversationId, ConversationInstance>,
    next_id: u64,
    outbox: Vec<DialogueCommand>,
}

impl ConversationHandler {
    /// Starts a conversation for `fsm_id`, locking every participant.
    /// Escalates to [`Self::start_player_conversation`] when the tree's
    /// initiator is the player. `NotEligible` is not an error to report:
    /// the caller simply retries on a later proximity check.
    pub fn start_conversation(
        &mut self,
        fsm_id: FsmId,
        library: &DialogueLibrary,
        roster: &mut CharacterRoster,
        gate: &ConversationGate,
    ) -> Result<ConversationId, ConversationError> {
        let fsm = library.get(fsm_id).ok_or(ConversationError::NotEligible)?;
        if roster.is_player(fsm.initiator()) {
            return self.start_player_conversation(fsm_id, library, roster, gate);
        }

        if !roster.can_talk(fsm.initiator()) {
            return Err(ConversationError::NotEligible);
        }
        if fsm
            .participants()
            .iter()
            .any(|participant| !roster.can_talk(*participant))
        {
            return Err(ConversationError::NotEligible);
        }
        if !gate.passes(fsm.start_chance()) {
            debug!("Start gate missed for {} (chance {:.2})", fsm_id, fsm.start_chance());
            return Err(ConversationError::NotEligible);
        }

        let id = self.allocate_id();
        let instance = ConversationInstance::new(id, fsm_id, fsm);
        for &participant in fsm.participants() {
            roster.set_lock(participant, ConversationLock::InNpcConversation(id));
            self.outbox.push(DialogueCommand::CreateBox {
                conversation: id,
                character: participant,
            });
        }
        self.queue_state_lines(id, fsm.state(instance.current()));
        self.insert_active(instance);
        self.outbox.push(DialogueCommand::Started { conversation: id });
        info!(
            "{} started: {} speaks first ({} participants)",
            id,
            roster.name(fsm.initiator()),
            fsm.participants().len()
        );
        Ok(id)
    }

    /// Starts a conversation between the player and NPCs. Any NPC-only
    /// conversation currently locking a required participant is cancelled
    /// first, for all of its bound characters, so nobody is ever bound to two
    /// active conversations.
    pub fn start_player_conversation(
        &mut self,
        fsm_id: FsmId,
        library: &DialogueLibrary,
        roster: &mut CharacterRoster,
        gate: &ConversationGate,
    ) -> Result<ConversationId, ConversationError> {
        let fsm = library.get(fsm_id).ok_or(ConversationError::NotEligible)?;
        if !roster.can_talk(fsm.initiator()) {
            return Err(ConversationError::NotEligible);
        }
        // Player conversations are never interrupted by new ones.
        if fsm.participants().iter().any(|participant| {
            matches!(
                roster.lock_of(*participant),
                ConversationLock::InPlayerConversation(_)
            )
        }) {
            return Err(ConversationError::NotEligible);
        }
        if !gate.passes(fsm.start_chance()) {
            return Err(ConversationError::NotEligible);
        }

        let interrupted: Vec<ConversationId> = fsm
            .participants()
            .iter()
            .filter_map(|participant| match roster.lock_of(*participant) {
                ConversationLock::InNpcConversation(existing) => Some(existing),
                _ => None,
            })
            .collect();
        for existing in interrupted {
            info!("Player interrupts {}", existing);
            self.cancel_conversation(existing, roster);
        }

        if fsm
            .participants()
            .iter()
            .any(|participant| !roster.can_talk(*participant))
        {
            return Err(ConversationError::NotEligible);
        }

        let id = self.allocate_id();
        let instance = ConversationInstance::new(id, fsm_id, fsm);
        for &participant in fsm.participants() {
            roster.set_lock(participant, ConversationLock::InPlayerConversation(id));
            self.outbox.push(DialogueCommand::CreateBox {
                conversation: id,
                character: participant,
            });
        }
        self.outbox.push(DialogueCommand::LockMovement);
        self.queue_state_lines(id, fsm.state(instance.current()));
        self.insert_active(instance);
        self.outbox.push(DialogueCommand::Started { conversation: id });
        info!("{} started with the player", id);
        Ok(id)
    }

    /// Advances the conversation along `choice`. A missing mapping ends the
    /// conversation for advance/auto turns; choice turns get
    /// `NoSuchTransition` back and keep waiting.
    pub fn transition_conversation(
        &mut self,
        id: ConversationId,
        choice: u8,
        library: &DialogueLibrary,
        roster: &mut CharacterRoster,
    ) -> Result<TransitionOutcome, ConversationError> {
        let (fsm_id, current) = match self.active.get(&id) {
            Some(instance) => (instance.fsm(), instance.current()),
            None => return Err(ConversationError::UnknownConversation { id }),
        };
        let fsm = library
            .get(fsm_id)
            .ok_or(ConversationError::UnknownConversation { id })?;
        let state = fsm.state(current);

        let Some(next) = state.transition(choice) else {
            if state.mode() == TurnMode::WaitForChoice {
                return Err(ConversationError::NoSuchTransition {
                    state: current,
                    choice,
                });
            }
            self.end_conversation(id, roster);
            return Ok(TransitionOutcome::Ended);
        };

        if let Some(instance) = self.active.get_mut(&id) {
            instance.enter_state(next, fsm.state(next));
        }
        self.queue_state_lines(id, fsm.state(next));
        debug!("{} advanced to {} via choice {}", id, next, choice);
        Ok(TransitionOutcome::Advanced(next))
    }

    /// Bookkeeping call from the widget layer when a character's box begins
    /// printing its current line.
    pub fn character_started_printing(
        &mut self,
        id: ConversationId,
        character: CharacterId,
    ) -> Result<(), ConversationError> {
        let instance = self
            .active
            .get_mut(&id)
            .ok_or(ConversationError::UnknownConversation { id })?;
        instance.mark_started_printing(character);
        Ok(())
    }

    /// Bookkeeping call when a character's box has finished printing.
    pub fn character_stopped_printing(
        &mut self,
        id: ConversationId,
        character: CharacterId,
    ) -> Result<(), ConversationError> {
        let instance = self
            .active
            .get_mut(&id)
            .ok_or(ConversationError::UnknownConversation { id })?;
        instance.mark_stopped_printing(character);
        Ok(())
    }

    /// True once every speaker of the instance's current state has finished.
    pub fn is_state_finished_printing(
        &self,
        id: ConversationId,
    ) -> Result<bool, ConversationError> {
        self.active
            .get(&id)
            .map(|instance| instance.is_state_finished_printing())
            .ok_or(ConversationError::UnknownConversation { id })
    }

    /// Completes a conversation: unlocks participants, tears down boxes,
    /// removes the instance. No-op for ids that are no longer active.
    pub fn end_conversation(&mut self, id: ConversationId, roster: &mut CharacterRoster) {
        let Some(mut instance) = self.active.remove(&id) else {
            return;
        };
        instance.set_status(ConversationStatus::Completed);
        self.release_participants(&instance, roster);
        self.outbox.push(DialogueCommand::Ended { conversation: id });
        info!("{} completed", id);
    }

    /// Cancels a conversation (player interruption). Idempotent: cancelling
    /// an id that already ended is a no-op.
    pub fn cancel_conversation(&mut self, id: ConversationId, roster: &mut CharacterRoster) {
        let Some(mut instance) = self.active.remove(&id) else {
            return;
        };
        instance.set_status(ConversationStatus::Cancelled);
        self.release_participants(&instance, roster);
        self.outbox.push(DialogueCommand::Cancelled { conversation: id });
        info!("{} cancelled", id);
    }

    /// Finds the first eligible tree for `character` and starts it. Gate
    /// misses and locked participants fall through to the next tree in
    /// registration order. Needs at least one other character in range.
    pub fn check_for_and_activate_conversation(
        &mut self,
        character: CharacterId,
        library: &DialogueLibrary,
        roster: &mut CharacterRoster,
        gate: &ConversationGate,
    ) -> Option<ConversationId> {
        let record = roster.record(character)?;
        if record.in_range.is_empty() {
            return None;
        }

        let trees = record.trees.clone();
        for fsm_id in trees {
            let eligible = {
                let Some(fsm) = library.get(fsm_id) else {
                    continue;
                };
                let record = roster.record(character)?;
                fsm.is_eligible(&record.in_range)
            };
            if !eligible {
                continue;
            }
            match self.start_conversation(fsm_id, library, roster, gate) {
                Ok(id) => return Some(id),
                Err(ConversationError::NotEligible) => continue,
                Err(err) => {
                    debug!("Could not start {}: {}", fsm_id, err);
                    continue;
                }
            }
        }
        None
    }

    /// Steps one instance's turn state machine. Called once per scheduling
    /// tick for every active conversation; cancelled instances are already
    /// out of the map and are simply skipped.
    pub fn step_conversation(
        &mut self,
        id: ConversationId,
        delta_seconds: f32,
        advance: bool,
        choices: &[u8],
        dwell_seconds: f32,
        library: &DialogueLibrary,
        roster: &mut CharacterRoster,
    ) {
        let Some(instance) = self.active.get(&id) else {
            return;
        };
        let Some(fsm) = library.get(instance.fsm()) else {
            return;
        };
        let mode = fsm.state(instance.current()).mode();
        let phase = instance.phase();
        let all_finished = instance.is_state_finished_printing();

        match phase {
            TurnPhase::Printing => {
                if !all_finished {
                    return;
                }
                match mode {
                    TurnMode::WaitForAdvance => self.set_phase(id, TurnPhase::AwaitingAdvance),
                    TurnMode::WaitForChoice => self.reveal_choices(id, library, roster),
                    TurnMode::AutoAdvance => self.set_phase(
                        id,
                        TurnPhase::Dwell {
                            remaining: dwell_seconds,
                        },
                    ),
                }
            }
            TurnPhase::AwaitingAdvance => {
                if advance {
                    if let Err(err) =
                        self.transition_conversation(id, AUTO_ADVANCE_INDEX, library, roster)
                    {
                        debug!("Ignoring advance on {}: {}", id, err);
                    }
                }
            }
            TurnPhase::AwaitingChoice => {
                for &choice in choices {
                    match self.transition_conversation(id, choice, library, roster) {
                        // Selection outside the valid set: keep waiting.
                        Err(ConversationError::NoSuchTransition { .. }) => continue,
                        _ => break,
                    }
                }
            }
            TurnPhase::Dwell { remaining } => {
                let remaining = remaining - delta_seconds;
                if remaining > 0.0 {
                    self.set_phase(id, TurnPhase::Dwell { remaining });
                } else if all_finished {
                    if let Err(err) =
                        self.transition_conversation(id, AUTO_ADVANCE_INDEX, library, roster)
                    {
                        debug!("Ignoring dwell expiry on {}: {}", id, err);
                    }
                }
            }
        }
    }

    /// Drains the pending side effects accumulated since the last tick.
    pub fn take_commands(&mut self) -> Vec<DialogueCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn instance(&self, id: ConversationId) -> Option<&ConversationInstance> {
        self.active.get(&id)
    }

    pub fn is_active(&self, id: ConversationId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active ids in ascending order, for deterministic per-tick stepping.
    pub fn active_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self.active.keys().copied().collect();
        ids.sort();
        ids
    }

    fn allocate_id(&mut self) -> ConversationId {
        let id = ConversationId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert_active(&mut self, instance: ConversationInstance) {
        let id = instance.id();
        let previous = self.active.insert(id, instance);
        debug_assert!(previous.is_none(), "conversation id reused: {id}");
    }

    fn set_phase(&mut self, id: ConversationId, phase: TurnPhase) {
        if let Some(instance) = self.active.get_mut(&id) {
            instance.set_phase(phase);
        }
    }

    fn queue_state_lines(&mut self, id: ConversationId, state: &DialogueState) {
        for line in state.lines() {
            self.outbox.push(DialogueCommand::Print {
                conversation: id,
                character: line.speaker,
                line: line.text.clone(),
            });
        }
    }

    /// Reveals the choice menu on the responder's box. The responder is the
    /// bound player when present, otherwise the tree's initiator.
    fn reveal_choices(
        &mut self,
        id: ConversationId,
        library: &DialogueLibrary,
        roster: &CharacterRoster,
    ) {
        let Some((responder, options)) = ({
            self.active.get(&id).and_then(|instance| {
                let fsm = library.get(instance.fsm())?;
                let state = fsm.state(instance.current());
                let options: Vec<(u8, String)> = state
                    .transitions()
                    .filter(|(choice, _)| *choice != AUTO_ADVANCE_INDEX)
                    .map(|(choice, target)| (choice, fsm.state(target).preview().to_string()))
                    .collect();
                let responder = instance
                    .participants()
                    .iter()
                    .copied()
                    .find(|participant| roster.is_player(*participant))
                    .unwrap_or(fsm.initiator());
                Some((responder, options))
            })
        }) else {
            return;
        };

        self.outbox.push(DialogueCommand::PrintChoices {
            conversation: id,
            character: responder,
            options,
        });
        self.set_phase(id, TurnPhase::AwaitingChoice);
    }

    fn release_participants(
        &mut self,
        instance: &ConversationInstance,
        roster: &mut CharacterRoster,
    ) {
        let mut player_bound = false;
        for &participant in instance.participants() {
            if roster.is_player(participant) {
                player_bound = true;
            }
            roster.set_lock(participant, ConversationLock::Free);
            self.outbox.push(DialogueCommand::DestroyBox {
                character: participant,
            });
        }
        if player_bound {
            self.outbox.push(DialogueCommand::UnlockMovement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::fsm::{DialogueState, FsmBuilder, TurnMode};

    const DWELL: f32 = 2.0;

    fn npc(value: u64) -> CharacterId {
        CharacterId::new(value)
    }

    fn base_roster() -> CharacterRoster {
        let mut roster = CharacterRoster::default();
        roster.register_character(CharacterId::player(), "Player", true);
        roster.register_character(npc(1), "Maren", false);
        roster.register_character(npc(2), "Tam", false);
        roster
    }

    /// Two-state auto-advance chat between `a` and `b`; both speak in the
    /// opening state.
    fn npc_chat(library: &mut DialogueLibrary, a: CharacterId, b: CharacterId) -> FsmId {
        let mut builder = FsmBuilder::new(a).participant(b);
        let closing = builder.add_state(DialogueState::new(TurnMode::AutoAdvance).line(b, "Aye."));
        let opening = builder.add_state(
            DialogueState::new(TurnMode::AutoAdvance)
                .line(a, "Cold out.")
                .line(b, "Always is.")
                .transition_to(AUTO_ADVANCE_INDEX, closing),
        );
        builder.set_start(opening);
        library.register(builder.build().expect("valid npc chat"))
    }

    /// Player-initiated choice tree against `target` with options 1 and 2.
    fn player_tree(library: &mut DialogueLibrary, target: CharacterId) -> FsmId {
        let player = CharacterId::player();
        let mut builder = FsmBuilder::new(player).participant(target);
        let farewell =
            builder.add_state(DialogueState::new(TurnMode::WaitForAdvance).line(target, "Safe roads."));
        let passing = builder.add_state(
            DialogueState::new(TurnMode::WaitForAdvance)
                .line(player, "Just passing through.")
                .transition_to(AUTO_ADVANCE_INDEX, farewell),
        );
        let nothing =
            builder.add_state(DialogueState::new(TurnMode::WaitForAdvance).line(player, "Nothing."));
        let greeting = builder.add_state(
            DialogueState::new(TurnMode::WaitForChoice)
                .line(target, "What do you need?")
                .transition_to(1, passing)
                .transition_to(2, nothing),
        );
        builder.set_start(greeting);
        library.register(builder.build().expect("valid player tree"))
    }

    #[test]
    fn locks_flip_on_start_and_end() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        assert!(roster.can_talk(npc(1)));
        let id = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .expect("chat starts");
        assert!(!roster.can_talk(npc(1)));
        assert!(!roster.can_talk(npc(2)));

        handler.end_conversation(id, &mut roster);
        assert!(roster.can_talk(npc(1)));
        assert!(roster.can_talk(npc(2)));
        assert!(!handler.is_active(id));
    }

    #[test]
    fn start_fails_silently_when_a_participant_is_locked() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        roster.set_lock(npc(2), ConversationLock::InNpcConversation(ConversationId::new(99)));
        assert_eq!(
            handler.start_conversation(chat, &library, &mut roster, &gate),
            Err(ConversationError::NotEligible)
        );
        assert_eq!(handler.active_count(), 0);
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        let first = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();
        handler.end_conversation(first, &mut roster);
        let second = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();
        assert!(second.value() > first.value());
    }

    #[test]
    fn scenario_a_proximity_check_starts_player_conversation() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let player = CharacterId::player();
        let tree = player_tree(&mut library, npc(1));

        roster.add_fsm(player, tree);
        roster.add_in_range(player, npc(1));

        let id = handler
            .check_for_and_activate_conversation(player, &library, &mut roster, &gate)
            .expect("conversation starts");

        assert_eq!(
            roster.lock_of(npc(1)),
            ConversationLock::InPlayerConversation(id)
        );
        assert_eq!(
            roster.lock_of(player),
            ConversationLock::InPlayerConversation(id)
        );

        let commands = handler.take_commands();
        assert!(commands.contains(&DialogueCommand::LockMovement));
        assert!(commands.iter().any(|command| matches!(
            command,
            DialogueCommand::CreateBox { character, .. } if *character == npc(1)
        )));
    }

    #[test]
    fn scenario_b_player_interruption_cancels_for_every_participant() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let player = CharacterId::player();

        let chat = npc_chat(&mut library, npc(1), npc(2));
        let npc_conversation = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .expect("npc chat starts");
        handler.take_commands();

        let tree = player_tree(&mut library, npc(1));
        let player_conversation = handler
            .start_player_conversation(tree, &library, &mut roster, &gate)
            .expect("interruption succeeds");

        assert!(!handler.is_active(npc_conversation));
        assert_eq!(roster.lock_of(npc(2)), ConversationLock::Free);
        assert_eq!(
            roster.lock_of(npc(1)),
            ConversationLock::InPlayerConversation(player_conversation)
        );
        assert_eq!(
            roster.lock_of(player),
            ConversationLock::InPlayerConversation(player_conversation)
        );

        let commands = handler.take_commands();
        assert!(commands.contains(&DialogueCommand::Cancelled {
            conversation: npc_conversation
        }));
        // Cancellation lands before the new conversation's start notice.
        let cancel_at = commands
            .iter()
            .position(|command| matches!(command, DialogueCommand::Cancelled { .. }))
            .unwrap();
        let start_at = commands
            .iter()
            .position(|command| matches!(command, DialogueCommand::Started { .. }))
            .unwrap();
        assert!(cancel_at < start_at);
    }

    #[test]
    fn player_conversations_are_never_interrupted() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();

        let tree = player_tree(&mut library, npc(1));
        handler
            .start_player_conversation(tree, &library, &mut roster, &gate)
            .expect("player conversation starts");

        // An NPC chat needing the occupied participant fails silently.
        let chat = npc_chat(&mut library, npc(2), npc(1));
        assert_eq!(
            handler.start_conversation(chat, &library, &mut roster, &gate),
            Err(ConversationError::NotEligible)
        );
        assert_eq!(handler.active_count(), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        let id = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();
        handler.cancel_conversation(id, &mut roster);
        assert_eq!(roster.lock_of(npc(1)), ConversationLock::Free);

        // A second cancel must not unlock anything a later conversation took.
        let relock = ConversationLock::InNpcConversation(ConversationId::new(77));
        roster.set_lock(npc(1), relock);
        handler.cancel_conversation(id, &mut roster);
        assert_eq!(roster.lock_of(npc(1)), relock);
    }

    #[test]
    fn stale_ids_are_reported_as_unknown() {
        let mut handler = ConversationHandler::default();
        let library = DialogueLibrary::default();
        let mut roster = base_roster();
        let stale = ConversationId::new(5);

        assert_eq!(
            handler.transition_conversation(stale, 0, &library, &mut roster),
            Err(ConversationError::UnknownConversation { id: stale })
        );
        assert_eq!(
            handler.character_stopped_printing(stale, npc(1)),
            Err(ConversationError::UnknownConversation { id: stale })
        );
        assert_eq!(
            handler.is_state_finished_printing(stale),
            Err(ConversationError::UnknownConversation { id: stale })
        );
    }

    #[test]
    fn missing_transition_ends_advance_turns() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();

        // Single terminal state: first advance exhausts the tree.
        let lone = {
            let mut builder = FsmBuilder::new(npc(1)).participant(npc(2));
            let start = builder
                .add_state(DialogueState::new(TurnMode::WaitForAdvance).line(npc(1), "Mind the mud."));
            builder.set_start(start);
            library.register(builder.build().unwrap())
        };

        let id = handler
            .start_conversation(lone, &library, &mut roster, &gate)
            .unwrap();
        assert_eq!(
            handler.transition_conversation(id, AUTO_ADVANCE_INDEX, &library, &mut roster),
            Ok(TransitionOutcome::Ended)
        );
        assert!(!handler.is_active(id));
        assert!(roster.can_talk(npc(1)));
    }

    #[test]
    fn scenario_c_invalid_choice_is_ignored_valid_choice_advances() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let tree = player_tree(&mut library, npc(1));

        let id = handler
            .start_player_conversation(tree, &library, &mut roster, &gate)
            .unwrap();
        let greeting = handler.instance(id).unwrap().current();

        // The greeting line finishes printing; the menu is revealed.
        handler.character_stopped_printing(id, npc(1)).unwrap();
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        assert_eq!(
            handler.instance(id).unwrap().phase(),
            TurnPhase::AwaitingChoice
        );
        let commands = handler.take_commands();
        assert!(commands.iter().any(|command| matches!(
            command,
            DialogueCommand::PrintChoices { character, options, .. }
                if *character == CharacterId::player() && options.len() == 2
        )));

        // "4" has no mapping: still waiting in the same state.
        handler.step_conversation(id, 0.1, false, &[4], DWELL, &library, &mut roster);
        assert_eq!(handler.instance(id).unwrap().current(), greeting);
        assert_eq!(
            handler.instance(id).unwrap().phase(),
            TurnPhase::AwaitingChoice
        );

        // "2" maps: the conversation advances.
        handler.step_conversation(id, 0.1, false, &[2], DWELL, &library, &mut roster);
        let instance = handler.instance(id).unwrap();
        assert_ne!(instance.current(), greeting);
        assert_eq!(instance.phase(), TurnPhase::Printing);
    }

    #[test]
    fn scenario_d_auto_advance_waits_for_every_speaker() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        let id = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();
        let opening = handler.instance(id).unwrap().current();
        handler.take_commands();

        // Only one speaker finished: no dwell, no transition.
        handler.character_stopped_printing(id, npc(1)).unwrap();
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        assert_eq!(handler.instance(id).unwrap().phase(), TurnPhase::Printing);
        assert_eq!(handler.instance(id).unwrap().current(), opening);

        // Both finished: dwell begins, then the transition fires once.
        handler.character_stopped_printing(id, npc(2)).unwrap();
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        assert!(matches!(
            handler.instance(id).unwrap().phase(),
            TurnPhase::Dwell { .. }
        ));

        handler.step_conversation(id, 1.0, false, &[], DWELL, &library, &mut roster);
        assert_eq!(handler.instance(id).unwrap().current(), opening);

        handler.step_conversation(id, 1.5, false, &[], DWELL, &library, &mut roster);
        let instance = handler.instance(id).unwrap();
        assert_ne!(instance.current(), opening);

        // Exactly one line queued for the single-speaker closing state.
        let prints = handler
            .take_commands()
            .into_iter()
            .filter(|command| matches!(command, DialogueCommand::Print { .. }))
            .count();
        assert_eq!(prints, 1);
    }

    #[test]
    fn stray_started_reports_cannot_wedge_a_state() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        let id = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();

        // A bystander's report must not add a flag nothing can clear.
        handler.character_started_printing(id, npc(7)).unwrap();
        handler.character_stopped_printing(id, npc(1)).unwrap();
        handler.character_stopped_printing(id, npc(2)).unwrap();
        assert_eq!(handler.is_state_finished_printing(id), Ok(true));

        // A real speaker restarting re-arms its own flag only.
        handler.character_started_printing(id, npc(1)).unwrap();
        assert_eq!(handler.is_state_finished_printing(id), Ok(false));
        handler.character_stopped_printing(id, npc(1)).unwrap();
        assert_eq!(handler.is_state_finished_printing(id), Ok(true));
    }

    #[test]
    fn advance_signal_moves_wait_for_advance_turns() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let tree = player_tree(&mut library, npc(1));

        let id = handler
            .start_player_conversation(tree, &library, &mut roster, &gate)
            .unwrap();

        // Reach the "Just passing through" advance state via choice 1.
        handler.character_stopped_printing(id, npc(1)).unwrap();
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        handler.step_conversation(id, 0.1, false, &[1], DWELL, &library, &mut roster);
        let passing = handler.instance(id).unwrap().current();

        // Line prints, then an advance signal is required.
        handler
            .character_stopped_printing(id, CharacterId::player())
            .unwrap();
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        assert_eq!(
            handler.instance(id).unwrap().phase(),
            TurnPhase::AwaitingAdvance
        );

        // No signal: nothing moves.
        handler.step_conversation(id, 0.1, false, &[], DWELL, &library, &mut roster);
        assert_eq!(handler.instance(id).unwrap().current(), passing);

        handler.step_conversation(id, 0.1, true, &[], DWELL, &library, &mut roster);
        assert_ne!(handler.instance(id).unwrap().current(), passing);
    }

    #[test]
    fn gate_miss_falls_through_to_the_next_tree() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();

        let gated = {
            let mut builder = FsmBuilder::new(npc(1)).participant(npc(2)).start_chance(0.3);
            let start = builder
                .add_state(DialogueState::new(TurnMode::AutoAdvance).line(npc(1), "Psst."));
            builder.set_start(start);
            library.register(builder.build().unwrap())
        };
        let certain = npc_chat(&mut library, npc(1), npc(2));

        roster.add_fsm(npc(1), gated);
        roster.add_fsm(npc(1), certain);
        roster.add_in_range(npc(1), npc(2));
        roster.add_in_range(npc(2), npc(1));

        let id = handler
            .check_for_and_activate_conversation(npc(1), &library, &mut roster, &gate)
            .expect("second tree starts");
        assert_eq!(handler.instance(id).unwrap().fsm(), certain);
    }

    #[test]
    fn activation_needs_someone_in_range() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));
        roster.add_fsm(npc(1), chat);

        assert_eq!(
            handler.check_for_and_activate_conversation(npc(1), &library, &mut roster, &gate),
            None
        );
        assert_eq!(handler.active_count(), 0);
    }

    #[test]
    fn teardown_destroys_a_box_per_participant() {
        let mut handler = ConversationHandler::default();
        let mut library = DialogueLibrary::default();
        let mut roster = base_roster();
        let gate = ConversationGate::default();
        let chat = npc_chat(&mut library, npc(1), npc(2));

        let id = handler
            .start_conversation(chat, &library, &mut roster, &gate)
            .unwrap();
        handler.take_commands();
        handler.end_conversation(id, &mut roster);

        let destroys = handler
            .take_commands()
            .into_iter()
            .filter(|command| matches!(command, DialogueCommand::DestroyBox { .. }))
            .count();
        assert_eq!(destroys, 2);
    }
}
