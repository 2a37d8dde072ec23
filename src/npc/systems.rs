//! Villager spawning and the hand-authored dialogue trees.
use bevy::prelude::*;

use crate::{
    dialogue::{
        fsm::{DialogueFsm, DialogueState, FsmBuildError, FsmBuilder, TurnMode, AUTO_ADVANCE_INDEX},
        library::DialogueLibrary,
        roster::{CharacterId, CharacterRoster},
    },
    npc::components::{CharacterIdGenerator, Identity, VillageCast},
};

const VILLAGER_SIZE: Vec2 = Vec2::new(24.0, 32.0);

/// Spawns the villagers and registers them in the roster. Maren and Tam
/// stand within interaction range of each other; Edda keeps to herself at
/// the far edge of the green.
pub fn spawn_villagers(
    mut commands: Commands,
    mut generator: ResMut<CharacterIdGenerator>,
    mut roster: ResMut<CharacterRoster>,
) {
    let villagers = [
        ("Maren", Vec2::new(-30.0, 20.0), Color::srgb_u8(205, 120, 70)),
        ("Tam", Vec2::new(20.0, 20.0), Color::srgb_u8(110, 140, 205)),
        ("Edda", Vec2::new(320.0, -90.0), Color::srgb_u8(150, 190, 110)),
    ];

    let mut ids = Vec::with_capacity(villagers.len());
    for (name, position, color) in villagers {
        let id = generator.next_id();
        roster.register_character(id, name, false);
        commands.spawn((
            Sprite::from_color(color, VILLAGER_SIZE),
            Transform::from_xyz(position.x, position.y, 0.0),
            id,
            Identity::new(id, name),
        ));
        info!("Spawned villager {} as {}", name, id);
        ids.push(id);
    }

    commands.insert_resource(VillageCast {
        maren: ids[0],
        tam: ids[1],
        edda: ids[2],
    });
}

/// Builds the village's dialogue trees and assigns each to its initiator.
/// Registration order matters for characters owning several trees: the
/// first eligible one wins the activation sweep.
pub fn author_dialogue_trees(
    cast: Res<VillageCast>,
    mut library: ResMut<DialogueLibrary>,
    mut roster: ResMut<CharacterRoster>,
) {
    let player = CharacterId::player();

    // Maren tries the rumor first; its gate rarely passes, so the everyday
    // gossip right after it is what usually plays.
    install(&mut library, &mut roster, cast.maren, rumor_tree(cast.maren, cast.tam));
    install(&mut library, &mut roster, cast.maren, gossip_tree(cast.maren, cast.tam));

    install(&mut library, &mut roster, player, maren_greeting_tree(player, cast.maren));
    install(&mut library, &mut roster, player, tam_greeting_tree(player, cast.tam));
    install(&mut library, &mut roster, player, edda_greeting_tree(player, cast.edda));

    info!("Dialogue library holds {} trees", library.len());
}

fn install(
    library: &mut DialogueLibrary,
    roster: &mut CharacterRoster,
    owner: CharacterId,
    tree: Result<DialogueFsm, FsmBuildError>,
) {
    match tree {
        Ok(fsm) => {
            let id = library.register(fsm);
            roster.add_fsm(owner, id);
        }
        Err(err) => error!("Skipping malformed dialogue tree: {err}"),
    }
}

/// Ambient chatter between Maren and Tam; runs entirely on its own.
fn gossip_tree(maren: CharacterId, tam: CharacterId) -> Result<DialogueFsm, FsmBuildError> {
    let mut builder = FsmBuilder::new(maren).participant(tam);
    let parting = builder.add_state(
        DialogueState::new(TurnMode::AutoAdvance)
            .line(maren, "Mind the cart ruts on your way back."),
    );
    let reply = builder.add_state(
        DialogueState::new(TurnMode::AutoAdvance)
            .line(tam, "Wheel came off the mill cart again.")
            .transition_to(AUTO_ADVANCE_INDEX, parting),
    );
    let opening = builder.add_state(
        DialogueState::new(TurnMode::AutoAdvance)
            .line(maren, "Slow morning, Tam?")
            .transition_to(AUTO_ADVANCE_INDEX, reply),
    );
    builder.set_start(opening);
    builder.build()
}

/// Rare variant of the Maren and Tam chat, hidden behind a low start gate.
fn rumor_tree(maren: CharacterId, tam: CharacterId) -> Result<DialogueFsm, FsmBuildError> {
    let mut builder = FsmBuilder::new(maren).participant(tam).start_chance(0.15);
    let hush = builder.add_state(
        DialogueState::new(TurnMode::AutoAdvance).line(tam, "Not so loud, someone will hear."),
    );
    let opening = builder.add_state(
        DialogueState::new(TurnMode::AutoAdvance)
            .line(maren, "Heard strange lights were seen past the weir.")
            .transition_to(AUTO_ADVANCE_INDEX, hush),
    );
    builder.set_start(opening);
    builder.build()
}

/// The player's main branching conversation with Maren.
fn maren_greeting_tree(
    player: CharacterId,
    maren: CharacterId,
) -> Result<DialogueFsm, FsmBuildError> {
    let mut builder = FsmBuilder::new(player).participant(maren);
    let farewell = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance).line(maren, "Safe roads, then."),
    );
    let flour_reply = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(maren, "Flour's two coppers the sack, milled fresh this week.")
            .transition_to(AUTO_ADVANCE_INDEX, farewell),
    );
    let ask_flour = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(player, "What's the flour going for?")
            .transition_to(AUTO_ADVANCE_INDEX, flour_reply),
    );
    let news_reply = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(maren, "Tam's cart broke again, that's the whole of it.")
            .transition_to(AUTO_ADVANCE_INDEX, farewell),
    );
    let ask_news = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(player, "Any news from the village?")
            .transition_to(AUTO_ADVANCE_INDEX, news_reply),
    );
    let leave = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance).line(player, "Never mind, sorry."),
    );
    let greeting = builder.add_state(
        DialogueState::new(TurnMode::WaitForChoice)
            .line(maren, "Morning, traveller. Something you need?")
            .transition_to(1, ask_flour)
            .transition_to(2, ask_news)
            .transition_to(3, leave),
    );
    builder.set_start(greeting);
    builder.build()
}

/// A short two-beat exchange with Tam.
fn tam_greeting_tree(player: CharacterId, tam: CharacterId) -> Result<DialogueFsm, FsmBuildError> {
    let mut builder = FsmBuilder::new(player).participant(tam);
    let reply = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(tam, "Can't stop, the mill won't wait. Another time."),
    );
    let greeting = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(player, "Need a hand with that cart?")
            .transition_to(AUTO_ADVANCE_INDEX, reply),
    );
    builder.set_start(greeting);
    builder.build()
}

/// Edda offers a small branching exchange away from the square.
fn edda_greeting_tree(
    player: CharacterId,
    edda: CharacterId,
) -> Result<DialogueFsm, FsmBuildError> {
    let mut builder = FsmBuilder::new(player).participant(edda);
    let herbs_reply = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(edda, "Feverfew and comfrey, if the frost spared them."),
    );
    let ask_herbs = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(player, "What grows out here?")
            .transition_to(AUTO_ADVANCE_INDEX, herbs_reply),
    );
    let quiet_reply = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance).line(edda, "That it is. Mind you keep it so."),
    );
    let remark = builder.add_state(
        DialogueState::new(TurnMode::WaitForAdvance)
            .line(player, "Quiet out here.")
            .transition_to(AUTO_ADVANCE_INDEX, quiet_reply),
    );
    let greeting = builder.add_state(
        DialogueState::new(TurnMode::WaitForChoice)
            .line(edda, "You're a long way from the square.")
            .transition_to(1, ask_herbs)
            .transition_to(2, remark),
    );
    builder.set_start(greeting);
    builder.build()
}
