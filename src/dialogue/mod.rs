//! Conversation core: dialogue trees, character bookkeeping, and the handler
//! that runs every active conversation.
pub mod conversation;
pub mod errors;
pub mod events;
pub mod fsm;
pub mod handler;
pub mod library;
pub mod plugin;
pub mod roster;
pub mod settings;
pub mod systems;

pub use plugin::DialoguePlugin;
