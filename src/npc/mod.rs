//! NPC module: villager identities and the authored village dialogue.
pub mod components;
pub mod plugin;
pub mod systems;

pub use plugin::NpcPlugin;
