//! Dialogue box widgets: screen-space boxes anchored to speakers, with a
//! typewriter reveal and numbered choice menus.
pub mod components;
pub mod plugin;
pub mod systems;

pub use plugin::DialogueBoxPlugin;
