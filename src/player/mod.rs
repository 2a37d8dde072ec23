//! Player module: the controllable character and its dialogue input.
pub mod components;
pub mod plugin;
pub mod systems;

pub use plugin::PlayerPlugin;
