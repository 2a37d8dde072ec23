//! World module: camera, backdrop, and proximity detection.
pub mod components;
pub mod plugin;
pub mod systems;

pub use plugin::WorldPlugin;
