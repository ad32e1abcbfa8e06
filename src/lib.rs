// Feature-driven input binding
//
// Game features attach input content to actors as they appear and take it
// back when the feature deactivates:
// - `engine`: worlds, actors, assets and the input plumbing they share
// - `game`: the playable pawn feature and the feature activation actions

pub mod core;
pub mod engine;
pub mod game;
pub mod settings;

pub use settings::PluginSettings;
