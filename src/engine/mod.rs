// Engine modules: assets, input, world

pub mod assets;
pub mod input;
pub mod world;
