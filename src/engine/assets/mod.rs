// Asset references and resolution
//
// Content data (input configs, mapping contexts, processor and actor classes) is
// referenced softly and resolved on demand, loading synchronously when needed.

mod handle;
mod manager;

pub use handle::{AssetId, SoftRef};
pub use manager::{AssetManager, AssetStats};

use std::cell::RefCell;
use std::rc::Rc;

/// Asset manager shared between the engine and the actions that resolve content
pub type SharedAssets = Rc<RefCell<AssetManager>>;

/// Asset resolution errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset reference is null")]
    NullReference,

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset type for {path}: expected {expected}")]
    InvalidType { path: String, expected: &'static str },
}
