// Soft asset references

use std::fmt;
use std::marker::PhantomData;

/// Unique identifier for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    /// Create a new asset ID from a string path
    pub fn from_path(path: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Get the raw u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Typed reference to an asset that may not be loaded yet
///
/// A soft reference never keeps the asset alive. It is resolved through the
/// [`AssetManager`](super::AssetManager), which returns the loaded instance or
/// loads it synchronously. A reference without a path is "null": content authors
/// are allowed to leave optional slots empty.
pub struct SoftRef<T> {
    path: Option<String>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> SoftRef<T> {
    /// Reference the asset stored at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            _phantom: PhantomData,
        }
    }

    /// An empty reference
    pub fn null() -> Self {
        Self {
            path: None,
            _phantom: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.path.is_none()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Asset ID of the referenced path
    pub fn id(&self) -> Option<AssetId> {
        self.path.as_deref().map(AssetId::from_path)
    }
}

// Manual impls: `T` itself does not need to be Clone/Debug/PartialEq.
impl<T> Clone for SoftRef<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for SoftRef<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for SoftRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<T> fmt::Debug for SoftRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "SoftRef({path})"),
            None => f.write_str("SoftRef(null)"),
        }
    }
}
