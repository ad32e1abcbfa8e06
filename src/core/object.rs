// Object identity for subscription owners, worlds and listeners

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a live object
///
/// Used wherever bulk "remove everything this object registered" is needed:
/// input bindings, player listeners, instance-started listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}
