//! SnapshotStore — the single shared holder of the latest snapshot.
//!
//! Readers clone an `Arc<Snapshot>` under a read lock held only for the
//! pointer copy; the writer swaps in a new `Arc` under a write lock held
//! equally briefly. Neither side ever sees or mutates a snapshot in place.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::types::Snapshot;

/// Thread-safe cell holding the most recently published snapshot.
#[derive(Clone)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotStore {
    /// Create a store holding [`Snapshot::initial`].
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::initial())
    }

    /// Create a store seeded with `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        // A poisoned lock still holds a complete Arc; the swap cannot panic halfway.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the current snapshot and return the published value.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        debug!(
            records = next.records.len(),
            up = next.up,
            previous_records = previous.records.len(),
            "snapshot published"
        );
        next
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
