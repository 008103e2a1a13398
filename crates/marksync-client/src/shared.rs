//! Shared ownership of one session's view store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use marksync_core::ViewStore;

/// The view store behind a lock shared by the mutation coordinator and the
/// change-stream listener.
///
/// Every store operation is a single synchronous step taken with the lock
/// held and never across an await point, which is what makes interleaved
/// mutations atomic with respect to each other.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<ViewStore>>,
}

impl SharedStore {
    #[must_use]
    pub fn new(store: ViewStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Locks the store for one synchronous operation.
    ///
    /// A poisoned lock is recovered rather than propagated: store operations
    /// cannot panic halfway through a mutation, so the inner state is intact.
    pub fn lock(&self) -> MutexGuard<'_, ViewStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
