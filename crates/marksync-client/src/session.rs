//! Per-view session: owns the store and wires the moving parts together.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

use marksync_core::{Bookmark, BookmarkView, ViewStore};

use crate::channel::ChangeChannel;
use crate::coordinator::MutationCoordinator;
use crate::health::ConnectionHealthMonitor;
use crate::listener::{ChangeStreamListener, SubscriptionState};
use crate::notify::NoticeSink;
use crate::service::{
    BookmarkWriter, CreateError, DeleteError, SnapshotError, SnapshotLoader, SubscribeError,
};
use crate::shared::SharedStore;

/// One user's bookmark list for the lifetime of one active view.
///
/// The session exclusively owns its store: it is constructed from the
/// initial snapshot, mutated only through the coordinator and the listener,
/// and discarded on teardown. Nothing here is a process-wide singleton; a
/// second tab is a second session with its own store and subscription.
pub struct BookmarkSession {
    store: SharedStore,
    writer: Arc<dyn BookmarkWriter>,
    loader: Arc<dyn SnapshotLoader>,
    notices: Arc<dyn NoticeSink>,
    listener: Arc<ChangeStreamListener>,
    health: Arc<ConnectionHealthMonitor>,
    coordinator: Mutex<Arc<MutationCoordinator>>,
    owner_id: Mutex<String>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl BookmarkSession {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        initial_records: Vec<Bookmark>,
        writer: Arc<dyn BookmarkWriter>,
        loader: Arc<dyn SnapshotLoader>,
        channel: Arc<dyn ChangeChannel>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        let owner_id = owner_id.into();
        let store = SharedStore::new(ViewStore::from_snapshot(initial_records));
        let listener = Arc::new(ChangeStreamListener::new(channel, store.clone()));
        let health = Arc::new(ConnectionHealthMonitor::new(Arc::clone(&notices)));
        let coordinator = Arc::new(MutationCoordinator::new(
            owner_id.clone(),
            store.clone(),
            Arc::clone(&writer),
            Arc::clone(&notices),
        ));
        Self {
            store,
            writer,
            loader,
            notices,
            listener,
            health,
            coordinator: Mutex::new(coordinator),
            owner_id: Mutex::new(owner_id),
            health_task: Mutex::new(None),
        }
    }

    /// Starts health observation and subscribes the change stream.
    ///
    /// A subscribe failure leaves the session usable — local mutations keep
    /// working — but degraded until [`BookmarkSession::refresh_subscription`]
    /// or [`BookmarkSession::resynchronize`].
    pub async fn start(&self) -> Result<(), SubscribeError> {
        self.spawn_health_observer();
        self.listener.subscribe(&self.owner_id()).await
    }

    /// Current list in render order, newest first.
    #[must_use]
    pub fn views(&self) -> Vec<BookmarkView> {
        self.store.lock().views().to_vec()
    }

    pub async fn create(&self, raw_url: &str) -> Result<Bookmark, CreateError> {
        self.current_coordinator().create(raw_url).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DeleteError> {
        self.current_coordinator().delete(id).await
    }

    /// Whether a delete call for this id is still in flight.
    #[must_use]
    pub fn is_deleting(&self, id: &str) -> bool {
        self.current_coordinator().is_deleting(id)
    }

    /// Whether the change stream can currently guarantee delivery.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    #[must_use]
    pub fn subscription_state(&self) -> SubscriptionState {
        self.listener.state()
    }

    #[must_use]
    pub fn owner_id(&self) -> String {
        self.owner_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Manual resynchronization: re-fetches the full snapshot and installs
    /// it wholesale. The recovery path for a degraded subscription.
    pub async fn resynchronize(&self) -> Result<(), SnapshotError> {
        let owner_id = self.owner_id();
        let records = self.loader.fetch_snapshot(&owner_id).await?;
        debug!(count = records.len(), "snapshot reinstalled");
        self.store.lock().replace_all(records);
        Ok(())
    }

    /// Tears the current subscription down and establishes a fresh one.
    pub async fn refresh_subscription(&self) -> Result<(), SubscribeError> {
        self.listener.subscribe(&self.owner_id()).await
    }

    /// Switches the session to a different owner: installs that owner's
    /// snapshot, swaps the mutation path, and re-subscribes (the previous
    /// subscription is fully torn down first).
    pub async fn set_owner(
        &self,
        owner_id: impl Into<String>,
        initial_records: Vec<Bookmark>,
    ) -> Result<(), SubscribeError> {
        let owner_id = owner_id.into();
        *self
            .owner_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = owner_id.clone();
        let coordinator = Arc::new(MutationCoordinator::new(
            owner_id.clone(),
            self.store.clone(),
            Arc::clone(&self.writer),
            Arc::clone(&self.notices),
        ));
        *self
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = coordinator;
        self.store.lock().replace_all(initial_records);
        self.listener.subscribe(&owner_id).await
    }

    /// Ends the session: tears the subscription down immediately and stops
    /// health observation. Service calls still in flight settle against a
    /// store nobody renders anymore; their results are effectively
    /// discarded.
    pub fn teardown(&self) {
        self.listener.teardown();
        let task = self
            .health_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    fn current_coordinator(&self) -> Arc<MutationCoordinator> {
        Arc::clone(
            &self
                .coordinator
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn spawn_health_observer(&self) {
        let mut state_rx = self.listener.watch_state();
        let health = Arc::clone(&self.health);
        let task = tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow_and_update();
                health.observe(state);
            }
        });
        let previous = self
            .health_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for BookmarkSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
