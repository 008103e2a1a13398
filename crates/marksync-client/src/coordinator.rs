//! Mutation coordination: optimistic create and delete with reconciliation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use marksync_core::{
    Bookmark, BookmarkView, CorrelationKey, normalize_url, temp_id,
};

use crate::notify::{NoticeSink, UserNotice};
use crate::service::{BookmarkWriter, CreateError, DeleteError};
use crate::shared::SharedStore;

/// Orchestrates user-initiated mutations against one session's store.
///
/// Every mutation applies its optimistic change synchronously before the
/// service call suspends, and reconciles (commit or rollback) when the call
/// settles. Failures roll back only the exact entry the mutation touched;
/// unrelated concurrent edits are never disturbed.
pub struct MutationCoordinator {
    owner_id: String,
    store: SharedStore,
    writer: Arc<dyn BookmarkWriter>,
    notices: Arc<dyn NoticeSink>,
    deleting: Mutex<HashSet<String>>,
}

impl MutationCoordinator {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        store: SharedStore,
        writer: Arc<dyn BookmarkWriter>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            store,
            writer,
            notices,
            deleting: Mutex::new(HashSet::new()),
        }
    }

    /// Creates a bookmark from a raw URL.
    ///
    /// The pending view is visible before this future first suspends. A
    /// second create for the same `(owner, normalized url)` while one is in
    /// flight is rejected up front with [`CreateError::AlreadyPending`], so
    /// the store never holds two pending views for one correlation key.
    pub async fn create(&self, raw_url: &str) -> Result<Bookmark, CreateError> {
        let url = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(error) => {
                let error = CreateError::from(error);
                self.notices.notify(UserNotice::Error(error.to_string()));
                return Err(error);
            }
        };
        let key = CorrelationKey::new(self.owner_id.clone(), &url);

        {
            let mut store = self.store.lock();
            if store.has_pending_for(&key) {
                drop(store);
                let error = CreateError::AlreadyPending;
                self.notices.notify(UserNotice::Error(error.to_string()));
                return Err(error);
            }
            let now = Utc::now();
            let optimistic = Bookmark {
                id: temp_id(),
                owner_id: self.owner_id.clone(),
                url: url.to_string(),
                title: url.host_str().unwrap_or_default().to_string(),
                created_at: now,
                updated_at: now,
            };
            store.insert_pending(BookmarkView::optimistic(optimistic));
        }

        match self.writer.create(&self.owner_id, url.as_str()).await {
            Ok(record) => {
                let outcome = self.store.lock().commit(&key, record.clone());
                debug!(id = %record.id, ?outcome, "create committed");
                self.notices
                    .notify(UserNotice::Success("Bookmark added.".to_string()));
                Ok(record)
            }
            Err(error) => {
                let removed = self.store.lock().rollback(&key);
                warn!(%error, removed, "create rolled back");
                self.notices.notify(UserNotice::Error(error.to_string()));
                Err(error)
            }
        }
    }

    /// Deletes the bookmark with this id.
    ///
    /// The view disappears before this future first suspends; on failure the
    /// captured view is restored at the head of the list with identical
    /// fields. Deleting an id the store no longer holds is a no-op locally
    /// and a success remotely.
    pub async fn delete(&self, id: &str) -> Result<(), DeleteError> {
        self.mark_deleting(id, true);
        let captured = self.store.lock().remove_by_id(id);

        let result = self.writer.delete(&self.owner_id, id).await;
        self.mark_deleting(id, false);

        match result {
            Ok(()) => {
                self.notices
                    .notify(UserNotice::Success("Bookmark deleted.".to_string()));
                Ok(())
            }
            Err(error) => {
                if let Some(view) = captured {
                    self.store.lock().restore_at_head(view);
                }
                warn!(%error, id, "delete rolled back");
                self.notices.notify(UserNotice::Error(error.to_string()));
                Err(error)
            }
        }
    }

    /// Whether a delete call for this id is still in flight.
    #[must_use]
    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn mark_deleting(&self, id: &str, deleting: bool) {
        let mut ids = self
            .deleting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if deleting {
            ids.insert(id.to_string());
        } else {
            ids.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use marksync_core::ViewStore;
    use tokio::sync::Notify;

    use crate::notify::BufferedNotices;

    fn record(id: &str, url: &str) -> Bookmark {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts");
        Bookmark {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            url: url.to_string(),
            title: "Example".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Writer whose responses are scripted per call and which can hold a
    /// call open until released, to exercise in-flight interleavings.
    #[derive(Default)]
    struct ScriptedWriter {
        create_results: Mutex<Vec<Result<Bookmark, CreateError>>>,
        delete_results: Mutex<Vec<Result<(), DeleteError>>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedWriter {
        fn pop<T>(queue: &Mutex<Vec<T>>) -> Option<T> {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop()
        }

        fn push_create(&self, result: Result<Bookmark, CreateError>) {
            self.create_results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(result);
        }

        fn push_delete(&self, result: Result<(), DeleteError>) {
            self.delete_results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(result);
        }
    }

    #[async_trait]
    impl BookmarkWriter for ScriptedWriter {
        async fn create(&self, _owner_id: &str, _url: &str) -> Result<Bookmark, CreateError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Self::pop(&self.create_results)
                .unwrap_or_else(|| Err(CreateError::Unknown("unscripted".to_string())))
        }

        async fn delete(&self, _owner_id: &str, _id: &str) -> Result<(), DeleteError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Self::pop(&self.delete_results)
                .unwrap_or_else(|| Err(DeleteError::Unknown("unscripted".to_string())))
        }
    }

    fn coordinator(
        store: SharedStore,
        writer: Arc<ScriptedWriter>,
    ) -> (MutationCoordinator, Arc<BufferedNotices>) {
        let notices = Arc::new(BufferedNotices::new());
        let sink: Arc<dyn NoticeSink> = notices.clone();
        let coordinator = MutationCoordinator::new("owner-1", store, writer, sink);
        (coordinator, notices)
    }

    #[tokio::test]
    async fn create_commits_returned_record_at_head() {
        let store = SharedStore::new(ViewStore::new());
        let writer = Arc::new(ScriptedWriter::default());
        writer.push_create(Ok(record("r1", "https://example.com/a")));
        let (coordinator, notices) = coordinator(store.clone(), writer);

        let created = coordinator
            .create("https://example.com/a")
            .await
            .expect("created");
        assert_eq!(created.id, "r1");

        let store = store.lock();
        assert_eq!(store.len(), 1);
        assert_eq!(store.views()[0].record.title, "Example");
        assert!(!store.views()[0].pending);
        drop(store);
        assert_eq!(
            notices.drain(),
            vec![UserNotice::Success("Bookmark added.".to_string())]
        );
    }

    #[tokio::test]
    async fn invalid_url_changes_nothing() {
        let store = SharedStore::new(ViewStore::new());
        let (coordinator, notices) = coordinator(store.clone(), Arc::new(ScriptedWriter::default()));

        let result = coordinator.create("not a url").await;
        assert!(matches!(result, Err(CreateError::InvalidUrl(_))));
        assert!(store.lock().is_empty());
        assert_eq!(notices.drain().len(), 1);
    }

    #[tokio::test]
    async fn failed_create_restores_previous_count() {
        let store = SharedStore::new(ViewStore::from_snapshot(vec![record(
            "r0",
            "https://example.com/z",
        )]));
        let writer = Arc::new(ScriptedWriter::default());
        writer.push_create(Err(CreateError::Duplicate));
        let (coordinator, notices) = coordinator(store.clone(), writer);

        let result = coordinator.create("https://example.com/a").await;
        assert_eq!(result, Err(CreateError::Duplicate));
        assert_eq!(store.lock().len(), 1);
        assert_eq!(
            notices.drain(),
            vec![UserNotice::Error(
                "you already bookmarked this url".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn second_create_for_same_key_is_rejected_while_first_is_in_flight() {
        let store = SharedStore::new(ViewStore::new());
        let gate = Arc::new(Notify::new());
        let writer = Arc::new(ScriptedWriter {
            gate: Some(Arc::clone(&gate)),
            ..ScriptedWriter::default()
        });
        writer.push_create(Ok(record("r1", "https://example.com/a")));
        let (coordinator, _notices) = coordinator(store.clone(), writer);
        let coordinator = Arc::new(coordinator);

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.create("https://example.com/a").await }
        });
        // Wait for the optimistic insert of the first call.
        while !store
            .lock()
            .has_pending_for(&CorrelationKey::new(
                "owner-1",
                &normalize_url("https://example.com/a").expect("url"),
            ))
        {
            tokio::task::yield_now().await;
        }

        // Equivalent normalized URL, different spelling.
        let second = coordinator.create("https://example.com:443/a").await;
        assert_eq!(second, Err(CreateError::AlreadyPending));
        assert_eq!(store.lock().len(), 1);

        gate.notify_one();
        let first = first.await.expect("join").expect("created");
        assert_eq!(first.id, "r1");
        assert_eq!(store.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_restores_identical_view_at_head() {
        let store = SharedStore::new(ViewStore::from_snapshot(vec![
            record("r1", "https://example.com/a"),
            record("r2", "https://example.com/b"),
        ]));
        let original = store.lock().get("r2").cloned().expect("view");
        let writer = Arc::new(ScriptedWriter::default());
        writer.push_delete(Err(DeleteError::Unknown("boom".to_string())));
        let (coordinator, notices) = coordinator(store.clone(), writer);

        let result = coordinator.delete("r2").await;
        assert!(result.is_err());

        let store = store.lock();
        assert_eq!(store.len(), 2);
        assert_eq!(store.views()[0], original);
        drop(store);
        assert_eq!(notices.drain().len(), 1);
        assert!(!coordinator.is_deleting("r2"));
    }

    #[tokio::test]
    async fn delete_removes_immediately_and_reports_in_flight() {
        let store = SharedStore::new(ViewStore::from_snapshot(vec![record(
            "r1",
            "https://example.com/a",
        )]));
        let gate = Arc::new(Notify::new());
        let writer = Arc::new(ScriptedWriter {
            gate: Some(Arc::clone(&gate)),
            ..ScriptedWriter::default()
        });
        writer.push_delete(Ok(()));
        let (coordinator, _notices) = coordinator(store.clone(), writer);
        let coordinator = Arc::new(coordinator);

        let call = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.delete("r1").await }
        });
        while !coordinator.is_deleting("r1") {
            tokio::task::yield_now().await;
        }
        assert!(store.lock().is_empty());

        gate.notify_one();
        call.await.expect("join").expect("deleted");
        assert!(store.lock().is_empty());
        assert!(!coordinator.is_deleting("r1"));
    }

    #[tokio::test]
    async fn double_delete_second_call_is_a_no_op() {
        let store = SharedStore::new(ViewStore::from_snapshot(vec![record(
            "r1",
            "https://example.com/a",
        )]));
        let writer = Arc::new(ScriptedWriter::default());
        writer.push_delete(Ok(()));
        writer.push_delete(Ok(()));
        let (coordinator, _notices) = coordinator(store.clone(), writer);

        coordinator.delete("r1").await.expect("first");
        coordinator.delete("r1").await.expect("second");
        assert!(store.lock().is_empty());
    }
}
