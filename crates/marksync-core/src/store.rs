//! Local view store: the ordered, de-duplicated list of record-views.

use crate::record::{Bookmark, BookmarkView, CorrelationKey};

/// Outcome of committing a pending create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The pending view was replaced in place with the confirmed record.
    Replaced,
    /// No matching view existed; the confirmed record was prepended.
    Inserted,
    /// A view with the confirmed id was already present (the remote insert
    /// event won the race); any pending twin was dropped.
    AlreadyPresent,
}

/// Outcome of applying a remote insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A view with this id already exists; duplicate delivery, ignored.
    Ignored,
    /// A pending view with the same correlation key was replaced in place.
    MergedPending,
    /// No related view existed; the record was prepended.
    Inserted,
}

/// Ordered list of record-views for one active session view, newest first.
///
/// Post-conditions on every operation: no two non-pending views share an id,
/// and at most one pending view exists per correlation key. The store is
/// exclusively owned by its session; all operations are synchronous and
/// touch nothing but the list.
#[derive(Debug, Default, Clone)]
pub struct ViewStore {
    views: Vec<BookmarkView>,
}

impl ViewStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the initial snapshot, all entries non-pending.
    #[must_use]
    pub fn from_snapshot(records: Vec<Bookmark>) -> Self {
        let mut store = Self::new();
        store.replace_all(records);
        store
    }

    /// Discards current state and installs a fresh ordered list.
    ///
    /// Used at initialization and on manual resynchronization. The loader's
    /// order is trusted as-is (newest first); entries are deduplicated by id
    /// keeping the first occurrence.
    pub fn replace_all(&mut self, records: Vec<Bookmark>) {
        self.views.clear();
        for record in records {
            if !self.contains_id(&record.id) {
                self.views.push(BookmarkView::confirmed(record));
            }
        }
    }

    /// Prepends a pending view.
    ///
    /// Precondition: no existing pending view shares its correlation key.
    /// The mutation path enforces this by rejecting a second create for the
    /// same key while one is in flight; see [`ViewStore::has_pending_for`].
    pub fn insert_pending(&mut self, view: BookmarkView) {
        debug_assert!(view.pending, "insert_pending takes an optimistic view");
        debug_assert!(
            view.correlation_key()
                .is_none_or(|key| !self.has_pending_for(&key)),
            "second pending view for one correlation key"
        );
        self.views.insert(0, view);
    }

    /// Whether a pending view with this correlation key is in the list.
    #[must_use]
    pub fn has_pending_for(&self, key: &CorrelationKey) -> bool {
        self.views
            .iter()
            .any(|view| view.pending && view.correlation_key().as_ref() == Some(key))
    }

    /// Resolves a pending create with its confirmed record.
    ///
    /// The view matching `key` is replaced in place, preserving its position.
    /// If the confirmed id is already present (a remote insert event for the
    /// same record arrived first), the pending twin is dropped instead and
    /// the canonical row is left untouched. If no match exists at all — the
    /// confirmation lost to a remote delete of the pending twin — the record
    /// is prepended.
    pub fn commit(&mut self, key: &CorrelationKey, record: Bookmark) -> CommitOutcome {
        if self.contains_id(&record.id) {
            self.rollback(key);
            return CommitOutcome::AlreadyPresent;
        }
        if let Some(index) = self.pending_index(key) {
            self.views[index] = BookmarkView::confirmed(record);
            return CommitOutcome::Replaced;
        }
        self.views.insert(0, BookmarkView::confirmed(record));
        CommitOutcome::Inserted
    }

    /// Removes the pending view matching `key`.
    ///
    /// Idempotent: returns `false` when no such view exists.
    pub fn rollback(&mut self, key: &CorrelationKey) -> bool {
        match self.pending_index(key) {
            Some(index) => {
                self.views.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes the view with this id, returning it for possible restoration.
    ///
    /// Idempotent: returns `None` when no such view exists, which is the
    /// steady-state case for a delete echo arriving after the local removal.
    pub fn remove_by_id(&mut self, id: &str) -> Option<BookmarkView> {
        let index = self.views.iter().position(|view| view.record.id == id)?;
        Some(self.views.remove(index))
    }

    /// Applies a remote insert.
    ///
    /// Duplicate deliveries (same id) are ignored; a pending view with the
    /// same correlation key is replaced in place; otherwise the record is
    /// prepended as new.
    pub fn upsert_by_id(&mut self, record: Bookmark) -> UpsertOutcome {
        if self.contains_id(&record.id) {
            return UpsertOutcome::Ignored;
        }
        let merge_index = CorrelationKey::for_record(&record)
            .and_then(|key| self.pending_index(&key));
        match merge_index {
            Some(index) => {
                self.views[index] = BookmarkView::confirmed(record);
                UpsertOutcome::MergedPending
            }
            None => {
                self.views.insert(0, BookmarkView::confirmed(record));
                UpsertOutcome::Inserted
            }
        }
    }

    /// Reinserts a previously captured view at the head of the list.
    ///
    /// Rollback path for a failed delete. Head position is a policy choice:
    /// the original index may no longer exist after concurrent insertions,
    /// and head insertion needs no index bookkeeping. No-op if a view with
    /// the same id reappeared meanwhile (e.g. a remote re-insert).
    pub fn restore_at_head(&mut self, view: BookmarkView) {
        if self.contains_id(&view.record.id) {
            return;
        }
        self.views.insert(0, view);
    }

    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.views.iter().any(|view| view.record.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BookmarkView> {
        self.views.iter().find(|view| view.record.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Current list in render order, newest first.
    #[must_use]
    pub fn views(&self) -> &[BookmarkView] {
        &self.views
    }

    fn pending_index(&self, key: &CorrelationKey) -> Option<usize> {
        self.views
            .iter()
            .position(|view| view.pending && view.correlation_key().as_ref() == Some(key))
    }
}
