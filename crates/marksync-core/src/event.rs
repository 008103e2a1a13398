//! Remote change events and the reducer that merges them into the store.

use serde::{Deserialize, Serialize};

use crate::record::Bookmark;
use crate::store::{UpsertOutcome, ViewStore};

/// One normalized event from the per-owner change stream.
///
/// Wire shape: `{"type":"insert","record":{..}}` / `{"type":"delete","id":".."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Insert { record: Bookmark },
    Delete { id: String },
}

/// What applying one event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// New record prepended.
    Inserted,
    /// Replaced an outstanding pending view for the same correlation key.
    MergedPending,
    /// Insert for an id already in the list; duplicate delivery, ignored.
    DuplicateIgnored,
    /// Insert for a record belonging to a different owner; discarded.
    ScopeMismatch,
    /// Delete removed the view.
    Removed,
    /// Delete for an id already absent (commonly our own delete's echo).
    AlreadyAbsent,
}

/// Merges one remote event into the store.
///
/// Deterministic and transport-free: the same store state and event always
/// produce the same outcome, regardless of how the event raced against local
/// mutations for the same entity. Insert events scoped to another owner are
/// discarded without touching the store.
pub fn apply_change(
    store: &mut ViewStore,
    viewer_owner_id: &str,
    event: ChangeEvent,
) -> ChangeOutcome {
    match event {
        ChangeEvent::Insert { record } => {
            if record.owner_id != viewer_owner_id {
                return ChangeOutcome::ScopeMismatch;
            }
            match store.upsert_by_id(record) {
                UpsertOutcome::Ignored => ChangeOutcome::DuplicateIgnored,
                UpsertOutcome::MergedPending => ChangeOutcome::MergedPending,
                UpsertOutcome::Inserted => ChangeOutcome::Inserted,
            }
        }
        ChangeEvent::Delete { id } => match store.remove_by_id(&id) {
            Some(_) => ChangeOutcome::Removed,
            None => ChangeOutcome::AlreadyAbsent,
        },
    }
}
