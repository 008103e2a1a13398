//! Reconciliation core for a user's bookmark list.
//!
//! One local replica (the ordered list a UI renders) is kept consistent
//! against a remote source of truth that is updated from three directions:
//! an initial snapshot, optimistic local mutations, and a pushed change
//! stream reporting edits made by other sessions of the same owner.
//!
//! This crate is the synchronous half: record types, the view store and its
//! invariant-preserving operations, identity resolution between pending and
//! confirmed entries, and the deterministic reducer that merges one remote
//! change event into the store. Transport, service calls, and scheduling
//! live in `marksync-client`.

pub mod error;
pub mod event;
pub mod identity;
pub mod record;
pub mod store;

pub use error::UrlError;
pub use event::{ChangeEvent, ChangeOutcome, apply_change};
pub use identity::{matches, normalize_url};
pub use record::{Bookmark, BookmarkView, CorrelationKey, is_temp_id, temp_id};
pub use store::{CommitOutcome, UpsertOutcome, ViewStore};
