//! External service interfaces and their error taxonomies.

use async_trait::async_trait;
use thiserror::Error;

use marksync_core::{Bookmark, UrlError};

/// Failures of the record creation path.
///
/// `InvalidUrl` and `AlreadyPending` are raised locally before any service
/// call; the remaining variants come back from the creation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),
    #[error("{0}")]
    Validation(String),
    #[error("this url is already being saved")]
    AlreadyPending,
    #[error("you already bookmarked this url")]
    Duplicate,
    #[error("you must be signed in to add bookmarks")]
    Unauthenticated,
    #[error("failed to save bookmark: {0}")]
    Unknown(String),
}

/// Failures of the record deletion path.
///
/// Deleting an id the service no longer knows is not an error; the service
/// treats it as a no-op success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("you must be signed in to delete bookmarks")]
    Unauthenticated,
    #[error("failed to delete bookmark: {0}")]
    Unknown(String),
}

/// Failures fetching the full snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("you must be signed in to load bookmarks")]
    Unauthenticated,
    #[error("failed to load bookmarks: {0}")]
    Unknown(String),
}

/// Failures establishing a change-stream subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("subscription failed: {0}")]
    Failed(String),
}

/// The record creation/deletion service, owner-scoped.
///
/// Safe to call repeatedly; the service rejects duplicate `(owner, url)`
/// pairs rather than requiring idempotent requests.
#[async_trait]
pub trait BookmarkWriter: Send + Sync {
    /// Creates a record for the owner from a raw URL and returns the
    /// completed record as stored.
    async fn create(&self, owner_id: &str, url: &str) -> Result<Bookmark, CreateError>;

    /// Deletes the record with this id. Succeeds when the id is absent.
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), DeleteError>;
}

/// Loader for the owner's full ordered record list, newest first.
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    async fn fetch_snapshot(&self, owner_id: &str) -> Result<Vec<Bookmark>, SnapshotError>;
}
