//! Bookmark record and record-view types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::identity::normalize_url;

/// Prefix for locally-synthesized ids of not-yet-confirmed records.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Durable bookmark record as confirmed by the source of truth.
///
/// `id` is globally unique and stable once assigned; `(owner_id, url)` is
/// unique per owner, enforced remotely and surfaced here as a duplicate
/// error on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List element: a record plus a transient pending flag.
///
/// `pending` marks an optimistically inserted entry still awaiting its
/// service confirmation. At most one pending view per correlation key may
/// exist at any instant; the mutation path enforces this before inserting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkView {
    pub record: Bookmark,
    pub pending: bool,
}

impl BookmarkView {
    /// Wraps a confirmed record.
    #[must_use]
    pub fn confirmed(record: Bookmark) -> Self {
        Self {
            record,
            pending: false,
        }
    }

    /// Wraps a locally-created record awaiting confirmation.
    #[must_use]
    pub fn optimistic(record: Bookmark) -> Self {
        Self {
            record,
            pending: true,
        }
    }

    /// Correlation key of this view, if its URL still parses.
    #[must_use]
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        CorrelationKey::for_record(&self.record)
    }
}

/// Pre-confirmation identity: owner plus normalized URL.
///
/// Used only while a view is pending and has no durable id. Once the record
/// is committed, identity shifts to `id` and the key is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    owner_id: String,
    url: String,
}

impl CorrelationKey {
    /// Builds a key from an owner and an already-parsed URL.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, url: &Url) -> Self {
        Self {
            owner_id: owner_id.into(),
            url: url.to_string(),
        }
    }

    /// Builds a key from a record by re-parsing its URL.
    ///
    /// Returns `None` when the stored URL no longer parses; such a record
    /// can only be matched by id.
    #[must_use]
    pub fn for_record(record: &Bookmark) -> Option<Self> {
        normalize_url(&record.url)
            .ok()
            .map(|url| Self::new(record.owner_id.clone(), &url))
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Synthesizes a locally-unique temporary id for a pending record.
#[must_use]
pub fn temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Whether an id was locally synthesized rather than assigned remotely.
#[must_use]
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
