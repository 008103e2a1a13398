//! Async shell around the marksync reconciliation core.
//!
//! This crate intentionally exposes a small surface:
//! - service interface traits (creation/deletion, snapshot) and their
//!   default HTTP implementation
//! - the mutation coordinator for optimistic create/delete
//! - the change-stream listener and its subscription state machine
//! - the connection health monitor and user-notice boundary
//! - the per-view `BookmarkSession` that wires all of it together
//!
//! Transport for the change stream is not implemented here; the listener
//! consumes typed events from whatever channel implementation the embedder
//! provides.

pub mod channel;
pub mod coordinator;
pub mod health;
pub mod http;
pub mod listener;
pub mod notify;
pub mod service;
pub mod session;
mod shared;

pub use channel::{ChangeChannel, ChannelMessage, ChannelStatus, ChannelSubscription};
pub use coordinator::MutationCoordinator;
pub use health::ConnectionHealthMonitor;
pub use http::{HttpBookmarkService, HttpServiceConfig, resolve_service_base_url};
pub use listener::{ChangeStreamListener, SubscriptionState};
pub use notify::{BufferedNotices, NoticeSink, TracingNotices, UserNotice};
pub use service::{BookmarkWriter, CreateError, DeleteError, SnapshotError, SnapshotLoader, SubscribeError};
pub use session::BookmarkSession;
pub use shared::SharedStore;
