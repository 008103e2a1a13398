//! User-visible notices and the sink boundary a UI implements.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

/// One user-facing notification. Every mutation failure surfaces exactly
/// one of these; successes surface one as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    Success(String),
    Error(String),
}

impl UserNotice {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }
}

/// Delivery boundary for notices (the toast layer in a UI).
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: UserNotice);
}

/// Sink that records notices in memory, for tests and headless embedders.
#[derive(Debug, Default)]
pub struct BufferedNotices {
    notices: Mutex<Vec<UserNotice>>,
}

impl BufferedNotices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything notified so far, oldest first.
    pub fn drain(&self) -> Vec<UserNotice> {
        let mut notices = self
            .notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *notices)
    }
}

impl NoticeSink for BufferedNotices {
    fn notify(&self, notice: UserNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

/// Sink that logs notices through `tracing`, for embedders without a UI.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotices;

impl NoticeSink for TracingNotices {
    fn notify(&self, notice: UserNotice) {
        match notice {
            UserNotice::Success(message) => info!("{message}"),
            UserNotice::Error(message) => warn!("{message}"),
        }
    }
}
