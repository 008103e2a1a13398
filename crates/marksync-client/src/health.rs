//! Connection health: a pure observer of subscription state transitions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::listener::SubscriptionState;
use crate::notify::{NoticeSink, UserNotice};

const DEGRADED_NOTICE: &str = "Realtime connection issue. You can refresh to sync.";

/// Tracks whether the change stream can currently guarantee delivery.
///
/// Entering `Degraded` produces exactly one user notice per episode, no
/// matter how many errors follow; the episode ends when the subscription
/// reaches `Subscribed` again. The monitor never touches the store — its
/// only outputs are the `healthy` flag and that single notice, which points
/// the user at the manual resynchronize action.
pub struct ConnectionHealthMonitor {
    notices: Arc<dyn NoticeSink>,
    healthy: AtomicBool,
    notified_this_episode: AtomicBool,
}

impl ConnectionHealthMonitor {
    #[must_use]
    pub fn new(notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            notices,
            healthy: AtomicBool::new(true),
            notified_this_episode: AtomicBool::new(false),
        }
    }

    /// Feeds one observed state transition.
    pub fn observe(&self, state: SubscriptionState) {
        match state {
            SubscriptionState::Subscribed => {
                self.healthy.store(true, Ordering::Relaxed);
                self.notified_this_episode.store(false, Ordering::Relaxed);
            }
            SubscriptionState::Degraded => {
                self.healthy.store(false, Ordering::Relaxed);
                if !self.notified_this_episode.swap(true, Ordering::Relaxed) {
                    self.notices
                        .notify(UserNotice::Error(DEGRADED_NOTICE.to_string()));
                }
            }
            // Neither state says anything about delivery guarantees; the
            // flag keeps its last known value across a re-subscribe.
            SubscriptionState::Disconnected | SubscriptionState::Connecting => {}
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}
