//! Change-stream listener: subscription lifecycle and event application.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use marksync_core::apply_change;

use crate::channel::{ChangeChannel, ChannelMessage, ChannelStatus};
use crate::service::SubscribeError;
use crate::shared::SharedStore;

/// Subscription lifecycle state.
///
/// `Degraded` means the channel can no longer guarantee delivery; the view
/// may be missing remote events until a manual resynchronization or a
/// successful re-subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connecting,
    Subscribed,
    Degraded,
}

/// Listens on the per-owner change stream and applies each event to the
/// session's store through the core reducer.
///
/// One listener serves one session view. Re-subscribing (owner change,
/// manual refresh) always tears the previous subscription down before the
/// new one is established, so no logical event is delivered twice through
/// overlapping channels.
pub struct ChangeStreamListener {
    channel: Arc<dyn ChangeChannel>,
    store: SharedStore,
    state_tx: watch::Sender<SubscriptionState>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeStreamListener {
    #[must_use]
    pub fn new(channel: Arc<dyn ChangeChannel>, store: SharedStore) -> Self {
        let (state_tx, _state_rx) = watch::channel(SubscriptionState::Disconnected);
        Self {
            channel,
            store,
            state_tx,
            pump: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        *self.state_tx.borrow()
    }

    /// Watch handle for state transitions (used by the health monitor).
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.state_tx.subscribe()
    }

    /// Subscribes for this owner, replacing any previous subscription.
    ///
    /// On failure the listener lands in `Degraded`: the view keeps working
    /// from local mutations but may miss remote events until resync.
    pub async fn subscribe(&self, owner_id: &str) -> Result<(), SubscribeError> {
        self.teardown();
        self.state_tx.send_replace(SubscriptionState::Connecting);

        let mut subscription = match self.channel.subscribe(owner_id).await {
            Ok(subscription) => subscription,
            Err(error) => {
                warn!(%error, owner_id, "change stream subscribe failed");
                self.state_tx.send_replace(SubscriptionState::Degraded);
                return Err(error);
            }
        };

        let store = self.store.clone();
        let state_tx = self.state_tx.clone();
        let owner_id = owner_id.to_string();
        let task = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                match message {
                    ChannelMessage::Status(status) => {
                        apply_status(&state_tx, status);
                    }
                    ChannelMessage::Change(event) => {
                        if *state_tx.borrow() == SubscriptionState::Disconnected {
                            continue;
                        }
                        let outcome = apply_change(&mut store.lock(), &owner_id, event);
                        debug!(?outcome, "remote change applied");
                    }
                }
            }
            // Producer went away without a terminal status; delivery is no
            // longer guaranteed.
            degrade(&state_tx);
        });

        *self.pump.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Tears the active subscription down immediately and synchronously.
    ///
    /// No event received after this call mutates the store. Safe to call
    /// repeatedly and with no active subscription.
    pub fn teardown(&self) {
        let task = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.state_tx.send_replace(SubscriptionState::Disconnected);
    }
}

impl Drop for ChangeStreamListener {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn apply_status(state_tx: &watch::Sender<SubscriptionState>, status: ChannelStatus) {
    match status {
        ChannelStatus::Connecting => {
            state_tx.send_replace(SubscriptionState::Connecting);
        }
        ChannelStatus::Subscribed => {
            state_tx.send_replace(SubscriptionState::Subscribed);
        }
        ChannelStatus::Error | ChannelStatus::Timeout => {
            warn!(?status, "change stream degraded");
            degrade(state_tx);
        }
    }
}

/// Enters `Degraded` unless the listener was already torn down; a dead
/// subscription must not resurrect a disconnected listener.
fn degrade(state_tx: &watch::Sender<SubscriptionState>) {
    state_tx.send_if_modified(|state| {
        if matches!(
            *state,
            SubscriptionState::Disconnected | SubscriptionState::Degraded
        ) {
            return false;
        }
        *state = SubscriptionState::Degraded;
        true
    });
}
