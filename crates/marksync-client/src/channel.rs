//! Change-stream consumption boundary.
//!
//! The transport behind the stream (websocket, SSE, whatever the embedder
//! runs) is out of scope; this module defines the typed messages a channel
//! delivers and the subscribe/teardown contract the listener relies on.

use async_trait::async_trait;
use tokio::sync::mpsc;

use marksync_core::ChangeEvent;

use crate::service::SubscribeError;

/// Subscription lifecycle statuses reported by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Subscribed,
    Error,
    Timeout,
}

/// One message delivered on a subscription: a lifecycle status transition
/// or a normalized change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Status(ChannelStatus),
    Change(ChangeEvent),
}

/// A live subscription handle: the receiving half of a bounded channel.
///
/// Teardown is synchronous: `close` immediately stops new delivery. The
/// producer side observes the closed channel and stops; a previously active
/// subscription must be fully closed before a new one is established so no
/// logical event is delivered twice through overlapping channels.
#[derive(Debug)]
pub struct ChannelSubscription {
    messages: mpsc::Receiver<ChannelMessage>,
}

impl ChannelSubscription {
    #[must_use]
    pub fn new(messages: mpsc::Receiver<ChannelMessage>) -> Self {
        Self { messages }
    }

    /// Creates a subscription plus its producer half, for channel
    /// implementations and tests.
    #[must_use]
    pub fn pair(buffer: usize) -> (mpsc::Sender<ChannelMessage>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// Receives the next message in arrival order; `None` once the channel
    /// is closed and drained.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.messages.recv().await
    }

    /// Tears the subscription down immediately: no new messages are
    /// accepted. Anything already buffered may still drain in order.
    pub fn close(&mut self) {
        self.messages.close();
    }
}

/// A per-owner change-stream source.
#[async_trait]
pub trait ChangeChannel: Send + Sync {
    /// Opens a subscription scoped to one owner. The caller owns teardown.
    async fn subscribe(&self, owner_id: &str) -> Result<ChannelSubscription, SubscribeError>;
}
