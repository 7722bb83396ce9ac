//! In-process real-time fan-out.
//!
//! The browser-facing hub subscribes here and forwards each envelope to the
//! sockets joined to its channel. With no subscriber, pushes are dropped.

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_core::realtime::{RealtimeGroup, RealtimeMessage, RealtimeSink};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// A push addressed to one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEnvelope {
    /// `user_{id}`, `workspace_{id}` or `board_{id}`.
    pub channel: String,
    pub method: &'static str,
    pub payload: serde_json::Value,
}

/// `RealtimeSink` over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastRealtimeSink {
    sender: broadcast::Sender<RealtimeEnvelope>,
}

impl BroadcastRealtimeSink {
    /// Creates a sink buffering up to `capacity` envelopes per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to every subsequent push.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEnvelope> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl RealtimeSink for BroadcastRealtimeSink {
    async fn push(
        &self,
        group: RealtimeGroup,
        message: RealtimeMessage,
    ) -> Result<(), DomainError> {
        let envelope = RealtimeEnvelope {
            channel: group.channel_name(),
            method: message.method,
            payload: message.payload,
        };
        if self.sender.send(envelope).is_err() {
            trace!(channel = %group.channel_name(), "no real-time subscriber; push dropped");
        }
        Ok(())
    }
}
