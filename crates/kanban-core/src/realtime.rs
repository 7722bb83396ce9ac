//! Real-time push port.
//!
//! The browser-facing transport lives outside this workspace; projectors
//! only see a sink keyed by channel name.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;

/// A real-time channel a message can be pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealtimeGroup {
    /// A single user's private channel.
    User(Uuid),
    /// Everyone currently viewing a workspace.
    Workspace(Uuid),
    /// Everyone currently viewing a board.
    Board(Uuid),
}

impl RealtimeGroup {
    /// Returns the channel name, e.g. `user_{id}`.
    #[must_use]
    pub fn channel_name(&self) -> String {
        match self {
            Self::User(id) => format!("user_{id}"),
            Self::Workspace(id) => format!("workspace_{id}"),
            Self::Board(id) => format!("board_{id}"),
        }
    }
}

/// A message pushed to a real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeMessage {
    /// Client-side method name, e.g. `ReceiveNotification`.
    pub method: &'static str,
    /// JSON payload.
    pub payload: serde_json::Value,
}

/// Sink that delivers messages to connected clients.
#[async_trait]
pub trait RealtimeSink: Send + Sync {
    /// Pushes a message to every client subscribed to `group`.
    async fn push(&self, group: RealtimeGroup, message: RealtimeMessage)
    -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::RealtimeGroup;

    #[test]
    fn test_channel_names_are_prefixed_by_scope() {
        let id = Uuid::nil();
        assert_eq!(
            RealtimeGroup::User(id).channel_name(),
            "user_00000000-0000-0000-0000-000000000000"
        );
        assert!(RealtimeGroup::Workspace(id).channel_name().starts_with("workspace_"));
        assert!(RealtimeGroup::Board(id).channel_name().starts_with("board_"));
    }
}
