//! Consumer-side handler port.

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_events::KanbanEvent;
use uuid::Uuid;

/// Where a handler call sits within the delivery of one message.
///
/// `message_id` is the same for every attempt at one delivery, so a handler
/// with several side effects can skip the ones an earlier attempt finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub message_id: Uuid,
    /// 1-based.
    pub attempt: u32,
    /// No retry follows if this attempt fails.
    pub final_attempt: bool,
}

impl DeliveryInfo {
    /// A one-shot delivery with a fresh id.
    #[must_use]
    pub fn single() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            attempt: 1,
            final_attempt: true,
        }
    }

    /// Reads the publisher's message id, falling back to a fresh one when it
    /// is missing or not a UUID.
    #[must_use]
    pub fn first_attempt(message_id: Option<&str>, max_attempts: u32) -> Self {
        let message_id = message_id
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or_else(Uuid::new_v4);
        Self {
            message_id,
            attempt: 1,
            final_attempt: max_attempts <= 1,
        }
    }

    /// The attempt after this one.
    #[must_use]
    pub fn next(self, max_attempts: u32) -> Self {
        let attempt = self.attempt + 1;
        Self {
            attempt,
            final_attempt: attempt >= max_attempts,
            ..self
        }
    }
}

/// Processes decoded events delivered to a consumer binding.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs and the health report.
    fn handler_name(&self) -> &str;

    /// Handles one event. An error triggers the consumer's retry policy,
    /// which calls again with the same `delivery.message_id`.
    async fn handle(&self, event: &KanbanEvent, delivery: &DeliveryInfo)
    -> Result<(), DomainError>;
}
