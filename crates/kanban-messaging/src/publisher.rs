//! Event publisher.
//!
//! Serializes a domain event to JSON and publishes it, persistent, to the
//! shared fanout exchange with an empty routing key. All publishes go through
//! one channel guarded by an async mutex.

use std::sync::Arc;

use kanban_core::event::DomainEvent;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::broker::{BrokerChannel, MessageProperties, OutgoingMessage};
use crate::connection::ConnectionManager;
use crate::error::MessagingError;

/// Publishes domain events to the shared exchange.
pub struct EventPublisher {
    connection: Arc<ConnectionManager>,
    channel: Mutex<Option<Arc<dyn BrokerChannel>>>,
}

impl EventPublisher {
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self {
            connection,
            channel: Mutex::new(None),
        }
    }

    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Serialization` if the body cannot be encoded,
    /// or the broker error if connecting or publishing fails. A failed publish
    /// drops the cached channel so the next call opens a new one.
    #[instrument(skip(self, event), fields(event_type = %event.event_type()))]
    pub async fn publish(&self, event: &dyn DomainEvent) -> Result<(), MessagingError> {
        let body = event.to_body()?;
        let mut properties = MessageProperties::persistent_json(event.event_type());
        properties.message_id = Some(Uuid::now_v7().to_string());
        let message = OutgoingMessage { properties, body };

        let mut slot = self.channel.lock().await;
        let channel = match slot.as_ref() {
            Some(channel) if channel.is_open() => Arc::clone(channel),
            _ => {
                let channel = self.connection.open_channel().await?;
                *slot = Some(Arc::clone(&channel));
                channel
            }
        };

        let result = channel
            .publish(self.connection.exchange_name(), "", message)
            .await;
        if result.is_err() {
            *slot = None;
        } else {
            debug!("event published");
        }
        result
    }

    /// Publishes one event, logging and swallowing any failure.
    ///
    /// Returns whether the event reached the broker. Callers use this after
    /// their own write has committed; a broker outage must not undo it.
    pub async fn publish_best_effort(&self, event: &dyn DomainEvent) -> bool {
        match self.publish(event).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    event_type = %event.event_type(),
                    workspace_id = %event.context().workspace_id,
                    error = %err,
                    "failed to publish event; continuing without it"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("exchange", &self.connection.exchange_name())
            .finish_non_exhaustive()
    }
}
