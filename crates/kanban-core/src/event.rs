//! Domain event abstractions.
//!
//! Events are transient: they are built once by the write side, published,
//! and projected by consumers. They are never stored themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// Context carried by every domain event, flattened into the wire body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventContext {
    /// When the change happened. Set once at construction.
    pub occurred_at: DateTime<Utc>,
    /// The acting user.
    pub user_id: Uuid,
    /// Tenant scope of the change.
    pub workspace_id: Uuid,
    /// Human-readable summary.
    pub description: String,
    /// Opaque projection-specific detail. An explicit JSON `null` survives a
    /// round trip as `Some(Value::Null)`; only an absent key reads as `None`.
    #[serde(
        default,
        deserialize_with = "present_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<serde_json::Value>,
}

fn present_metadata<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl EventContext {
    /// Creates a context stamped with the clock's current time.
    #[must_use]
    pub fn new(
        clock: &dyn Clock,
        user_id: Uuid,
        workspace_id: Uuid,
        description: impl Into<String>,
    ) -> Self {
        Self {
            occurred_at: clock.now(),
            user_id,
            workspace_id,
            description: description.into(),
            metadata: None,
        }
    }

    /// Attaches a metadata blob.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the concrete type name, e.g. `"BoardCreatedEvent"`. This is
    /// the discriminator carried in the message-type property.
    fn event_type(&self) -> &'static str;

    /// Returns the common event context.
    fn context(&self) -> &EventContext;

    /// Serializes the event fields to the JSON wire body.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if serialization fails.
    fn to_body(&self) -> Result<Vec<u8>, serde_json::Error>;
}
