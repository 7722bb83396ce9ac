//! Messaging error types.

use thiserror::Error;

/// Errors raised by the broker plumbing.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The broker could not be reached or refused the connection.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// A channel-level failure: closed channel, precondition failure,
    /// unknown delivery tag.
    #[error("channel error: {0}")]
    Channel(String),

    /// Publish or bind referenced an exchange that was never declared.
    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),

    /// Bind or consume referenced a queue that was never declared.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// The event body could not be serialized.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A service tried to bind the same event type twice.
    #[error("consumer already registered for {event_type} under prefix {prefix}")]
    DuplicateBinding {
        /// The service queue prefix.
        prefix: String,
        /// The event type name.
        event_type: &'static str,
    },

    /// Configuration was missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
