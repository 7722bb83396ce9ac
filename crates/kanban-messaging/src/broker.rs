//! Broker ports.
//!
//! These traits mirror the AMQP 0-9-1 object model (connection, channel,
//! exchange, queue, binding, delivery). `amqp` implements them against a
//! RabbitMQ-compatible server; `in_memory` implements them in process for
//! tests and single-process runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::stream::BoxStream;

use crate::error::MessagingError;

/// How an exchange routes messages to its bound queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Copy every message to every bound queue; routing keys are ignored.
    Fanout,
    /// Deliver to queues whose binding key equals the routing key.
    Direct,
}

/// Exchange declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
}

impl ExchangeSpec {
    /// A durable fanout exchange.
    #[must_use]
    pub fn durable_fanout(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Fanout,
            durable: true,
        }
    }
}

/// Queue declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    /// Exchange that receives messages rejected without requeue.
    pub dead_letter_exchange: Option<String>,
}

impl QueueSpec {
    /// A durable, shared, long-lived queue.
    #[must_use]
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            exclusive: false,
            auto_delete: false,
            dead_letter_exchange: None,
        }
    }

    #[must_use]
    pub fn with_dead_letter_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.dead_letter_exchange = Some(exchange.into());
        self
    }
}

/// Whether the broker should keep a message across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Transient,
    Persistent,
}

/// Basic message properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageProperties {
    /// The type discriminator consumers filter on.
    pub message_type: Option<String>,
    pub content_type: Option<String>,
    pub delivery_mode: DeliveryMode,
    pub message_id: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl MessageProperties {
    /// Properties for a persistent JSON message of the given type.
    #[must_use]
    pub fn persistent_json(message_type: impl Into<String>) -> Self {
        Self {
            message_type: Some(message_type.into()),
            content_type: Some("application/json".to_owned()),
            delivery_mode: DeliveryMode::Persistent,
            message_id: None,
            headers: BTreeMap::new(),
        }
    }
}

/// A message on its way to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

/// Settles deliveries on behalf of the channel that produced them.
#[async_trait]
pub trait Acker: Send + Sync {
    /// Positive acknowledgement.
    async fn ack(&self, delivery_tag: u64) -> Result<(), MessagingError>;

    /// Negative acknowledgement; `requeue = false` drops or dead-letters.
    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), MessagingError>;
}

/// A message handed to a consumer. Must be settled exactly once.
pub struct Delivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
    acker: Arc<dyn Acker>,
}

impl Delivery {
    #[must_use]
    pub fn new(
        delivery_tag: u64,
        redelivered: bool,
        properties: MessageProperties,
        body: Vec<u8>,
        acker: Arc<dyn Acker>,
    ) -> Self {
        Self {
            delivery_tag,
            redelivered,
            properties,
            body,
            acker,
        }
    }

    /// Acknowledges this delivery.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Channel` if the broker no longer tracks it.
    pub async fn ack(&self) -> Result<(), MessagingError> {
        self.acker.ack(self.delivery_tag).await
    }

    /// Rejects this delivery.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::Channel` if the broker no longer tracks it.
    pub async fn nack(&self, requeue: bool) -> Result<(), MessagingError> {
        self.acker.nack(self.delivery_tag, requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("properties", &self.properties)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// Stream of deliveries for one consumer. Ends when the channel closes.
pub type DeliveryStream = BoxStream<'static, Result<Delivery, MessagingError>>;

/// Entry point: opens connections.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Opens a new connection.
    async fn connect(&self) -> Result<Arc<dyn BrokerConnection>, MessagingError>;
}

/// A live broker connection multiplexing channels.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Whether the connection is still usable.
    fn is_open(&self) -> bool;

    /// Opens a channel on this connection.
    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, MessagingError>;

    /// Closes the connection and every channel on it.
    async fn close(&self) -> Result<(), MessagingError>;
}

/// A channel: the unit that declares topology, publishes and consumes.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Whether the channel is still usable.
    fn is_open(&self) -> bool;

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), MessagingError>;

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), MessagingError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), MessagingError>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutgoingMessage,
    ) -> Result<(), MessagingError>;

    /// Starts a consumer on `queue`.
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream, MessagingError>;
}
