//! AMQP 0-9-1 broker adapter over `lapin`.
//!
//! Maps the broker ports onto a RabbitMQ-compatible server. Every channel
//! runs in publisher-confirm mode, so a publish returns only once the broker
//! has taken responsibility for the message.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable, ShortString};
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info};

use crate::broker::{
    Acker, Broker, BrokerChannel, BrokerConnection, Delivery, DeliveryMode, DeliveryStream,
    ExchangeKind, ExchangeSpec, MessageProperties, OutgoingMessage, QueueSpec,
};
use crate::config::BrokerConfig;
use crate::error::MessagingError;

/// Queue argument naming the exchange rejected messages are routed to.
pub const DEAD_LETTER_EXCHANGE_ARG: &str = "x-dead-letter-exchange";

/// Unacknowledged deliveries the broker may push to one consumer.
const PREFETCH: u16 = 16;

const AMQP_TRANSIENT: u8 = 1;
const AMQP_PERSISTENT: u8 = 2;

/// Connects to a RabbitMQ-compatible broker.
pub struct AmqpBroker {
    uri: AMQPUri,
    connection_name: String,
}

impl AmqpBroker {
    /// Builds a broker client from `config`; nothing connects until
    /// [`Broker::connect`] is called.
    #[must_use]
    pub fn new(config: &BrokerConfig, connection_name: impl Into<String>) -> Self {
        Self {
            uri: amqp_uri(config),
            connection_name: connection_name.into(),
        }
    }
}

impl std::fmt::Debug for AmqpBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpBroker")
            .field("host", &self.uri.authority.host)
            .field("port", &self.uri.authority.port)
            .field("vhost", &self.uri.vhost)
            .finish_non_exhaustive()
    }
}

fn amqp_uri(config: &BrokerConfig) -> AMQPUri {
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.virtual_host.clone(),
        ..AMQPUri::default()
    }
}

fn connection_error(err: lapin::Error) -> MessagingError {
    MessagingError::Connection(err.to_string())
}

fn channel_error(err: lapin::Error) -> MessagingError {
    MessagingError::Channel(err.to_string())
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn connect(&self) -> Result<Arc<dyn BrokerConnection>, MessagingError> {
        let properties =
            ConnectionProperties::default().with_connection_name(self.connection_name.clone().into());
        let connection = Connection::connect_uri(self.uri.clone(), properties)
            .await
            .map_err(connection_error)?;
        info!(
            host = %self.uri.authority.host,
            port = self.uri.authority.port,
            vhost = %self.uri.vhost,
            "amqp connection opened"
        );
        Ok(Arc::new(AmqpConnection { connection }))
    }
}

struct AmqpConnection {
    connection: Connection,
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    fn is_open(&self) -> bool {
        self.connection.status().connected()
    }

    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, MessagingError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(channel_error)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(channel_error)?;
        Ok(Arc::new(AmqpChannel { channel }))
    }

    async fn close(&self) -> Result<(), MessagingError> {
        self.connection
            .close(200, "worker shutting down")
            .await
            .map_err(connection_error)
    }
}

struct AmqpChannel {
    channel: Channel,
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    fn is_open(&self) -> bool {
        self.channel.status().connected()
    }

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), MessagingError> {
        let kind = match spec.kind {
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
        };
        let options = ExchangeDeclareOptions {
            durable: spec.durable,
            ..ExchangeDeclareOptions::default()
        };
        self.channel
            .exchange_declare(&spec.name, kind, options, FieldTable::default())
            .await
            .map_err(channel_error)
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), MessagingError> {
        let options = QueueDeclareOptions {
            durable: spec.durable,
            exclusive: spec.exclusive,
            auto_delete: spec.auto_delete,
            ..QueueDeclareOptions::default()
        };
        self.channel
            .queue_declare(&spec.name, options, queue_arguments(spec))
            .await
            .map_err(channel_error)?;
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), MessagingError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutgoingMessage,
    ) -> Result<(), MessagingError> {
        let confirmation = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &message.body,
                to_amqp_properties(&message.properties),
            )
            .await
            .map_err(channel_error)?
            .await
            .map_err(channel_error)?;
        if confirmation.is_nack() {
            return Err(MessagingError::Channel(format!(
                "broker refused message for exchange {exchange}"
            )));
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream, MessagingError> {
        self.channel
            .basic_qos(PREFETCH, BasicQosOptions::default())
            .await
            .map_err(channel_error)?;
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;
        debug!(queue, consumer_tag, "amqp consumer registered");

        let acker: Arc<dyn Acker> = Arc::new(ChannelAcker {
            channel: self.channel.clone(),
        });
        let deliveries = consumer.map(move |item| {
            item.map(|delivery| {
                Delivery::new(
                    delivery.delivery_tag,
                    delivery.redelivered,
                    from_amqp_properties(&delivery.properties),
                    delivery.data,
                    Arc::clone(&acker),
                )
            })
            .map_err(channel_error)
        });
        Ok(deliveries.boxed())
    }
}

/// Settles deliveries on the channel that received them.
struct ChannelAcker {
    channel: Channel,
}

#[async_trait]
impl Acker for ChannelAcker {
    async fn ack(&self, delivery_tag: u64) -> Result<(), MessagingError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(channel_error)
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), MessagingError> {
        let options = BasicNackOptions {
            multiple: false,
            requeue,
        };
        self.channel
            .basic_nack(delivery_tag, options)
            .await
            .map_err(channel_error)
    }
}

fn queue_arguments(spec: &QueueSpec) -> FieldTable {
    let mut arguments = FieldTable::default();
    if let Some(exchange) = &spec.dead_letter_exchange {
        arguments.insert(
            DEAD_LETTER_EXCHANGE_ARG.into(),
            AMQPValue::LongString(exchange.clone().into()),
        );
    }
    arguments
}

fn to_amqp_properties(properties: &MessageProperties) -> BasicProperties {
    let delivery_mode = match properties.delivery_mode {
        DeliveryMode::Transient => AMQP_TRANSIENT,
        DeliveryMode::Persistent => AMQP_PERSISTENT,
    };
    let mut amqp = BasicProperties::default().with_delivery_mode(delivery_mode);
    if let Some(kind) = &properties.message_type {
        amqp = amqp.with_kind(ShortString::from(kind.clone()));
    }
    if let Some(content_type) = &properties.content_type {
        amqp = amqp.with_content_type(ShortString::from(content_type.clone()));
    }
    if let Some(message_id) = &properties.message_id {
        amqp = amqp.with_message_id(ShortString::from(message_id.clone()));
    }
    if !properties.headers.is_empty() {
        let mut headers = FieldTable::default();
        for (name, value) in &properties.headers {
            headers.insert(
                ShortString::from(name.clone()),
                AMQPValue::LongString(value.clone().into()),
            );
        }
        amqp = amqp.with_headers(headers);
    }
    amqp
}

fn from_amqp_properties(properties: &BasicProperties) -> MessageProperties {
    let text = |value: &Option<ShortString>| value.as_ref().map(|s| s.as_str().to_owned());
    let delivery_mode = if *properties.delivery_mode() == Some(AMQP_PERSISTENT) {
        DeliveryMode::Persistent
    } else {
        DeliveryMode::Transient
    };
    let headers: BTreeMap<String, String> = properties
        .headers()
        .as_ref()
        .map(|table| {
            table
                .inner()
                .iter()
                .filter_map(|(name, value)| {
                    header_text(value).map(|text| (name.as_str().to_owned(), text))
                })
                .collect()
        })
        .unwrap_or_default();

    MessageProperties {
        message_type: text(properties.kind()),
        content_type: text(properties.content_type()),
        delivery_mode,
        message_id: text(properties.message_id()),
        headers,
    }
}

/// Textual header values; the broker's own structured headers are skipped.
fn header_text(value: &AMQPValue) -> Option<String> {
    match value {
        AMQPValue::LongString(text) => Some(String::from_utf8_lossy(text.as_bytes()).into_owned()),
        AMQPValue::ShortString(text) => Some(text.as_str().to_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_carries_credentials_and_vhost_verbatim() {
        let config = BrokerConfig {
            host: "rabbit".to_owned(),
            port: 5673,
            username: "kanban".to_owned(),
            password: "p@ss/word".to_owned(),
            virtual_host: "/".to_owned(),
            ..BrokerConfig::default()
        };

        let uri = amqp_uri(&config);

        assert_eq!(uri.authority.host, "rabbit");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "kanban");
        assert_eq!(uri.authority.userinfo.password, "p@ss/word");
        assert_eq!(uri.vhost, "/");
        assert!(!format!("{:?}", AmqpBroker::new(&config, "test")).contains("p@ss"));
    }

    #[test]
    fn test_dead_letter_exchange_becomes_queue_argument() {
        let spec = QueueSpec::durable("activity.BoardCreatedEvent.queue")
            .with_dead_letter_exchange("activity.dead-letter");

        let arguments = queue_arguments(&spec);

        let value = arguments
            .inner()
            .get(&ShortString::from(DEAD_LETTER_EXCHANGE_ARG))
            .cloned();
        assert_eq!(header_text(&value.unwrap()).as_deref(), Some("activity.dead-letter"));
        assert!(queue_arguments(&QueueSpec::durable("plain")).inner().is_empty());
    }

    #[test]
    fn test_message_properties_survive_the_amqp_mapping() {
        // Arrange
        let mut properties = MessageProperties::persistent_json("CardMovedEvent");
        properties.message_id = Some("0190a0b6-7c1e-7000-8000-000000000001".to_owned());
        properties
            .headers
            .insert("x-death-queue".to_owned(), "activity.CardMovedEvent.queue".to_owned());

        // Act
        let amqp = to_amqp_properties(&properties);
        let back = from_amqp_properties(&amqp);

        // Assert
        assert_eq!(*amqp.delivery_mode(), Some(AMQP_PERSISTENT));
        assert_eq!(amqp.kind().as_ref().map(ShortString::as_str), Some("CardMovedEvent"));
        assert_eq!(back, properties);
    }

    #[test]
    fn test_missing_delivery_mode_reads_as_transient() {
        let back = from_amqp_properties(&BasicProperties::default());

        assert_eq!(back.delivery_mode, DeliveryMode::Transient);
        assert_eq!(back.message_type, None);
        assert!(back.headers.is_empty());
    }
}
