//! Kanban Messaging — event distribution over a fanout broker.
//!
//! Publishers write every domain event to one durable fanout exchange. Each
//! consuming service binds its own durable queue per event type
//! (`{prefix}.{EventTypeName}.queue`) and runs one consume loop per queue.

pub mod amqp;
pub mod broker;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod in_memory;
pub mod publisher;
pub mod registry;

pub use amqp::AmqpBroker;
pub use config::{BrokerConfig, BrokerKind, ConsumerOptions, RetryPolicy};
pub use connection::ConnectionManager;
pub use consumer::{BindingReport, ConsumerRuntime, StatsSnapshot};
pub use error::MessagingError;
pub use handler::{DeliveryInfo, EventHandler};
pub use in_memory::InMemoryBroker;
pub use publisher::EventPublisher;
pub use registry::{RegistrationReport, register_all, register_event_handlers};
