//! Broker connection manager.
//!
//! Owns the single shared connection. The first caller connects and declares
//! the shared exchange; later callers reuse the connection until it is seen
//! closed, at which point the next call reconnects. There is no background
//! reconnect loop.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::broker::{Broker, BrokerChannel, BrokerConnection, ExchangeSpec};
use crate::error::MessagingError;

/// Lazily established, shared broker connection.
pub struct ConnectionManager {
    broker: Arc<dyn Broker>,
    exchange: ExchangeSpec,
    state: Mutex<Option<Arc<dyn BrokerConnection>>>,
}

impl ConnectionManager {
    /// Creates a manager that will declare `exchange` as durable fanout.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, exchange: impl Into<String>) -> Self {
        Self {
            broker,
            exchange: ExchangeSpec::durable_fanout(exchange),
            state: Mutex::new(None),
        }
    }

    /// Name of the shared exchange.
    #[must_use]
    pub fn exchange_name(&self) -> &str {
        &self.exchange.name
    }

    /// Returns an open connection, connecting first if needed.
    ///
    /// Concurrent callers wait on the same connect attempt.
    ///
    /// # Errors
    ///
    /// Propagates connect, channel and exchange declaration failures.
    #[instrument(skip(self), fields(exchange = %self.exchange.name))]
    pub async fn ensure_connection(&self) -> Result<Arc<dyn BrokerConnection>, MessagingError> {
        let mut state = self.state.lock().await;
        if let Some(connection) = state.as_ref() {
            if connection.is_open() {
                return Ok(Arc::clone(connection));
            }
            info!("broker connection closed; reconnecting");
        }

        let connection = self.broker.connect().await?;
        let channel = connection.create_channel().await?;
        channel.declare_exchange(&self.exchange).await?;
        info!("broker connection established");

        *state = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// Opens a fresh channel on the shared connection.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`ConnectionManager::ensure_connection`] and
    /// channel creation.
    pub async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, MessagingError> {
        let connection = self.ensure_connection().await?;
        connection.create_channel().await
    }

    /// Whether a connection has been established and is still open.
    pub async fn is_connected(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .is_some_and(|connection| connection.is_open())
    }

    /// Closes the shared connection if one is open.
    ///
    /// # Errors
    ///
    /// Propagates the broker's close failure.
    pub async fn close(&self) -> Result<(), MessagingError> {
        let connection = self.state.lock().await.take();
        if let Some(connection) = connection {
            connection.close().await?;
            info!(exchange = %self.exchange.name, "broker connection closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("exchange", &self.exchange)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ExchangeKind;
    use crate::in_memory::InMemoryBroker;

    fn manager(broker: &InMemoryBroker) -> ConnectionManager {
        ConnectionManager::new(Arc::new(broker.clone()), "kanban.events")
    }

    #[tokio::test]
    async fn test_ensure_connection_declares_durable_fanout_exchange() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);

        manager.ensure_connection().await.unwrap();

        let exchange = broker.exchange_spec("kanban.events").unwrap();
        assert_eq!(exchange.kind, ExchangeKind::Fanout);
        assert!(exchange.durable);
    }

    #[tokio::test]
    async fn test_ensure_connection_is_idempotent() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);

        manager.ensure_connection().await.unwrap();
        manager.ensure_connection().await.unwrap();
        manager.open_channel().await.unwrap();

        assert_eq!(broker.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_connect() {
        // Arrange
        let broker = InMemoryBroker::new();
        let manager = Arc::new(manager(&broker));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.ensure_connection().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Assert
        assert_eq!(broker.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_propagates_and_next_call_retries() {
        // Arrange
        let broker = InMemoryBroker::new();
        broker.set_reachable(false);
        let manager = manager(&broker);

        // Act
        let first = manager.ensure_connection().await;
        broker.set_reachable(true);
        let second = manager.ensure_connection().await;

        // Assert
        assert!(matches!(first, Err(MessagingError::Connection(_))));
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_closed_connection_is_reestablished() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        manager.ensure_connection().await.unwrap();

        broker.close_all_connections();
        assert!(!manager.is_connected().await);
        let connection = manager.ensure_connection().await.unwrap();

        assert!(connection.is_open());
        assert_eq!(broker.connections_opened(), 2);
    }
}
