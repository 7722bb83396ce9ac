//! In-process broker with AMQP-style fanout semantics.
//!
//! Exchanges copy each message into every bound queue; queues hold messages
//! until a consumer takes them and track unacknowledged deliveries until they
//! are settled. Messages published to an exchange with no bound queues are
//! dropped, just as a real broker drops them. Closing a connection requeues
//! everything its consumers had not settled.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::broker::{
    Acker, Broker, BrokerChannel, BrokerConnection, Delivery, DeliveryStream, ExchangeKind,
    ExchangeSpec, MessageProperties, OutgoingMessage, QueueSpec,
};
use crate::error::MessagingError;

/// Header stamped on dead-lettered messages naming the queue that rejected them.
pub const DEATH_QUEUE_HEADER: &str = "x-death-queue";

/// An in-process broker. Cloning shares the same exchanges and queues.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    state: Mutex<BrokerState>,
    reachable: AtomicBool,
    next_connection_id: AtomicU64,
    connections_opened: AtomicUsize,
}

#[derive(Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeSpec>,
    bindings: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, QueueState>,
    open_connections: HashMap<u64, Arc<AtomicBool>>,
}

struct Binding {
    queue: String,
    routing_key: String,
}

#[derive(Clone)]
struct StoredMessage {
    properties: MessageProperties,
    body: Vec<u8>,
    redelivered: bool,
}

struct Unacked {
    message: StoredMessage,
    connection_id: u64,
}

struct ConsumerSlot {
    connection_id: u64,
    tx: mpsc::UnboundedSender<Result<Delivery, MessagingError>>,
}

struct QueueState {
    spec: QueueSpec,
    ready: VecDeque<StoredMessage>,
    unacked: HashMap<u64, Unacked>,
    consumers: Vec<ConsumerSlot>,
    next_consumer: usize,
    next_tag: u64,
}

enum Settlement {
    Ack,
    Requeue,
    Reject,
}

impl QueueState {
    fn new(spec: QueueSpec) -> Self {
        Self {
            spec,
            ready: VecDeque::new(),
            unacked: HashMap::new(),
            consumers: Vec::new(),
            next_consumer: 0,
            next_tag: 0,
        }
    }

    /// Hands ready messages to consumers round-robin.
    fn dispatch(&mut self, inner: &Arc<BrokerInner>, queue_name: &str) {
        while !self.consumers.is_empty() {
            let Some(message) = self.ready.pop_front() else {
                break;
            };
            let index = self.next_consumer % self.consumers.len();
            self.next_tag += 1;
            let tag = self.next_tag;

            let acker = Arc::new(QueueAcker {
                inner: Arc::clone(inner),
                queue: queue_name.to_owned(),
            });
            let delivery = Delivery::new(
                tag,
                message.redelivered,
                message.properties.clone(),
                message.body.clone(),
                acker,
            );

            let slot = &self.consumers[index];
            let connection_id = slot.connection_id;
            if slot.tx.send(Ok(delivery)).is_err() {
                // Receiver gone: forget the consumer and keep the message.
                self.consumers.remove(index);
                self.ready.push_front(message);
                continue;
            }
            self.unacked.insert(
                tag,
                Unacked {
                    message,
                    connection_id,
                },
            );
            self.next_consumer = index + 1;
        }
    }
}

impl BrokerState {
    /// Routes a message through `exchange`; returns how many queues got a copy.
    fn route(
        &mut self,
        inner: &Arc<BrokerInner>,
        exchange: &str,
        routing_key: &str,
        message: &StoredMessage,
    ) -> Result<usize, MessagingError> {
        let kind = self
            .exchanges
            .get(exchange)
            .map(|spec| spec.kind)
            .ok_or_else(|| MessagingError::ExchangeNotFound(exchange.to_owned()))?;

        let targets: Vec<String> = self
            .bindings
            .get(exchange)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|b| kind == ExchangeKind::Fanout || b.routing_key == routing_key)
                    .map(|b| b.queue.clone())
                    .collect()
            })
            .unwrap_or_default();

        for queue_name in &targets {
            if let Some(queue) = self.queues.get_mut(queue_name) {
                queue.ready.push_back(message.clone());
                queue.dispatch(inner, queue_name);
            }
        }
        Ok(targets.len())
    }
}

impl BrokerInner {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(
        self: &Arc<Self>,
        queue: &str,
        delivery_tag: u64,
        settlement: Settlement,
    ) -> Result<(), MessagingError> {
        let mut state = self.lock();
        let queue_state = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| MessagingError::QueueNotFound(queue.to_owned()))?;
        let entry = queue_state.unacked.remove(&delivery_tag).ok_or_else(|| {
            MessagingError::Channel(format!("unknown delivery tag {delivery_tag} on {queue}"))
        })?;

        match settlement {
            Settlement::Ack => Ok(()),
            Settlement::Requeue => {
                let mut message = entry.message;
                message.redelivered = true;
                queue_state.ready.push_front(message);
                queue_state.dispatch(self, queue);
                Ok(())
            }
            Settlement::Reject => {
                let Some(dead_letter_exchange) = queue_state.spec.dead_letter_exchange.clone()
                else {
                    debug!(queue, delivery_tag, "rejected message dropped");
                    return Ok(());
                };
                let mut message = entry.message;
                message.redelivered = false;
                message
                    .properties
                    .headers
                    .insert(DEATH_QUEUE_HEADER.to_owned(), queue.to_owned());
                if let Err(err) = state.route(self, &dead_letter_exchange, "", &message) {
                    warn!(
                        queue,
                        dead_letter_exchange = %dead_letter_exchange,
                        error = %err,
                        "failed to dead-letter rejected message"
                    );
                }
                Ok(())
            }
        }
    }

    fn close_connection(self: &Arc<Self>, connection_id: u64) {
        let mut state = self.lock();
        if let Some(flag) = state.open_connections.remove(&connection_id) {
            flag.store(false, Ordering::SeqCst);
        }

        let names: Vec<String> = state.queues.keys().cloned().collect();
        for name in names {
            let Some(queue) = state.queues.get_mut(&name) else {
                continue;
            };
            queue.consumers.retain(|c| c.connection_id != connection_id);
            let orphaned: Vec<u64> = queue
                .unacked
                .iter()
                .filter(|(_, u)| u.connection_id == connection_id)
                .map(|(tag, _)| *tag)
                .collect();
            for tag in orphaned {
                if let Some(unacked) = queue.unacked.remove(&tag) {
                    let mut message = unacked.message;
                    message.redelivered = true;
                    queue.ready.push_back(message);
                }
            }
            queue.dispatch(self, &name);
        }
    }
}

struct QueueAcker {
    inner: Arc<BrokerInner>,
    queue: String,
}

#[async_trait]
impl Acker for QueueAcker {
    async fn ack(&self, delivery_tag: u64) -> Result<(), MessagingError> {
        self.inner.settle(&self.queue, delivery_tag, Settlement::Ack)
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), MessagingError> {
        let settlement = if requeue {
            Settlement::Requeue
        } else {
            Settlement::Reject
        };
        self.inner.settle(&self.queue, delivery_tag, settlement)
    }
}

impl InMemoryBroker {
    /// Creates an empty, reachable broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                state: Mutex::new(BrokerState::default()),
                reachable: AtomicBool::new(true),
                next_connection_id: AtomicU64::new(1),
                connections_opened: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes subsequent `connect` calls succeed or fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of successful `connect` calls so far.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.inner.connections_opened.load(Ordering::SeqCst)
    }

    /// Closes every open connection, as a broker restart would.
    pub fn close_all_connections(&self) {
        let ids: Vec<u64> = self.inner.lock().open_connections.keys().copied().collect();
        for id in ids {
            self.inner.close_connection(id);
        }
    }

    #[must_use]
    pub fn exchange_spec(&self, name: &str) -> Option<ExchangeSpec> {
        self.inner.lock().exchanges.get(name).cloned()
    }

    #[must_use]
    pub fn queue_spec(&self, name: &str) -> Option<QueueSpec> {
        self.inner.lock().queues.get(name).map(|q| q.spec.clone())
    }

    /// Names of the queues bound to `exchange`.
    #[must_use]
    pub fn bound_queues(&self, exchange: &str) -> Vec<String> {
        self.inner
            .lock()
            .bindings
            .get(exchange)
            .map(|bindings| bindings.iter().map(|b| b.queue.clone()).collect())
            .unwrap_or_default()
    }

    /// Messages waiting for a consumer.
    #[must_use]
    pub fn queue_depth(&self, queue: &str) -> Option<usize> {
        self.inner.lock().queues.get(queue).map(|q| q.ready.len())
    }

    /// Deliveries handed out but not yet settled.
    #[must_use]
    pub fn unacked_count(&self, queue: &str) -> Option<usize> {
        self.inner.lock().queues.get(queue).map(|q| q.unacked.len())
    }

    /// Removes and returns every ready message in `queue`.
    #[must_use]
    pub fn drain_queue(&self, queue: &str) -> Vec<(MessageProperties, Vec<u8>)> {
        self.inner
            .lock()
            .queues
            .get_mut(queue)
            .map(|q| {
                q.ready
                    .drain(..)
                    .map(|m| (m.properties, m.body))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("InMemoryBroker")
            .field("exchanges", &state.exchanges.len())
            .field("queues", &state.queues.len())
            .field("open_connections", &state.open_connections.len())
            .finish()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn connect(&self) -> Result<Arc<dyn BrokerConnection>, MessagingError> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(MessagingError::Connection("broker unreachable".to_owned()));
        }
        let id = self.inner.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let open = Arc::new(AtomicBool::new(true));
        self.inner.lock().open_connections.insert(id, Arc::clone(&open));
        self.inner.connections_opened.fetch_add(1, Ordering::SeqCst);
        debug!(connection_id = id, "in-memory broker connection opened");

        Ok(Arc::new(InMemoryConnection {
            id,
            inner: Arc::clone(&self.inner),
            open,
        }))
    }
}

struct InMemoryConnection {
    id: u64,
    inner: Arc<BrokerInner>,
    open: Arc<AtomicBool>,
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, MessagingError> {
        if !self.is_open() {
            return Err(MessagingError::Channel("connection closed".to_owned()));
        }
        Ok(Arc::new(InMemoryChannel {
            connection_id: self.id,
            inner: Arc::clone(&self.inner),
            open: Arc::clone(&self.open),
        }))
    }

    async fn close(&self) -> Result<(), MessagingError> {
        self.inner.close_connection(self.id);
        Ok(())
    }
}

struct InMemoryChannel {
    connection_id: u64,
    inner: Arc<BrokerInner>,
    open: Arc<AtomicBool>,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> Result<(), MessagingError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MessagingError::Channel("channel closed".to_owned()))
        }
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), MessagingError> {
        self.ensure_open()?;
        let mut state = self.inner.lock();
        if let Some(existing) = state.exchanges.get(&spec.name) {
            if existing != spec {
                return Err(MessagingError::Channel(format!(
                    "PRECONDITION_FAILED - inequivalent arguments for exchange '{}'",
                    spec.name
                )));
            }
            return Ok(());
        }
        state.exchanges.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), MessagingError> {
        self.ensure_open()?;
        let mut state = self.inner.lock();
        if let Some(existing) = state.queues.get(&spec.name) {
            if existing.spec != *spec {
                return Err(MessagingError::Channel(format!(
                    "PRECONDITION_FAILED - inequivalent arguments for queue '{}'",
                    spec.name
                )));
            }
            return Ok(());
        }
        state
            .queues
            .insert(spec.name.clone(), QueueState::new(spec.clone()));
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), MessagingError> {
        self.ensure_open()?;
        let mut state = self.inner.lock();
        if !state.exchanges.contains_key(exchange) {
            return Err(MessagingError::ExchangeNotFound(exchange.to_owned()));
        }
        if !state.queues.contains_key(queue) {
            return Err(MessagingError::QueueNotFound(queue.to_owned()));
        }
        let bindings = state.bindings.entry(exchange.to_owned()).or_default();
        if !bindings
            .iter()
            .any(|b| b.queue == queue && b.routing_key == routing_key)
        {
            bindings.push(Binding {
                queue: queue.to_owned(),
                routing_key: routing_key.to_owned(),
            });
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutgoingMessage,
    ) -> Result<(), MessagingError> {
        self.ensure_open()?;
        let message = StoredMessage {
            properties: message.properties,
            body: message.body,
            redelivered: false,
        };
        let routed = self
            .inner
            .lock()
            .route(&self.inner, exchange, routing_key, &message)?;
        if routed == 0 {
            debug!(exchange, "no queue bound; message dropped");
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream, MessagingError> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.inner.lock();
            let queue_state = state
                .queues
                .get_mut(queue)
                .ok_or_else(|| MessagingError::QueueNotFound(queue.to_owned()))?;
            queue_state.consumers.push(ConsumerSlot {
                connection_id: self.connection_id,
                tx,
            });
            queue_state.dispatch(&self.inner, queue);
        }
        debug!(queue, consumer_tag, "consumer attached");
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
