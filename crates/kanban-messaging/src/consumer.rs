//! Consumer runtime.
//!
//! Each binding gets its own durable queue `{prefix}.{EventTypeName}.queue`
//! bound to the shared exchange, its own channel, and one spawned consume
//! loop. Per delivery:
//!
//! - message type differs from the bound type: ack and discard;
//! - body does not decode: nack without requeue;
//! - handler succeeds: ack;
//! - handler fails: retry with backoff, then nack without requeue.
//!
//! A loop whose delivery stream ends or fails re-declares its topology and
//! subscribes again, backing off until the broker is back.
//!
//! With dead-lettering enabled, rejected messages land on
//! `{prefix}.dead-letter.queue`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use kanban_core::error::DomainError;
use kanban_events::{EventType, KanbanEvent};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::broker::{BrokerChannel, Delivery, DeliveryStream, ExchangeSpec, QueueSpec};
use crate::config::{ConsumerOptions, RetryPolicy};
use crate::connection::ConnectionManager;
use crate::error::MessagingError;
use crate::handler::{DeliveryInfo, EventHandler};

/// Queue consumed by `prefix` for `event_type`.
#[must_use]
pub fn queue_name(prefix: &str, event_type: EventType) -> String {
    format!("{prefix}.{}.queue", event_type.name())
}

/// Dead-letter exchange for a service prefix.
#[must_use]
pub fn dead_letter_exchange_name(prefix: &str) -> String {
    format!("{prefix}.dead-letter")
}

/// Queue that parks a service's rejected messages.
#[must_use]
pub fn dead_letter_queue_name(prefix: &str) -> String {
    format!("{prefix}.dead-letter.queue")
}

/// Live counters for one binding.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    active: AtomicBool,
    acked: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
    retried: AtomicU64,
    resubscribed: AtomicU64,
}

impl ConsumerStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            resubscribed: self.resubscribed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ConsumerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// A delivery stream is currently attached.
    pub active: bool,
    /// Handled and acknowledged.
    pub acked: u64,
    /// Acknowledged without handling because the type did not match.
    pub discarded: u64,
    /// Nacked without requeue: undecodable or out of retries.
    pub rejected: u64,
    /// Handler retries performed.
    pub retried: u64,
    /// Times the loop re-attached after losing its delivery stream.
    pub resubscribed: u64,
}

/// One row of the runtime's binding report.
#[derive(Debug, Clone, Serialize)]
pub struct BindingReport {
    pub prefix: String,
    pub event_type: &'static str,
    pub queue: String,
    pub handler: String,
    pub stats: StatsSnapshot,
}

struct Binding {
    prefix: String,
    event_type: EventType,
    queue: String,
    handler: String,
    stats: Arc<ConsumerStats>,
}

/// Starts and supervises consume loops.
pub struct ConsumerRuntime {
    connection: Arc<ConnectionManager>,
    options: ConsumerOptions,
    shutdown: CancellationToken,
    bindings: Mutex<Vec<Binding>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsumerRuntime {
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager>, options: ConsumerOptions) -> Self {
        Self {
            connection,
            options,
            shutdown: CancellationToken::new(),
            bindings: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Declares and binds the queue for `event_type` under `queue_prefix`,
    /// then spawns a loop delivering its messages to `handler`.
    ///
    /// Returns the queue name.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::DuplicateBinding` if this prefix already
    /// consumes `event_type`, or the broker error if the topology cannot be
    /// set up. A failed start leaves no binding behind.
    #[instrument(
        skip(self, handler),
        fields(event_type = %event_type, handler = %handler.handler_name())
    )]
    pub async fn start_consuming(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
        queue_prefix: &str,
    ) -> Result<String, MessagingError> {
        let queue = queue_name(queue_prefix, event_type);
        let stats = Arc::new(ConsumerStats::default());
        self.reserve(Binding {
            prefix: queue_prefix.to_owned(),
            event_type,
            queue: queue.clone(),
            handler: handler.handler_name().to_owned(),
            stats: Arc::clone(&stats),
        })?;

        match self
            .attach(event_type, handler, queue_prefix, &queue, stats)
            .await
        {
            Ok(()) => {
                info!(queue = %queue, "consumer started");
                Ok(queue)
            }
            Err(err) => {
                self.release(queue_prefix, event_type);
                Err(err)
            }
        }
    }

    /// Whether `queue_prefix` already consumes `event_type`.
    #[must_use]
    pub fn is_bound(&self, queue_prefix: &str, event_type: EventType) -> bool {
        self.lock_bindings()
            .iter()
            .any(|b| b.prefix == queue_prefix && b.event_type == event_type)
    }

    /// Current bindings with their counters.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingReport> {
        self.lock_bindings()
            .iter()
            .map(|b| BindingReport {
                prefix: b.prefix.clone(),
                event_type: b.event_type.name(),
                queue: b.queue.clone(),
                handler: b.handler.clone(),
                stats: b.stats.snapshot(),
            })
            .collect()
    }

    /// Whether every binding currently has a delivery stream attached.
    #[must_use]
    pub fn all_active(&self) -> bool {
        self.lock_bindings()
            .iter()
            .all(|b| b.stats.active.load(Ordering::Relaxed))
    }

    /// Asks every loop to stop after its in-flight delivery.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Waits for every spawned loop to finish.
    pub async fn join(&self) {
        let handles = std::mem::take(
            &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "consumer task panicked");
            }
        }
    }

    fn lock_bindings(&self) -> MutexGuard<'_, Vec<Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self, binding: Binding) -> Result<(), MessagingError> {
        let mut bindings = self.lock_bindings();
        if bindings
            .iter()
            .any(|b| b.prefix == binding.prefix && b.event_type == binding.event_type)
        {
            return Err(MessagingError::DuplicateBinding {
                prefix: binding.prefix,
                event_type: binding.event_type.name(),
            });
        }
        bindings.push(binding);
        Ok(())
    }

    fn release(&self, queue_prefix: &str, event_type: EventType) {
        self.lock_bindings()
            .retain(|b| !(b.prefix == queue_prefix && b.event_type == event_type));
    }

    async fn attach(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
        queue_prefix: &str,
        queue: &str,
        stats: Arc<ConsumerStats>,
    ) -> Result<(), MessagingError> {
        let subscription = Subscription {
            connection: Arc::clone(&self.connection),
            queue: queue.to_owned(),
            dead_letter: self.options.dead_letter.then(|| {
                (
                    dead_letter_exchange_name(queue_prefix),
                    dead_letter_queue_name(queue_prefix),
                )
            }),
        };
        let (channel, deliveries) = subscription.open().await?;

        let worker = ConsumeLoop {
            event_type,
            queue: queue.to_owned(),
            handler,
            retry: self.options.retry,
            stats,
            shutdown: self.shutdown.child_token(),
            subscription,
        };
        let handle = tokio::spawn(worker.run(channel, deliveries));
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }
}

impl std::fmt::Debug for ConsumerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRuntime")
            .field("options", &self.options)
            .field("bindings", &self.lock_bindings().len())
            .finish_non_exhaustive()
    }
}

/// Topology of one binding, re-declared on every (re)subscribe.
struct Subscription {
    connection: Arc<ConnectionManager>,
    queue: String,
    /// Dead-letter exchange and its parking queue.
    dead_letter: Option<(String, String)>,
}

impl Subscription {
    async fn open(&self) -> Result<(Arc<dyn BrokerChannel>, DeliveryStream), MessagingError> {
        let channel = self.connection.open_channel().await?;

        let mut spec = QueueSpec::durable(self.queue.clone());
        if let Some((exchange, parking)) = &self.dead_letter {
            channel
                .declare_exchange(&ExchangeSpec::durable_fanout(exchange.clone()))
                .await?;
            channel.declare_queue(&QueueSpec::durable(parking.clone())).await?;
            channel.bind_queue(parking, exchange, "").await?;
            spec = spec.with_dead_letter_exchange(exchange.clone());
        }
        channel.declare_queue(&spec).await?;
        channel
            .bind_queue(&self.queue, self.connection.exchange_name(), "")
            .await?;

        let consumer_tag = format!("{}.{}", self.queue, Uuid::new_v4());
        let deliveries = channel.consume(&self.queue, &consumer_tag).await?;
        Ok((channel, deliveries))
    }
}

struct ConsumeLoop {
    event_type: EventType,
    queue: String,
    handler: Arc<dyn EventHandler>,
    retry: RetryPolicy,
    stats: Arc<ConsumerStats>,
    shutdown: CancellationToken,
    subscription: Subscription,
}

impl ConsumeLoop {
    async fn run(self, mut channel: Arc<dyn BrokerChannel>, mut deliveries: DeliveryStream) {
        self.stats.active.store(true, Ordering::Relaxed);
        loop {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    info!(queue = %self.queue, "consumer stopping");
                    break;
                }
                next = deliveries.next() => next,
            };

            match next {
                Some(Ok(delivery)) => {
                    self.process(delivery).await;
                    continue;
                }
                Some(Err(err)) => {
                    error!(queue = %self.queue, error = %err, "delivery stream failed");
                }
                None => {
                    warn!(
                        queue = %self.queue,
                        channel_open = channel.is_open(),
                        "delivery stream ended"
                    );
                }
            }

            self.stats.active.store(false, Ordering::Relaxed);
            let Some((reopened, stream)) = self.resubscribe().await else {
                break;
            };
            channel = reopened;
            deliveries = stream;
            self.stats.active.store(true, Ordering::Relaxed);
        }
        self.stats.active.store(false, Ordering::Relaxed);
    }

    /// Re-attaches to the queue, backing off between failed attempts.
    ///
    /// Returns `None` once shutdown is requested.
    async fn resubscribe(&self) -> Option<(Arc<dyn BrokerChannel>, DeliveryStream)> {
        let mut attempt: u32 = 1;
        loop {
            let backoff = self.retry.backoff_for(attempt);
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return None,
                () = tokio::time::sleep(backoff) => {}
            }

            match self.subscription.open().await {
                Ok(subscribed) => {
                    info!(queue = %self.queue, attempt, "consumer resubscribed");
                    self.stats.resubscribed.fetch_add(1, Ordering::Relaxed);
                    return Some(subscribed);
                }
                Err(err) => {
                    warn!(
                        queue = %self.queue,
                        attempt,
                        error = %err,
                        "resubscribe failed; retrying"
                    );
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn process(&self, delivery: Delivery) {
        let expected = self.event_type.name();
        if delivery.properties.message_type.as_deref() != Some(expected) {
            debug!(
                queue = %self.queue,
                received = ?delivery.properties.message_type,
                "message type does not match binding; discarding"
            );
            self.settled(delivery.ack().await, "ack");
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let event = match KanbanEvent::decode(self.event_type, &delivery.body) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    queue = %self.queue,
                    event_type = %self.event_type,
                    error = %err,
                    "undecodable message; rejecting"
                );
                self.settled(delivery.nack(false).await, "nack");
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let info = DeliveryInfo::first_attempt(
            delivery.properties.message_id.as_deref(),
            self.retry.max_attempts,
        );
        match self.handle_with_retry(&event, info).await {
            Ok(()) => {
                self.settled(delivery.ack().await, "ack");
                self.stats.acked.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(
                    queue = %self.queue,
                    event_type = %self.event_type,
                    handler = %self.handler.handler_name(),
                    message_id = %info.message_id,
                    attempts = self.retry.max_attempts,
                    error = %err,
                    "handler failed; rejecting message"
                );
                self.settled(delivery.nack(false).await, "nack");
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn handle_with_retry(
        &self,
        event: &KanbanEvent,
        mut info: DeliveryInfo,
    ) -> Result<(), DomainError> {
        loop {
            match self.handler.handle(event, &info).await {
                Ok(()) => return Ok(()),
                Err(err) if !info.final_attempt => {
                    let backoff = self.retry.backoff_for(info.attempt);
                    warn!(
                        queue = %self.queue,
                        attempt = info.attempt,
                        max_attempts = self.retry.max_attempts,
                        backoff = ?backoff,
                        error = %err,
                        "handler failed; retrying"
                    );
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(backoff).await;
                    info = info.next(self.retry.max_attempts);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn settled(&self, result: Result<(), MessagingError>, action: &str) {
        if let Err(err) = result {
            warn!(queue = %self.queue, action, error = %err, "failed to settle delivery");
        }
    }
}
