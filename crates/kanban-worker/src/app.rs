//! Wiring of projectors, consumers and the health router.

use std::sync::Arc;

use axum::Router;
use kanban_activity::application::projector::ActivityProjector;
use kanban_core::activity::ActivityRepository;
use kanban_core::clock::{Clock, SystemClock};
use kanban_core::membership::MembershipDirectory;
use kanban_core::notification::{NotificationRepository, NotificationService};
use kanban_core::realtime::RealtimeSink;
use kanban_messaging::broker::Broker;
use kanban_messaging::{
    AmqpBroker, BrokerConfig, BrokerKind, ConnectionManager, ConsumerOptions, ConsumerRuntime,
    EventHandler, InMemoryBroker, register_all,
};
use kanban_notification::application::center::NotificationCenter;
use kanban_notification::application::projector::NotificationProjector;
use kanban_store::{
    InMemoryActivityStore, InMemoryMembershipDirectory, InMemoryNotificationStore,
    PgActivityRepository, PgMembershipDirectory, PgNotificationRepository,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Service;
use crate::routes;
use crate::state::{AppState, ServiceRegistration};

/// Storage and delivery ports the projectors write through.
#[derive(Clone)]
pub struct Adapters {
    pub activities: Arc<dyn ActivityRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub members: Arc<dyn MembershipDirectory>,
    pub realtime: Arc<dyn RealtimeSink>,
    pub clock: Arc<dyn Clock>,
}

impl Adapters {
    /// Process-local stores; nothing survives a restart.
    #[must_use]
    pub fn in_memory(realtime: Arc<dyn RealtimeSink>) -> Self {
        Self {
            activities: Arc::new(InMemoryActivityStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
            members: Arc::new(InMemoryMembershipDirectory::new()),
            realtime,
            clock: Arc::new(SystemClock),
        }
    }

    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool, realtime: Arc<dyn RealtimeSink>) -> Self {
        Self {
            activities: Arc::new(PgActivityRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
            members: Arc::new(PgMembershipDirectory::new(pool)),
            realtime,
            clock: Arc::new(SystemClock),
        }
    }
}

/// The broker client `config` asks for.
#[must_use]
pub fn broker_for(config: &BrokerConfig) -> Arc<dyn Broker> {
    match config.kind {
        BrokerKind::Amqp => Arc::new(AmqpBroker::new(config, "kanban-worker")),
        BrokerKind::Memory => {
            warn!("BROKER_KIND=memory; only this process can publish events");
            Arc::new(InMemoryBroker::new())
        }
    }
}

/// Builds the handler a service registers for every event type.
#[must_use]
pub fn handler_for(service: Service, adapters: &Adapters) -> Arc<dyn EventHandler> {
    match service {
        Service::Activity => Arc::new(ActivityProjector::new(Arc::clone(&adapters.activities))),
        Service::Notification => {
            let center: Arc<dyn NotificationService> = Arc::new(NotificationCenter::new(
                Arc::clone(&adapters.notifications),
                Arc::clone(&adapters.realtime),
                Arc::clone(&adapters.clock),
            ));
            Arc::new(NotificationProjector::new(
                center,
                Arc::clone(&adapters.members),
                Arc::clone(&adapters.realtime),
            ))
        }
    }
}

/// Starts one consumer per event type for each of `services`.
///
/// Types that fail to bind are recorded in the returned state rather than
/// aborting startup.
pub async fn start(
    connection: Arc<ConnectionManager>,
    options: ConsumerOptions,
    services: &[Service],
    adapters: &Adapters,
) -> AppState {
    let runtime = Arc::new(ConsumerRuntime::new(Arc::clone(&connection), options));
    let mut registrations = Vec::with_capacity(services.len());

    for &service in services {
        let handler = handler_for(service, adapters);
        let report = register_all(&runtime, &handler, service.queue_prefix()).await;
        if report.is_complete() {
            info!(%service, queues = report.registered.len(), "service consuming");
        } else {
            warn!(
                %service,
                registered = report.registered.len(),
                failed = report.failed.len(),
                "service started with missing consumers"
            );
        }
        registrations.push(ServiceRegistration {
            service: service.queue_prefix().to_owned(),
            report,
        });
    }

    AppState::new(connection, runtime, registrations)
}

/// The worker's HTTP surface: health checks for the orchestrator, so no
/// cross-origin access is granted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
