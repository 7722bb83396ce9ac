//! Shared harness for worker integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use kanban_core::membership::MembershipDirectory;
use kanban_messaging::{
    ConnectionManager, ConsumerOptions, EventPublisher, InMemoryBroker, RetryPolicy,
    StatsSnapshot,
};
use kanban_test_support::{
    FixedClock, RecordingActivityRepository, RecordingNotificationRepository,
    RecordingRealtimeSink, StaticMembershipDirectory,
};
use kanban_worker::app::{self, Adapters};
use kanban_worker::config::Service;
use kanban_worker::state::AppState;
use tower::ServiceExt;

pub const EXCHANGE: &str = "kanban.events";

/// A worker running against an in-process broker with recording adapters.
pub struct Harness {
    pub broker: InMemoryBroker,
    pub connection: Arc<ConnectionManager>,
    pub publisher: EventPublisher,
    pub activities: Arc<RecordingActivityRepository>,
    pub notifications: Arc<RecordingNotificationRepository>,
    pub realtime: Arc<RecordingRealtimeSink>,
    pub state: AppState,
}

impl Harness {
    pub async fn start(services: &[Service], members: Arc<dyn MembershipDirectory>) -> Self {
        Self::start_with(InMemoryBroker::new(), services, members).await
    }

    pub async fn start_with(
        broker: InMemoryBroker,
        services: &[Service],
        members: Arc<dyn MembershipDirectory>,
    ) -> Self {
        let connection = Arc::new(ConnectionManager::new(Arc::new(broker.clone()), EXCHANGE));
        let activities = Arc::new(RecordingActivityRepository::new());
        let notifications = Arc::new(RecordingNotificationRepository::new());
        let realtime = Arc::new(RecordingRealtimeSink::new());
        let adapters = Adapters {
            activities: activities.clone(),
            notifications: notifications.clone(),
            members,
            realtime: realtime.clone(),
            clock: Arc::new(FixedClock::on(2026, 1, 15)),
        };

        let state = app::start(Arc::clone(&connection), fast_options(), services, &adapters).await;
        let publisher = EventPublisher::new(Arc::clone(&connection));

        Self {
            broker,
            connection,
            publisher,
            activities,
            notifications,
            realtime,
            state,
        }
    }

    pub fn router(&self) -> Router {
        app::router(self.state.clone())
    }

    pub fn stats(&self, queue: &str) -> StatsSnapshot {
        self.state
            .runtime
            .bindings()
            .into_iter()
            .find(|b| b.queue == queue)
            .map(|b| b.stats)
            .unwrap_or_default()
    }

    pub async fn stop(&self) {
        self.state.runtime.shutdown();
        self.state.runtime.join().await;
    }
}

/// A single attempt per delivery, dead-lettering failures.
pub fn fast_options() -> ConsumerOptions {
    ConsumerOptions {
        retry: RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        },
        dead_letter: true,
    }
}

pub fn no_members() -> Arc<dyn MembershipDirectory> {
    Arc::new(StaticMembershipDirectory::new())
}

/// Polls `condition` until it holds, panicking after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
