//! Startup registration of one consumer per event type.

use std::sync::Arc;

use kanban_events::EventType;
use serde::Serialize;
use tracing::{error, info};

use crate::consumer::ConsumerRuntime;
use crate::handler::EventHandler;

/// A type whose consumer could not be started.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationFailure {
    pub event_type: &'static str,
    pub error: String,
}

/// Outcome of a registration pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationReport {
    /// Queue names that are now consumed.
    pub registered: Vec<String>,
    pub failed: Vec<RegistrationFailure>,
}

impl RegistrationReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Starts a consumer for each of `event_types` under `queue_prefix`.
///
/// A type that fails to register is logged and skipped; the rest still
/// register.
pub async fn register_event_handlers(
    runtime: &ConsumerRuntime,
    handler: &Arc<dyn EventHandler>,
    queue_prefix: &str,
    event_types: &[EventType],
) -> RegistrationReport {
    let mut report = RegistrationReport::default();
    for &event_type in event_types {
        match runtime
            .start_consuming(event_type, Arc::clone(handler), queue_prefix)
            .await
        {
            Ok(queue) => report.registered.push(queue),
            Err(err) => {
                error!(
                    prefix = queue_prefix,
                    event_type = %event_type,
                    error = %err,
                    "failed to register consumer"
                );
                report.failed.push(RegistrationFailure {
                    event_type: event_type.name(),
                    error: err.to_string(),
                });
            }
        }
    }
    info!(
        prefix = queue_prefix,
        handler = %handler.handler_name(),
        registered = report.registered.len(),
        failed = report.failed.len(),
        "consumer registration finished"
    );
    report
}

/// Registers `handler` for every event type in the catalog.
pub async fn register_all(
    runtime: &ConsumerRuntime,
    handler: &Arc<dyn EventHandler>,
    queue_prefix: &str,
) -> RegistrationReport {
    register_event_handlers(runtime, handler, queue_prefix, EventType::ALL).await
}
