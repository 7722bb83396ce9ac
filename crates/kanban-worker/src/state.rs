//! Shared application state.

use std::sync::Arc;

use kanban_messaging::{ConnectionManager, ConsumerRuntime, RegistrationReport};
use serde::Serialize;

/// Registration outcome of one hosted service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRegistration {
    /// Queue prefix of the service.
    pub service: String,
    pub report: RegistrationReport,
}

/// State shared by the health handlers.
#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
    pub runtime: Arc<ConsumerRuntime>,
    pub registrations: Arc<Vec<ServiceRegistration>>,
}

impl AppState {
    #[must_use]
    pub fn new(
        connection: Arc<ConnectionManager>,
        runtime: Arc<ConsumerRuntime>,
        registrations: Vec<ServiceRegistration>,
    ) -> Self {
        Self {
            connection,
            runtime,
            registrations: Arc::new(registrations),
        }
    }

    /// Whether every hosted service bound every event type.
    #[must_use]
    pub fn fully_registered(&self) -> bool {
        self.registrations.iter().all(|r| r.report.is_complete())
    }
}
