//! Health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use kanban_messaging::BindingReport;
use serde::Serialize;

use crate::state::{AppState, ServiceRegistration};

/// Liveness response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Consumer readiness response.
#[derive(Serialize)]
pub struct ConsumersResponse {
    /// `ok` when connected, every binding registered and every consume loop
    /// attached to its queue, else `degraded`.
    pub status: &'static str,
    pub broker_connected: bool,
    pub consumers_active: bool,
    pub exchange: String,
    pub registrations: Vec<ServiceRegistration>,
    pub bindings: Vec<BindingReport>,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health/consumers
async fn consumers(State(state): State<AppState>) -> (StatusCode, Json<ConsumersResponse>) {
    let broker_connected = state.connection.is_connected().await;
    let consumers_active = state.runtime.all_active();
    let healthy = broker_connected && consumers_active && state.fully_registered();
    let response = ConsumersResponse {
        status: if healthy { "ok" } else { "degraded" },
        broker_connected,
        consumers_active,
        exchange: state.connection.exchange_name().to_owned(),
        registrations: state.registrations.as_ref().clone(),
        bindings: state.runtime.bindings(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Returns the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/consumers", get(consumers))
}
