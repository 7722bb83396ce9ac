//! Kanban event worker entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use kanban_core::realtime::RealtimeSink;
use kanban_messaging::ConnectionManager;
use kanban_notification::realtime::BroadcastRealtimeSink;
use kanban_worker::app::{self, Adapters};
use kanban_worker::config::AppConfig;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Kanban event worker");

    let config = AppConfig::from_env()?;
    tracing::info!(
        broker_kind = ?config.broker.kind,
        broker = %config.broker.redacted_uri(),
        exchange = %config.broker.exchange,
        services = ?config.services,
        "configuration loaded"
    );

    let realtime = BroadcastRealtimeSink::new(256);
    tokio::spawn(log_realtime(realtime.clone()));
    let realtime: Arc<dyn RealtimeSink> = Arc::new(realtime);

    let adapters = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            kanban_store::schema::migrate(&pool).await?;
            Adapters::postgres(pool, realtime)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; projections are kept in memory");
            Adapters::in_memory(realtime)
        }
    };

    let broker = app::broker_for(&config.broker);
    let connection = Arc::new(ConnectionManager::new(
        broker,
        config.broker.exchange.clone(),
    ));

    let state = app::start(
        Arc::clone(&connection),
        config.consumer,
        &config.services,
        &adapters,
    )
    .await;
    let runtime = Arc::clone(&state.runtime);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopping consumers");
    runtime.shutdown();
    runtime.join().await;
    connection.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

/// Stands in for the browser hub: logs every real-time push.
async fn log_realtime(sink: BroadcastRealtimeSink) {
    let mut receiver = sink.subscribe();
    loop {
        match receiver.recv().await {
            Ok(envelope) => tracing::debug!(
                channel = %envelope.channel,
                method = envelope.method,
                "real-time push"
            ),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "real-time log lagging");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
