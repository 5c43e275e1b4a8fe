//! Server bootstrap.
//!
//! 1. Connect the `PostgreSQL` pool (and migrate)
//! 2. Install the Prometheus recorder
//! 3. Build the reservation manager and router
//! 4. Serve until Ctrl+C / SIGTERM, then drain within the shutdown timeout

use crate::config::{Config, DatabaseConfig};
use anyhow::Context;
use axum::Router;
use sizopi_postgres::PostgresReservationStore;
use sizopi_runtime::ReservationManager;
use sizopi_runtime::metrics::install_recorder;
use sizopi_web::{AppState, build_router};
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::time::Duration;
use tokio::signal;
use tracing::info;

/// Connect to `PostgreSQL` and optionally apply migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_store(config: &DatabaseConfig) -> anyhow::Result<PostgresReservationStore> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to reservation database..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(&config.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PostgresReservationStore::from_pool(pool);

    if config.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
    }

    info!("Reservation database ready");
    Ok(store)
}

/// Build the HTTP application over a connected store.
///
/// # Errors
///
/// Returns an error if the metrics recorder cannot be installed.
pub fn build_app(config: &Config, store: PostgresReservationStore) -> anyhow::Result<Router> {
    let metrics = install_recorder().context("Failed to install metrics recorder")?;

    let manager = ReservationManager::new(store).with_retry_policy(config.booking.retry_policy());
    let state = AppState::new(manager).with_metrics(metrics);

    Ok(build_router(state))
}

/// Run the server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if startup fails, the listener cannot bind, or
/// in-flight requests do not finish within the shutdown timeout.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = connect_store(&config.database).await?;
    let app = build_app(&config, store)?;

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = drain_tx.send(());
        })
        .into_future();

    let shutdown_timeout = config.server.shutdown_timeout();
    tokio::select! {
        result = server => result.context("HTTP server failed")?,
        () = drain_deadline(drain_rx, shutdown_timeout) => {
            anyhow::bail!("In-flight requests did not finish within {shutdown_timeout:?}");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Completes `timeout` after the drain starts; never completes otherwise.
async fn drain_deadline(drain_started: tokio::sync::oneshot::Receiver<()>, timeout: Duration) {
    if drain_started.await.is_ok() {
        tokio::time::sleep(timeout).await;
    } else {
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
