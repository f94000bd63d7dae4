//! Expense Approval - API Server Binary
//!
//! This binary starts the HTTP API server for the expense approval system.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin expense-api
//!
//! # Run against in-memory stores
//! API_STORAGE=memory cargo run --bin expense-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DB_MAX_CONNECTIONS` / `API_DB_MIN_CONNECTIONS` - Pool sizing (default: 10 / 2)
//! * `API_STORAGE` - `postgres` or `memory` (default: postgres)
//! * `API_DEFAULT_CURRENCY` - Currency for expenses that omit one (default: USD)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use infra_db::{create_pool, migrations, DatabaseConfig};
use interface_api::config::{ApiConfig, StorageBackend};
use interface_api::notifier::LoggingNotifier;
use interface_api::{create_router, AppState, Stores};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, prepares the stores, and starts
/// the HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        "Starting Expense Approval API Server"
    );

    let stores = build_stores(&config).await?;
    let state = AppState::new(config.clone(), stores, Arc::new(LoggingNotifier::new()));
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Connects and migrates the database, or builds the in-memory stores
async fn build_stores(config: &ApiConfig) -> anyhow::Result<Stores> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Ok(Stores::in_memory())
        }
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::new(config.database_url.clone())
                .max_connections(config.db_max_connections)
                .min_connections(config.db_min_connections);

            let pool = create_pool(db_config)
                .await
                .context("failed to connect to the database")?;
            migrations::run_pending(&pool)
                .await
                .context("failed to run database migrations")?;

            tracing::info!("Database ready");
            Ok(Stores::postgres(pool))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
