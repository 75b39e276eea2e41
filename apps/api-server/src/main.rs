//! # Dine-in API Server
//!
//! HTTP server for table sessions, orders, settlement and revenue.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .env + environment ─► ApiConfig ─► tracing                             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  PgStore::connect (pool + migrations) ─► Engine ─► Router               │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  0.0.0.0:SERVER_PORT ─── until SIGINT / SIGTERM ─► drain, close pool    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use dinein_api::{app, telemetry, ApiConfig, HttpTimeouts};
use dinein_core::RevenueZone;
use dinein_db::PgStore;
use dinein_engine::{Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ApiConfig::load()?;
    telemetry::init_tracing(config.production);

    info!("Starting Dine-in API server...");
    info!(
        port = config.server_port,
        db_host = %config.db.host,
        db_name = %config.db.database,
        revenue_tz = %config.revenue_tz,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let store = PgStore::connect(config.db.clone())
        .await
        .context("connecting to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    let engine = Engine::new(
        store.clone(),
        EngineConfig {
            zone: RevenueZone::new(config.revenue_tz),
            ..EngineConfig::default()
        },
    );
    let router = app(
        engine,
        HttpTimeouts {
            read: config.read_timeout,
            write: config.write_timeout,
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
