//! # Database Pool Management
//!
//! Connection pool creation and configuration for PostgreSQL, and the
//! [`PgStore`] handle built on top of it.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  api-server startup                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(host, user, database) ← DB_* environment                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PgStore::connect(config).await ← Create pool + run migrations         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │               PgPool                     │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ One connection per open transaction                            │
//! │       ▼                                                                 │
//! │  Request 1 ──► begin() ──► Conn1 (SERIALIZABLE)                        │
//! │  Request 2 ──► begin() ──► Conn2                                       │
//! │  Revenue   ──► payments_between() ──► any idle connection, no locks    │
//! │                                                                         │
//! │  Pool size bounds the number of concurrent transactions.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use dinein_core::revenue::ItemSales;
use dinein_core::{Interval, Payment};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::revenue;
use crate::repository::tx::PgTx;
use crate::store::Store;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use dinein_db::DbConfig;
///
/// let config = DbConfig::new("localhost", "dinein", "dinein")
///     .port(5433)
///     .password("secret")
///     .max_connections(10);
/// assert_eq!(config.port, 5433);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,

    /// libpq sslmode name: disable, allow, prefer, require, verify-ca,
    /// verify-full.
    /// Default: prefer
    pub ssl_mode: String,

    /// Maximum number of connections in the pool.
    /// Default: 20
    pub max_connections: u32,

    /// How long a request waits for a free connection before failing
    /// with a transient error.
    /// Default: 5 seconds
    pub acquire_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration with defaults for everything but the target.
    pub fn new(host: impl Into<String>, user: impl Into<String>, database: impl Into<String>) -> Self {
        DbConfig {
            host: host.into(),
            port: 5432,
            user: user.into(),
            password: None,
            database: database.into(),
            ssl_mode: "prefer".to_string(),
            max_connections: 20,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn ssl_mode(mut self, mode: impl Into<String>) -> Self {
        self.ssl_mode = mode.into();
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the pool acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Builds sqlx connect options.
    pub fn connect_options(&self) -> DbResult<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .map_err(|e| DbError::Internal(format!("invalid sslmode '{}': {e}", self.ssl_mode)))?;

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .application_name("dinein");
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

// =============================================================================
// PgStore
// =============================================================================

/// PostgreSQL implementation of [`Store`].
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates the connection pool and, if enabled, applies migrations.
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Initializing database connection"
        );

        let options = config.connect_options()?;
        debug!(ssl_mode = %config.ssl_mode, "Connection options configured");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let store = PgStore { pool };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Wraps an existing pool (tests, tools).
    pub fn from_pool(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Catalog writes for seeding and fixtures.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Closes the pool; later operations fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> DbResult<PgTx> {
        PgTx::begin(&self.pool).await
    }

    async fn payments_between(&self, interval: Interval) -> DbResult<Vec<Payment>> {
        revenue::payments_between(&self.pool, interval).await
    }

    async fn item_sales_between(&self, interval: Interval) -> DbResult<Vec<ItemSales>> {
        revenue::item_sales_between(&self.pool, interval).await
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
