//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL error (sqlx::Error)      MemoryStore constraint check      │
//! │       │                                     │                           │
//! │       └──────────────┬──────────────────────┘                           │
//! │                      ▼                                                  │
//! │  DbError (this module) ← SQLSTATE categorization                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (dinein-engine) ← retry on transient / unique violation   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (api-server) ← 404 / 409 / 503 / 500                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// SQLSTATE codes the store distinguishes.
pub mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const DEADLOCK_DETECTED: &str = "40P01";
}

/// Constraint names shared by the schema and the in-memory store.
pub mod constraint {
    pub const ONE_OPEN_ORDER_PER_TABLE: &str = "orders_one_open_per_table";
    pub const ONE_PAYMENT_PER_ORDER: &str = "payments_order_id_key";
    pub const TABLE_NUMBER: &str = "tables_number_key";
    pub const TABLE_QR_TOKEN: &str = "tables_qr_token_key";
    pub const CATEGORY_NAME: &str = "categories_name_key";
}

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the store.
    ///
    /// ## When This Occurs
    /// - Lookup by an id that was never assigned
    /// - A row deleted by a concurrent transaction
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two transactions racing to open an order on the same table
    /// - Two transactions racing to settle the same order
    /// - Seeding a duplicate table number or QR token
    #[error("Unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting an order that still has a payment
    /// - Referencing a non-existent table or menu item
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Failure that may succeed if the transaction is re-run.
    ///
    /// ## When This Occurs
    /// - Serialization failure (40001) or deadlock (40P01)
    /// - Pool timed out waiting for a connection
    /// - Connection dropped mid-transaction
    #[error("Transient store failure: {0}")]
    Transient(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other store failure.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn unique(constraint: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    /// True when re-running the transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Transient(_))
    }

    /// True for a unique violation on the named constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, DbError::UniqueViolation { constraint } if constraint == name)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound        → DbError::NotFound
/// sqlx::Error::Database 23505     → DbError::UniqueViolation (constraint name)
/// sqlx::Error::Database 23503     → DbError::ForeignKeyViolation
/// sqlx::Error::Database 40001/P01 → DbError::Transient
/// sqlx::Error::PoolTimedOut / Io  → DbError::Transient
/// Other                           → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(sqlstate::UNIQUE_VIOLATION) => DbError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                },
                Some(sqlstate::FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                Some(sqlstate::SERIALIZATION_FAILURE) | Some(sqlstate::DEADLOCK_DETECTED) => {
                    DbError::Transient(db_err.message().to_string())
                }
                _ => DbError::Internal(db_err.message().to_string()),
            },

            sqlx::Error::PoolTimedOut => DbError::Transient("connection pool timed out".to_string()),

            sqlx::Error::Io(e) => DbError::Transient(format!("I/O: {e}")),

            sqlx::Error::PoolClosed => DbError::Internal("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Stored strings that fail to parse back into domain types.
impl From<dinein_core::CoreError> for DbError {
    fn from(err: dinein_core::CoreError) -> Self {
        DbError::Internal(format!("corrupt row: {err}"))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
