//! # dinein-db: Storage Layer for the Dine-in POS
//!
//! This crate defines the transactional store the engine runs on and ships
//! two implementations of it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dine-in POS Data Flow                            │
//! │                                                                         │
//! │  dinein-engine (OrderService::add_line)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dinein-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ Store / Tx    │    │   PgStore     │    │ MemoryStore  │  │   │
//! │  │   │  (store.rs)   │◄───│ (pool.rs,     │    │ (memory.rs)  │  │   │
//! │  │   │               │    │  repository/) │    │              │  │   │
//! │  │   │ contract      │◄───┼───────────────┼────│ tests, dev   │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  └────────────────────────────────┼───────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     PostgreSQL                                  │   │
//! │  │   orders_one_open_per_table, payments_order_id_key             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - `Store` / `StoreTx` contract
//! - [`pool`] - Connection pool and `PgStore`
//! - [`repository`] - PostgreSQL queries
//! - [`memory`] - In-memory store
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dinein_db::{DbConfig, PgStore, Store, StoreTx};
//!
//! let store = PgStore::connect(DbConfig::new("localhost", "dinein", "dinein")).await?;
//!
//! let mut tx = store.begin().await?;
//! let order = tx.lock_order(order_id).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use memory::{MemoryStore, MemoryTx};
pub use pool::{DbConfig, PgStore};
pub use repository::catalog::CatalogRepository;
pub use repository::tx::PgTx;
pub use store::{NewOrderLine, NewPayment, Store, StoreTx};
