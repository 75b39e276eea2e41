//! # Repository Module
//!
//! PostgreSQL queries behind the store contract.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  dinein-engine                                                         │
//! │       │                                                                 │
//! │       │  tx.lock_order(id)                                             │
//! │       ▼                                                                 │
//! │  PgTx (tx.rs) ── StoreTx impl, owns the sqlx Transaction               │
//! │       │                                                                 │
//! │       ├── table::find_by_qr(conn, token)                               │
//! │       ├── order::find(conn, id, Lock::ForUpdate)                       │
//! │       ├── menu::snapshot(conn, item_id)                                │
//! │       ├── line::insert(conn, new_line)                                 │
//! │       └── payment::insert(conn, new_payment)                           │
//! │       │                                                                 │
//! │       │  SQL (runtime query_as + bind)                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module keeps a private `*Row` struct matching its columns and
//! converts it into the `dinein-core` type; status and method columns are
//! TEXT and parse through `FromStr`.
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Categories, menu items, tables (seeding)
//! - [`tx::PgTx`] - The transactional store handle

pub mod catalog;
pub mod line;
pub mod menu;
pub mod order;
pub mod payment;
pub mod revenue;
pub mod table;
pub mod tx;

/// Whether a read takes a row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    None,
    ForUpdate,
}

impl Lock {
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            Lock::None => "",
            Lock::ForUpdate => " FOR UPDATE",
        }
    }
}
