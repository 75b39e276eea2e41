//! # Store Contract
//!
//! The transactional interface the engine consumes. Two implementations
//! exist: [`crate::PgStore`] (PostgreSQL) and [`crate::MemoryStore`].
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  let mut tx = store.begin().await?;        SERIALIZABLE                 │
//! │       │                                                                 │
//! │       ├── tx.lock_order(id)                 SELECT ... FOR UPDATE       │
//! │       ├── tx.menu_snapshot(item)            committed catalog state     │
//! │       ├── tx.insert_line(..)                                            │
//! │       │                                                                 │
//! │       ├── tx.commit().await?   ──► visible to everyone                  │
//! │       └── drop(tx)             ──► rolled back, nothing observable      │
//! │                                                                         │
//! │  Revenue reads (payments_between, item_sales_between) bypass            │
//! │  transactions and never lock.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Rows read through a `lock_*` method stay locked until commit or drop.
//! - Unique violations surface as [`DbError::UniqueViolation`] carrying the
//!   constraint name (see [`crate::error::constraint`]).
//! - The store stamps `created_at`, `updated_at`, `closed_at` (unless given)
//!   and `paid_at` from its own clock, monotonic per process.
//!
//! [`DbError::UniqueViolation`]: crate::DbError::UniqueViolation

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dinein_core::revenue::ItemSales;
use dinein_core::{
    DiningTable, Interval, LineId, MenuItemId, MenuSnapshot, Money, Order, OrderId, OrderLine,
    OrderStatus, Payment, PaymentMethod, TableId,
};

use crate::error::DbResult;

// =============================================================================
// Insert Payloads
// =============================================================================

/// A line about to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub item_id: MenuItemId,
    pub name_snapshot: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub notes: Option<String>,
}

/// A payment about to be inserted; the store assigns id and `paid_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

// =============================================================================
// Store
// =============================================================================

/// A persistent store with serializable transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Starts a serializable transaction.
    async fn begin(&self) -> DbResult<Self::Tx>;

    /// Payments with `paid_at` in `[from, to)`, oldest first. No locks.
    async fn payments_between(&self, interval: Interval) -> DbResult<Vec<Payment>>;

    /// Per-item quantity and revenue over lines of orders paid in
    /// `[from, to)`. Unordered. No locks.
    async fn item_sales_between(&self, interval: Interval) -> DbResult<Vec<ItemSales>>;

    /// Succeeds when the store can serve queries.
    async fn health_check(&self) -> DbResult<()>;
}

// =============================================================================
// Transaction
// =============================================================================

/// Operations available inside a transaction.
///
/// Dropping a transaction without calling [`StoreTx::commit`] rolls it back.
#[async_trait]
pub trait StoreTx: Send + Sized {
    // ---- tables ------------------------------------------------------------

    async fn table(&mut self, id: TableId) -> DbResult<Option<DiningTable>>;

    async fn table_by_qr(&mut self, qr_token: &str) -> DbResult<Option<DiningTable>>;

    // ---- orders ------------------------------------------------------------

    /// The open order for a table, locked.
    async fn open_order_for_table(&mut self, table_id: TableId) -> DbResult<Option<Order>>;

    /// Inserts an `open` order.
    ///
    /// Fails with a unique violation on
    /// [`ONE_OPEN_ORDER_PER_TABLE`](crate::error::constraint::ONE_OPEN_ORDER_PER_TABLE)
    /// when another transaction got there first.
    async fn insert_open_order(&mut self, table_id: TableId) -> DbResult<Order>;

    /// Reads an order without locking it.
    async fn find_order(&mut self, id: OrderId) -> DbResult<Option<Order>>;

    /// Reads an order and locks it until the transaction ends.
    async fn lock_order(&mut self, id: OrderId) -> DbResult<Option<Order>>;

    async fn update_order_notes(&mut self, id: OrderId, notes: Option<&str>) -> DbResult<Order>;

    /// Moves an order to a terminal status.
    ///
    /// `closed_at` of `None` means the store's current time.
    async fn close_order(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        closed_at: Option<DateTime<Utc>>,
    ) -> DbResult<Order>;

    // ---- menu --------------------------------------------------------------

    /// Current name, price and active flag of a menu item.
    async fn menu_snapshot(&mut self, item_id: MenuItemId) -> DbResult<Option<MenuSnapshot>>;

    // ---- lines -------------------------------------------------------------

    async fn insert_line(&mut self, line: NewOrderLine) -> DbResult<OrderLine>;

    /// Reads a line and locks it until the transaction ends.
    async fn lock_line(&mut self, id: LineId) -> DbResult<Option<OrderLine>>;

    /// Replaces quantity and notes; the snapshot columns are untouched.
    async fn update_line(
        &mut self,
        id: LineId,
        quantity: i32,
        notes: Option<&str>,
    ) -> DbResult<OrderLine>;

    async fn delete_line(&mut self, id: LineId) -> DbResult<()>;

    /// All lines of an order, oldest first.
    async fn lines(&mut self, order_id: OrderId) -> DbResult<Vec<OrderLine>>;

    // ---- payments ----------------------------------------------------------

    async fn payment_for_order(&mut self, order_id: OrderId) -> DbResult<Option<Payment>>;

    /// Inserts a payment stamped with the store's clock.
    ///
    /// Fails with a unique violation on
    /// [`ONE_PAYMENT_PER_ORDER`](crate::error::constraint::ONE_PAYMENT_PER_ORDER)
    /// when the order already has one.
    async fn insert_payment(&mut self, payment: NewPayment) -> DbResult<Payment>;

    // ---- lifecycle ---------------------------------------------------------

    async fn commit(self) -> DbResult<()>;
}
