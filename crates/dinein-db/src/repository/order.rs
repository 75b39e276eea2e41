//! # Order Queries
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert_open() → Order { status: open }                         │
//! │         (orders_one_open_per_table rejects a second open order)        │
//! │                                                                         │
//! │  2. MUTATE LINES (see line.rs)                                         │
//! │     └── find(.., Lock::ForUpdate) first, so writers queue up           │
//! │                                                                         │
//! │  3. CLOSE                                                              │
//! │     └── close(.., closed, Some(paid_at)) → settled                     │
//! │     └── close(.., cancelled, None)       → cancelled at clock_timestamp│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::debug;

use dinein_core::{Order, OrderId, OrderStatus, TableId};

use super::Lock;
use crate::error::{DbError, DbResult};

const ORDER_COLUMNS: &str = "id, table_id, status, notes, created_at, updated_at, closed_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    table_id: i64,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId(row.id),
            table_id: TableId(row.table_id),
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        })
    }
}

fn convert(row: Option<OrderRow>) -> DbResult<Option<Order>> {
    row.map(Order::try_from).transpose()
}

/// The open order for a table, if any.
pub(crate) async fn open_for_table(
    conn: &mut PgConnection,
    table_id: TableId,
    lock: Lock,
) -> DbResult<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE table_id = $1 AND status = 'open'{}",
        lock.suffix()
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(table_id.get())
        .fetch_optional(conn)
        .await?;
    convert(row)
}

pub(crate) async fn insert_open(conn: &mut PgConnection, table_id: TableId) -> DbResult<Order> {
    debug!(table_id = %table_id, "Inserting open order");

    let sql = format!("INSERT INTO orders (table_id) VALUES ($1) RETURNING {ORDER_COLUMNS}");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(table_id.get())
        .fetch_one(conn)
        .await?;
    row.try_into()
}

pub(crate) async fn find(conn: &mut PgConnection, id: OrderId, lock: Lock) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{}", lock.suffix());
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id.get())
        .fetch_optional(conn)
        .await?;
    convert(row)
}

pub(crate) async fn update_notes(
    conn: &mut PgConnection,
    id: OrderId,
    notes: Option<&str>,
) -> DbResult<Order> {
    let sql = format!(
        "UPDATE orders SET notes = $2, updated_at = clock_timestamp() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id.get())
        .bind(notes)
        .fetch_optional(conn)
        .await?;
    convert(row)?.ok_or_else(|| DbError::not_found("Order", id))
}

pub(crate) async fn close(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    closed_at: Option<DateTime<Utc>>,
) -> DbResult<Order> {
    debug!(order_id = %id, status = %status, "Closing order");

    let sql = format!(
        "UPDATE orders \
         SET status = $2, closed_at = COALESCE($3, clock_timestamp()), updated_at = clock_timestamp() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id.get())
        .bind(status.as_str())
        .bind(closed_at)
        .fetch_optional(conn)
        .await?;
    convert(row)?.ok_or_else(|| DbError::not_found("Order", id))
}
