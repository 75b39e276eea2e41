//! # Order Line Queries
//!
//! ## Snapshot Pattern
//! `name_snapshot` and `unit_price_minor` are written once, on insert.
//! [`update`] only ever touches quantity and notes.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::debug;

use dinein_core::{LineId, MenuItemId, Money, OrderId, OrderLine};

use super::Lock;
use crate::error::{DbError, DbResult};
use crate::store::NewOrderLine;

const LINE_COLUMNS: &str =
    "id, order_id, item_id, name_snapshot, quantity, unit_price_minor, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: i64,
    order_id: i64,
    item_id: i64,
    name_snapshot: String,
    quantity: i32,
    unit_price_minor: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        OrderLine {
            id: LineId(row.id),
            order_id: OrderId(row.order_id),
            item_id: MenuItemId(row.item_id),
            name_snapshot: row.name_snapshot,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price_minor),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) async fn insert(conn: &mut PgConnection, line: NewOrderLine) -> DbResult<OrderLine> {
    debug!(
        order_id = %line.order_id,
        item_id = %line.item_id,
        quantity = line.quantity,
        "Inserting order line"
    );

    let sql = format!(
        "INSERT INTO order_items (order_id, item_id, name_snapshot, quantity, unit_price_minor, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {LINE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, LineRow>(&sql)
        .bind(line.order_id.get())
        .bind(line.item_id.get())
        .bind(&line.name_snapshot)
        .bind(line.quantity)
        .bind(line.unit_price.to_minor())
        .bind(&line.notes)
        .fetch_one(conn)
        .await?;
    Ok(row.into())
}

pub(crate) async fn find(conn: &mut PgConnection, id: LineId, lock: Lock) -> DbResult<Option<OrderLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM order_items WHERE id = $1{}", lock.suffix());
    let row = sqlx::query_as::<_, LineRow>(&sql)
        .bind(id.get())
        .fetch_optional(conn)
        .await?;
    Ok(row.map(OrderLine::from))
}

pub(crate) async fn update(
    conn: &mut PgConnection,
    id: LineId,
    quantity: i32,
    notes: Option<&str>,
) -> DbResult<OrderLine> {
    let sql = format!(
        "UPDATE order_items SET quantity = $2, notes = $3, updated_at = clock_timestamp() \
         WHERE id = $1 RETURNING {LINE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, LineRow>(&sql)
        .bind(id.get())
        .bind(quantity)
        .bind(notes)
        .fetch_optional(conn)
        .await?;
    row.map(OrderLine::from)
        .ok_or_else(|| DbError::not_found("Order line", id))
}

pub(crate) async fn delete(conn: &mut PgConnection, id: LineId) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
        .bind(id.get())
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order line", id));
    }
    Ok(())
}

/// Lines of an order, oldest first.
pub(crate) async fn list(conn: &mut PgConnection, order_id: OrderId) -> DbResult<Vec<OrderLine>> {
    let sql = format!(
        "SELECT {LINE_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, LineRow>(&sql)
        .bind(order_id.get())
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(OrderLine::from).collect())
}
