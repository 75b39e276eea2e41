//! # Revenue Reads
//!
//! Range scans over `payments.paid_at`. These run on the pool, outside any
//! transaction, and take no locks; wide report ranges never block orders.

use sqlx::PgPool;

use dinein_core::revenue::ItemSales;
use dinein_core::{Interval, MenuItemId, Money, Payment};

use super::payment::{PaymentRow, PAYMENT_COLUMNS};
use crate::error::DbResult;

/// Payments with `paid_at` in `[from, to)`, oldest first.
pub(crate) async fn payments_between(pool: &PgPool, interval: Interval) -> DbResult<Vec<Payment>> {
    if interval.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments \
         WHERE paid_at >= $1 AND paid_at < $2 \
         ORDER BY paid_at, id"
    );
    let rows = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(interval.from)
        .bind(interval.to)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Payment::try_from).collect()
}

#[derive(Debug, sqlx::FromRow)]
struct ItemSalesRow {
    item_id: i64,
    name: String,
    quantity: i64,
    revenue_minor: i64,
}

/// Quantity and revenue per menu item over lines of orders paid in
/// `[from, to)`. The live menu name wins over the snapshot.
pub(crate) async fn item_sales_between(pool: &PgPool, interval: Interval) -> DbResult<Vec<ItemSales>> {
    if interval.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ItemSalesRow>(
        r#"
        SELECT
            l.item_id,
            COALESCE(MAX(m.name), MAX(l.name_snapshot)) AS name,
            SUM(l.quantity)::BIGINT AS quantity,
            SUM(l.quantity::BIGINT * l.unit_price_minor)::BIGINT AS revenue_minor
        FROM payments p
        JOIN order_items l ON l.order_id = p.order_id
        LEFT JOIN menu_items m ON m.id = l.item_id
        WHERE p.paid_at >= $1 AND p.paid_at < $2
        GROUP BY l.item_id
        "#,
    )
    .bind(interval.from)
    .bind(interval.to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ItemSales {
            item_id: MenuItemId(r.item_id),
            name: r.name,
            quantity: r.quantity,
            revenue: Money::from_minor(r.revenue_minor),
        })
        .collect())
}
