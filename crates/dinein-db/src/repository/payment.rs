//! # Payment Queries
//!
//! At most one row per order: `payments_order_id_key` is the last line of
//! defence against double settlement.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::debug;

use dinein_core::{Money, OrderId, Payment, PaymentId};

use crate::error::{DbError, DbResult};
use crate::store::NewPayment;

pub(crate) const PAYMENT_COLUMNS: &str = "id, order_id, amount_minor, method, reference, paid_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PaymentRow {
    id: i64,
    order_id: i64,
    amount_minor: i64,
    method: String,
    reference: Option<String>,
    paid_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId(row.id),
            order_id: OrderId(row.order_id),
            amount: Money::from_minor(row.amount_minor),
            method: row.method.parse()?,
            reference: row.reference,
            paid_at: row.paid_at,
        })
    }
}

pub(crate) async fn for_order(conn: &mut PgConnection, order_id: OrderId) -> DbResult<Option<Payment>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1");
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(order_id.get())
        .fetch_optional(conn)
        .await?;
    row.map(Payment::try_from).transpose()
}

pub(crate) async fn insert(conn: &mut PgConnection, payment: NewPayment) -> DbResult<Payment> {
    debug!(
        order_id = %payment.order_id,
        amount = %payment.amount,
        method = %payment.method,
        "Inserting payment"
    );

    let sql = format!(
        "INSERT INTO payments (order_id, amount_minor, method, reference) \
         VALUES ($1, $2, $3, $4) RETURNING {PAYMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(payment.order_id.get())
        .bind(payment.amount.to_minor())
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .fetch_one(conn)
        .await?;
    row.try_into()
}
