//! # PostgreSQL Transaction
//!
//! [`PgTx`] owns one pooled connection in a `SERIALIZABLE` transaction and
//! implements [`StoreTx`] by delegating to the query modules.
//!
//! Dropping a `PgTx` without committing rolls the transaction back; this is
//! how request timeouts cancel work: the handler future is dropped, the
//! transaction with it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use dinein_core::{
    DiningTable, LineId, MenuItemId, MenuSnapshot, Order, OrderId, OrderLine, OrderStatus,
    Payment, TableId,
};

use super::{line, menu, order, payment, table, Lock};
use crate::error::DbResult;
use crate::store::{NewOrderLine, NewPayment, StoreTx};

/// A serializable PostgreSQL transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    pub(crate) async fn begin(pool: &PgPool) -> DbResult<Self> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn table(&mut self, id: TableId) -> DbResult<Option<DiningTable>> {
        table::find(&mut self.tx, id).await
    }

    async fn table_by_qr(&mut self, qr_token: &str) -> DbResult<Option<DiningTable>> {
        table::find_by_qr(&mut self.tx, qr_token).await
    }

    async fn open_order_for_table(&mut self, table_id: TableId) -> DbResult<Option<Order>> {
        order::open_for_table(&mut self.tx, table_id, Lock::ForUpdate).await
    }

    async fn insert_open_order(&mut self, table_id: TableId) -> DbResult<Order> {
        order::insert_open(&mut self.tx, table_id).await
    }

    async fn find_order(&mut self, id: OrderId) -> DbResult<Option<Order>> {
        order::find(&mut self.tx, id, Lock::None).await
    }

    async fn lock_order(&mut self, id: OrderId) -> DbResult<Option<Order>> {
        order::find(&mut self.tx, id, Lock::ForUpdate).await
    }

    async fn update_order_notes(&mut self, id: OrderId, notes: Option<&str>) -> DbResult<Order> {
        order::update_notes(&mut self.tx, id, notes).await
    }

    async fn close_order(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        closed_at: Option<DateTime<Utc>>,
    ) -> DbResult<Order> {
        order::close(&mut self.tx, id, status, closed_at).await
    }

    async fn menu_snapshot(&mut self, item_id: MenuItemId) -> DbResult<Option<MenuSnapshot>> {
        menu::snapshot(&mut self.tx, item_id).await
    }

    async fn insert_line(&mut self, new_line: NewOrderLine) -> DbResult<OrderLine> {
        line::insert(&mut self.tx, new_line).await
    }

    async fn lock_line(&mut self, id: LineId) -> DbResult<Option<OrderLine>> {
        line::find(&mut self.tx, id, Lock::ForUpdate).await
    }

    async fn update_line(
        &mut self,
        id: LineId,
        quantity: i32,
        notes: Option<&str>,
    ) -> DbResult<OrderLine> {
        line::update(&mut self.tx, id, quantity, notes).await
    }

    async fn delete_line(&mut self, id: LineId) -> DbResult<()> {
        line::delete(&mut self.tx, id).await
    }

    async fn lines(&mut self, order_id: OrderId) -> DbResult<Vec<OrderLine>> {
        line::list(&mut self.tx, order_id).await
    }

    async fn payment_for_order(&mut self, order_id: OrderId) -> DbResult<Option<Payment>> {
        payment::for_order(&mut self.tx, order_id).await
    }

    async fn insert_payment(&mut self, new_payment: NewPayment) -> DbResult<Payment> {
        payment::insert(&mut self.tx, new_payment).await
    }

    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }
}
