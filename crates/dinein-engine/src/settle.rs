//! # Payment Settler
//!
//! Records an order's single payment and closes the order in the same
//! transaction.
//!
//! ## Settlement Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (serializable)                                                   │
//! │   1. lock order ─────────────────────────► OrderNotFound                │
//! │   2. payment exists?                                                    │
//! │        same method + reference ─────────► replay (nothing written)      │
//! │        different ───────────────────────► PaymentConflict              │
//! │   3. order open? ───────────────────────► OrderNotOpen                  │
//! │   4. total of lines == 0 ───────────────► EmptyOrder (stays open)       │
//! │   5. INSERT payment (amount = total, paid_at = store clock)             │
//! │   6. order → closed, closed_at = paid_at                                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Unique violation on payments(order_id) at step 5 means a concurrent    │
//! │  settle won; the transaction is re-run and takes the replay path.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use dinein_core::order::{check_replay, order_total};
use dinein_core::validation::normalize_reference;
use dinein_core::{CoreError, OrderId, OrderStatus, Payment, PaymentMethod};
use dinein_db::{NewPayment, Store, StoreTx};

use crate::error::{EngineError, EngineResult};
use crate::retry::with_retry;

/// Outcome of a settle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    #[serde(flatten)]
    pub payment: Payment,
    /// True when the payment already existed and nothing was written.
    #[serde(skip)]
    pub replayed: bool,
}

/// Settles orders with payments.
pub struct PaymentSettler<S> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S> Clone for PaymentSettler<S> {
    fn clone(&self) -> Self {
        PaymentSettler {
            store: Arc::clone(&self.store),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: Store> PaymentSettler<S> {
    pub fn new(store: Arc<S>, max_attempts: u32) -> Self {
        PaymentSettler { store, max_attempts }
    }

    /// Pays the order's current total and closes it.
    ///
    /// Idempotent for an identical method and reference.
    pub async fn settle(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        reference: Option<&str>,
    ) -> EngineResult<Settlement> {
        let reference = normalize_reference(reference)?;

        with_retry("settle", self.max_attempts, || {
            self.settle_once(order_id, method, reference.as_deref())
        })
        .await
    }

    /// The order's payment, if it has been settled.
    pub async fn payment_for(&self, order_id: OrderId) -> EngineResult<Option<Payment>> {
        with_retry("payment_for", self.max_attempts, || async move {
            let mut tx = self.store.begin().await?;
            tx.find_order(order_id)
                .await?
                .ok_or(EngineError::OrderNotFound(order_id))?;
            Ok(tx.payment_for_order(order_id).await?)
        })
        .await
    }

    async fn settle_once(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        reference: Option<&str>,
    ) -> EngineResult<Settlement> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if let Some(existing) = tx.payment_for_order(order_id).await? {
            check_replay(&existing, method, reference)?;
            debug!(order_id = %order_id, payment_id = %existing.id, "Settle replayed");
            return Ok(Settlement {
                payment: existing,
                replayed: true,
            });
        }

        order.ensure_transition(OrderStatus::Closed)?;

        let lines = tx.lines(order_id).await?;
        let amount = order_total(&lines)?;
        if amount.is_zero() {
            return Err(CoreError::EmptyOrder(order_id).into());
        }

        let payment = tx
            .insert_payment(NewPayment {
                order_id,
                amount,
                method,
                reference: reference.map(str::to_string),
            })
            .await?;
        tx.close_order(order_id, OrderStatus::Closed, Some(payment.paid_at))
            .await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            method = %payment.method,
            lines = lines.len(),
            "Order settled"
        );
        Ok(Settlement {
            payment,
            replayed: false,
        })
    }
}
