//! # Table Session Guard
//!
//! Keeps at most one open order per table and maps QR scans to it.
//!
//! ## Open-or-Join Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  scan / POST /tables/{id}/orders                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ─► table exists? ──no──► TableNotFound / QrUnknown               │
//! │              │                                                          │
//! │              ▼                                                          │
//! │           active? ──no──► TableInactive                                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │     open order FOR UPDATE ──found──► return it (created = false)        │
//! │              │                                                          │
//! │              ▼                                                          │
//! │     INSERT open order ──ok──► COMMIT, return it (created = true)        │
//! │              │                                                          │
//! │              └─ unique violation (lost the race) ─► re-run from BEGIN   │
//! │                                                   finds the winner      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use dinein_core::{DiningTable, Order, TableId};
use dinein_db::{Store, StoreTx};

use crate::error::{EngineError, EngineResult};
use crate::retry::with_retry;

/// Result of [`TableSessionGuard::open_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenedOrder {
    #[serde(flatten)]
    pub order: Order,
    /// False when an existing open order was joined.
    #[serde(skip)]
    pub created: bool,
}

#[derive(Clone, Copy)]
enum TableRef<'a> {
    Id(TableId),
    Qr(&'a str),
}

/// Opens, joins and looks up table sessions.
pub struct TableSessionGuard<S> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S> Clone for TableSessionGuard<S> {
    fn clone(&self) -> Self {
        TableSessionGuard {
            store: Arc::clone(&self.store),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: Store> TableSessionGuard<S> {
    pub fn new(store: Arc<S>, max_attempts: u32) -> Self {
        TableSessionGuard { store, max_attempts }
    }

    /// Returns the table's open order, opening one if there is none.
    pub async fn open_for(&self, table_id: TableId) -> EngineResult<OpenedOrder> {
        with_retry("open_for", self.max_attempts, || {
            self.open_once(TableRef::Id(table_id))
        })
        .await
    }

    /// Resolves a scanned QR token to its table's open order.
    pub async fn resolve_qr(&self, qr_token: &str) -> EngineResult<OpenedOrder> {
        let token = qr_token.trim();
        if token.is_empty() {
            return Err(EngineError::QrUnknown);
        }
        with_retry("resolve_qr", self.max_attempts, || {
            self.open_once(TableRef::Qr(token))
        })
        .await
    }

    /// The table's open order, if any. Never opens one.
    pub async fn current_open_order(&self, table_id: TableId) -> EngineResult<Option<Order>> {
        with_retry("current_open_order", self.max_attempts, || async move {
            let mut tx = self.store.begin().await?;
            tx.table(table_id)
                .await?
                .ok_or(EngineError::TableNotFound(table_id))?;
            Ok(tx.open_order_for_table(table_id).await?)
        })
        .await
    }

    async fn open_once(&self, target: TableRef<'_>) -> EngineResult<OpenedOrder> {
        let mut tx = self.store.begin().await?;

        let table = find_table(&mut tx, target).await?;
        if !table.active {
            return Err(EngineError::TableInactive(table.id));
        }

        if let Some(order) = tx.open_order_for_table(table.id).await? {
            debug!(table_id = %table.id, order_id = %order.id, "Joined open order");
            return Ok(OpenedOrder { order, created: false });
        }

        let order = tx.insert_open_order(table.id).await?;
        tx.commit().await?;

        info!(
            table_id = %table.id,
            table_number = table.number,
            order_id = %order.id,
            "Order opened"
        );
        Ok(OpenedOrder { order, created: true })
    }
}

async fn find_table<T: StoreTx>(tx: &mut T, target: TableRef<'_>) -> EngineResult<DiningTable> {
    match target {
        TableRef::Id(id) => tx.table(id).await?.ok_or(EngineError::TableNotFound(id)),
        TableRef::Qr(token) => tx.table_by_qr(token).await?.ok_or(EngineError::QrUnknown),
    }
}
