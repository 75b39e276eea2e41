//! # In-Memory Store
//!
//! A [`Store`] held entirely in process memory. The engine and HTTP tests run
//! against it, and it serves local development without PostgreSQL.
//!
//! ## Transaction Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Arc<Mutex<MemoryState>>  (committed state)                             │
//! │       │                                                                 │
//! │       │ begin(): lock_owned() ── held until commit or drop              │
//! │       ▼                                                                 │
//! │  MemoryTx { guard, work: clone of state }                               │
//! │       │                                                                 │
//! │       ├── reads / writes touch `work` only                              │
//! │       │                                                                 │
//! │       ├── commit(): *guard = work   ──► visible                         │
//! │       └── drop:     work discarded  ──► rolled back                     │
//! │                                                                         │
//! │  One transaction at a time: trivially serializable, and every          │
//! │  FOR UPDATE lock is implied by the mutex.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unique, foreign key and check constraints of the PostgreSQL schema are
//! enforced here too, with the same constraint names, so the engine sees the
//! same errors from both stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use dinein_core::revenue::{tally_items, ItemSales};
use dinein_core::{
    CategoryId, Clock, DiningTable, Interval, LineId, MenuItem, MenuItemId, MenuSnapshot, Money,
    MonotonicClock, Order, OrderId, OrderLine, OrderStatus, Payment, PaymentId, SystemClock,
    TableId,
};

use crate::error::{constraint, DbError, DbResult};
use crate::store::{NewOrderLine, NewPayment, Store, StoreTx};

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Sequences {
    category: i64,
    table: i64,
    item: i64,
    order: i64,
    line: i64,
    payment: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    seq: Sequences,
    categories: BTreeMap<CategoryId, String>,
    tables: BTreeMap<TableId, DiningTable>,
    menu: BTreeMap<MenuItemId, MenuItem>,
    orders: BTreeMap<OrderId, Order>,
    lines: BTreeMap<LineId, OrderLine>,
    payments: BTreeMap<PaymentId, Payment>,
}

impl MemoryState {
    fn payment_for(&self, order_id: OrderId) -> Option<&Payment> {
        self.payments.values().find(|p| p.order_id == order_id)
    }

    fn payments_in(&self, interval: Interval) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| interval.contains(p.paid_at))
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.paid_at, p.id));
        payments
    }

    fn order_mut(&mut self, id: OrderId) -> DbResult<&mut Order> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    fn line_mut(&mut self, id: LineId) -> DbResult<&mut OrderLine> {
        self.lines
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("Order line", id))
    }
}

fn check_violation(message: impl Into<String>) -> DbError {
    DbError::Internal(format!("check constraint violated: {}", message.into()))
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory implementation of [`Store`].
///
/// Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store stamping rows with the system clock, kept monotonic.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new(SystemClock)))
    }

    /// A store stamping rows with the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        MemoryStore {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    // ---- catalog ----------------------------------------------------------

    pub async fn insert_category(&self, name: &str) -> DbResult<CategoryId> {
        let mut state = self.state.lock().await;
        if state.categories.values().any(|n| n == name) {
            return Err(DbError::unique(constraint::CATEGORY_NAME));
        }
        let id = CategoryId(next(&mut state.seq.category));
        state.categories.insert(id, name.to_string());
        Ok(id)
    }

    pub async fn insert_menu_item(
        &self,
        category_id: CategoryId,
        name: &str,
        price: Money,
    ) -> DbResult<MenuItem> {
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&category_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("category {category_id} does not exist"),
            });
        }
        if price.to_minor() < 0 {
            return Err(check_violation("price_minor >= 0"));
        }
        let item = MenuItem {
            id: MenuItemId(next(&mut state.seq.item)),
            category_id,
            name: name.to_string(),
            description: String::new(),
            price,
            active: true,
        };
        state.menu.insert(item.id, item.clone());
        Ok(item)
    }

    /// Changes the live price. Existing lines keep their snapshot.
    pub async fn set_menu_price(&self, id: MenuItemId, price: Money) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let item = state
            .menu
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("Menu item", id))?;
        item.price = price;
        Ok(())
    }

    pub async fn set_menu_active(&self, id: MenuItemId, active: bool) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let item = state
            .menu
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("Menu item", id))?;
        item.active = active;
        Ok(())
    }

    pub async fn insert_table(
        &self,
        number: i32,
        seating: i32,
        qr_token: &str,
    ) -> DbResult<DiningTable> {
        let mut state = self.state.lock().await;
        if number <= 0 {
            return Err(check_violation("number > 0"));
        }
        if seating <= 0 {
            return Err(check_violation("seating > 0"));
        }
        if state.tables.values().any(|t| t.number == number) {
            return Err(DbError::unique(constraint::TABLE_NUMBER));
        }
        if state.tables.values().any(|t| t.qr_token == qr_token) {
            return Err(DbError::unique(constraint::TABLE_QR_TOKEN));
        }
        let table = DiningTable {
            id: TableId(next(&mut state.seq.table)),
            number,
            qr_token: qr_token.to_string(),
            seating,
            active: true,
        };
        state.tables.insert(table.id, table.clone());
        Ok(table)
    }

    pub async fn set_table_active(&self, id: TableId, active: bool) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let table = state
            .tables
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("Table", id))?;
        table.active = active;
        Ok(())
    }

    // ---- inspection -------------------------------------------------------

    /// Orders of a table in the given status. Waits for any open transaction.
    pub async fn count_orders(&self, table_id: TableId, status: OrderStatus) -> usize {
        let state = self.state.lock().await;
        state
            .orders
            .values()
            .filter(|o| o.table_id == table_id && o.status == status)
            .count()
    }

    /// Payments recorded for an order. Waits for any open transaction.
    pub async fn count_payments(&self, order_id: OrderId) -> usize {
        let state = self.state.lock().await;
        state
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> DbResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            clock: Arc::clone(&self.clock),
        })
    }

    async fn payments_between(&self, interval: Interval) -> DbResult<Vec<Payment>> {
        let state = self.state.lock().await;
        Ok(state.payments_in(interval))
    }

    async fn item_sales_between(&self, interval: Interval) -> DbResult<Vec<ItemSales>> {
        let state = self.state.lock().await;
        let paid: Vec<OrderId> = state
            .payments_in(interval)
            .into_iter()
            .map(|p| p.order_id)
            .collect();
        let lines = state.lines.values().filter(|l| paid.contains(&l.order_id));

        let mut items = tally_items(lines)?;
        for item in &mut items {
            if let Some(live) = state.menu.get(&item.item_id) {
                item.name = live.name.clone();
            }
        }
        Ok(items)
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

// =============================================================================
// MemoryTx
// =============================================================================

/// A transaction over a [`MemoryStore`]; holds the store's lock.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    clock: Arc<dyn Clock>,
}

impl MemoryTx {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn table(&mut self, id: TableId) -> DbResult<Option<DiningTable>> {
        Ok(self.work.tables.get(&id).cloned())
    }

    async fn table_by_qr(&mut self, qr_token: &str) -> DbResult<Option<DiningTable>> {
        Ok(self
            .work
            .tables
            .values()
            .find(|t| t.qr_token == qr_token)
            .cloned())
    }

    async fn open_order_for_table(&mut self, table_id: TableId) -> DbResult<Option<Order>> {
        Ok(self
            .work
            .orders
            .values()
            .find(|o| o.table_id == table_id && o.is_open())
            .cloned())
    }

    async fn insert_open_order(&mut self, table_id: TableId) -> DbResult<Order> {
        if !self.work.tables.contains_key(&table_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("table {table_id} does not exist"),
            });
        }
        if self
            .work
            .orders
            .values()
            .any(|o| o.table_id == table_id && o.is_open())
        {
            return Err(DbError::unique(constraint::ONE_OPEN_ORDER_PER_TABLE));
        }

        let now = self.now();
        let order = Order {
            id: OrderId(next(&mut self.work.seq.order)),
            table_id,
            status: OrderStatus::Open,
            notes: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        };
        debug!(order_id = %order.id, table_id = %table_id, "Inserted open order");
        self.work.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&mut self, id: OrderId) -> DbResult<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> DbResult<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn update_order_notes(&mut self, id: OrderId, notes: Option<&str>) -> DbResult<Order> {
        let now = self.now();
        let order = self.work.order_mut(id)?;
        order.notes = notes.map(str::to_string);
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn close_order(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        closed_at: Option<DateTime<Utc>>,
    ) -> DbResult<Order> {
        if status == OrderStatus::Open {
            return Err(check_violation("(status = 'open') = (closed_at IS NULL)"));
        }
        let now = self.now();
        let order = self.work.order_mut(id)?;
        order.status = status;
        order.closed_at = Some(closed_at.unwrap_or(now));
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn menu_snapshot(&mut self, item_id: MenuItemId) -> DbResult<Option<MenuSnapshot>> {
        Ok(self.work.menu.get(&item_id).map(MenuSnapshot::from))
    }

    async fn insert_line(&mut self, new_line: NewOrderLine) -> DbResult<OrderLine> {
        if !self.work.orders.contains_key(&new_line.order_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("order {} does not exist", new_line.order_id),
            });
        }
        if !self.work.menu.contains_key(&new_line.item_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("menu item {} does not exist", new_line.item_id),
            });
        }
        if new_line.quantity <= 0 {
            return Err(check_violation("quantity > 0"));
        }

        let now = self.now();
        let line = OrderLine {
            id: LineId(next(&mut self.work.seq.line)),
            order_id: new_line.order_id,
            item_id: new_line.item_id,
            name_snapshot: new_line.name_snapshot,
            quantity: new_line.quantity,
            unit_price: new_line.unit_price,
            notes: new_line.notes,
            created_at: now,
            updated_at: now,
        };
        self.work.lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn lock_line(&mut self, id: LineId) -> DbResult<Option<OrderLine>> {
        Ok(self.work.lines.get(&id).cloned())
    }

    async fn update_line(
        &mut self,
        id: LineId,
        quantity: i32,
        notes: Option<&str>,
    ) -> DbResult<OrderLine> {
        if quantity <= 0 {
            return Err(check_violation("quantity > 0"));
        }
        let now = self.now();
        let line = self.work.line_mut(id)?;
        line.quantity = quantity;
        line.notes = notes.map(str::to_string);
        line.updated_at = now;
        Ok(line.clone())
    }

    async fn delete_line(&mut self, id: LineId) -> DbResult<()> {
        self.work
            .lines
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Order line", id))
    }

    async fn lines(&mut self, order_id: OrderId) -> DbResult<Vec<OrderLine>> {
        let mut lines: Vec<OrderLine> = self
            .work
            .lines
            .values()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| (l.created_at, l.id));
        Ok(lines)
    }

    async fn payment_for_order(&mut self, order_id: OrderId) -> DbResult<Option<Payment>> {
        Ok(self.work.payment_for(order_id).cloned())
    }

    async fn insert_payment(&mut self, new_payment: NewPayment) -> DbResult<Payment> {
        if !self.work.orders.contains_key(&new_payment.order_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("order {} does not exist", new_payment.order_id),
            });
        }
        if self.work.payment_for(new_payment.order_id).is_some() {
            return Err(DbError::unique(constraint::ONE_PAYMENT_PER_ORDER));
        }
        if new_payment.amount.to_minor() <= 0 {
            return Err(check_violation("amount_minor > 0"));
        }

        let payment = Payment {
            id: PaymentId(next(&mut self.work.seq.payment)),
            order_id: new_payment.order_id,
            amount: new_payment.amount,
            method: new_payment.method,
            reference: new_payment.reference,
            paid_at: self.now(),
        };
        self.work.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn commit(self) -> DbResult<()> {
        let MemoryTx {
            mut guard, work, ..
        } = self;
        *guard = work;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dinein_core::{ManualClock, PaymentMethod};

    async fn store_with_table() -> (MemoryStore, DiningTable, MenuItem) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        ));
        let store = MemoryStore::with_clock(clock);
        let cat = store.insert_category("Mains").await.unwrap();
        let item = store
            .insert_menu_item(cat, "Pad Thai", Money::from_minor(12000))
            .await
            .unwrap();
        let table = store.insert_table(5, 4, "qr-five").await.unwrap();
        (store, table, item)
    }

    #[tokio::test]
    async fn test_rollback_on_drop() {
        let (store, table, _) = store_with_table().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_open_order(table.id).await.unwrap();
            // dropped without commit
        }

        assert_eq!(store.count_orders(table.id, OrderStatus::Open).await, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes() {
        let (store, table, _) = store_with_table().await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table.id).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_one_open_order_per_table() {
        let (store, table, _) = store_with_table().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_open_order(table.id).await.unwrap();
        let err = tx.insert_open_order(table.id).await.unwrap_err();
        assert!(err.is_unique_violation_of(constraint::ONE_OPEN_ORDER_PER_TABLE));
    }

    #[tokio::test]
    async fn test_one_payment_per_order() {
        let (store, table, item) = store_with_table().await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table.id).await.unwrap();
        tx.insert_line(NewOrderLine {
            order_id: order.id,
            item_id: item.id,
            name_snapshot: item.name.clone(),
            quantity: 1,
            unit_price: item.price,
            notes: None,
        })
        .await
        .unwrap();

        let new_payment = NewPayment {
            order_id: order.id,
            amount: Money::from_minor(12000),
            method: PaymentMethod::Cash,
            reference: None,
        };
        tx.insert_payment(new_payment.clone()).await.unwrap();
        let err = tx.insert_payment(new_payment).await.unwrap_err();
        assert!(err.is_unique_violation_of(constraint::ONE_PAYMENT_PER_ORDER));
    }

    #[tokio::test]
    async fn test_table_constraints() {
        let (store, _, _) = store_with_table().await;
        assert!(store
            .insert_table(5, 2, "other")
            .await
            .unwrap_err()
            .is_unique_violation_of(constraint::TABLE_NUMBER));
        assert!(store
            .insert_table(6, 2, "qr-five")
            .await
            .unwrap_err()
            .is_unique_violation_of(constraint::TABLE_QR_TOKEN));
        assert!(store.insert_table(0, 2, "zero").await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_survives_price_change() {
        let (store, table, item) = store_with_table().await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table.id).await.unwrap();
        let snap = tx.menu_snapshot(item.id).await.unwrap().unwrap();
        let line = tx
            .insert_line(NewOrderLine {
                order_id: order.id,
                item_id: snap.item_id,
                name_snapshot: snap.name,
                quantity: 2,
                unit_price: snap.price,
                notes: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        store
            .set_menu_price(item.id, Money::from_minor(15000))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let lines = tx.lines(order.id).await.unwrap();
        assert_eq!(lines, vec![line]);
        assert_eq!(lines[0].unit_price.to_minor(), 12000);
    }

    #[tokio::test]
    async fn test_close_order_stamps_closed_at() {
        let (store, table, _) = store_with_table().await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table.id).await.unwrap();
        let cancelled = tx
            .close_order(order.id, OrderStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.closed_at.is_some());

        assert!(tx
            .close_order(order.id, OrderStatus::Open, None)
            .await
            .is_err());
    }
}
