//! # Order Aggregate
//!
//! Line mutations, totals, cancellation and line merging.
//!
//! Every mutation locks the parent order first and re-checks that it is
//! still open, so a line can never change after its order settles or is
//! cancelled, even if the request raced the settlement.
//!
//! ## Line Policy
//! `add_line` always inserts a new line, even when an identical line exists.
//! Identical lines are collapsed only on request through `merge_lines`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use dinein_core::order::{order_total, plan_merge};
use dinein_core::validation::{normalize_notes, validate_quantity};
use dinein_core::{
    LineId, MenuItemId, Money, Order, OrderId, OrderLine, OrderStatus, OrderView, ValidationError,
};
use dinein_db::{NewOrderLine, Store, StoreTx};

use crate::error::{EngineError, EngineResult};
use crate::retry::with_retry;

/// Changes to apply to a line. Absent fields stay as they are.
///
/// Blank `notes` clears the line's notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinePatch {
    pub quantity: Option<i64>,
    pub notes: Option<String>,
}

/// Manages orders and their lines.
pub struct OrderService<S> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        OrderService {
            store: Arc::clone(&self.store),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>, max_attempts: u32) -> Self {
        OrderService { store, max_attempts }
    }

    // =========================================================================
    // Line Mutations
    // =========================================================================

    /// Appends a line priced at the menu item's current price.
    pub async fn add_line(
        &self,
        order_id: OrderId,
        item_id: MenuItemId,
        quantity: i64,
        notes: Option<&str>,
    ) -> EngineResult<OrderLine> {
        let quantity = validate_quantity(quantity)?;
        let notes = normalize_notes(notes)?;

        with_retry("add_line", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            lock_open_order(&mut tx, order_id).await?;

            let snapshot = tx
                .menu_snapshot(item_id)
                .await?
                .ok_or(EngineError::ItemNotFound(item_id))?;
            if !snapshot.active {
                return Err(EngineError::ItemInactive(item_id));
            }

            let line = tx
                .insert_line(NewOrderLine {
                    order_id,
                    item_id,
                    name_snapshot: snapshot.name,
                    quantity,
                    unit_price: snapshot.price,
                    notes: notes.clone(),
                })
                .await?;
            tx.commit().await?;

            info!(
                order_id = %order_id,
                line_id = %line.id,
                item_id = %item_id,
                quantity,
                unit_price = %line.unit_price,
                "Line added"
            );
            Ok(line)
        })
        .await
    }

    /// Changes quantity and/or notes of a line. The price snapshot is kept.
    pub async fn update_line(
        &self,
        order_id: OrderId,
        line_id: LineId,
        patch: LinePatch,
    ) -> EngineResult<OrderLine> {
        if patch.quantity.is_none() && patch.notes.is_none() {
            return Err(ValidationError::Required {
                field: "quantity or notes".to_string(),
            }
            .into());
        }
        let quantity = patch.quantity.map(validate_quantity).transpose()?;
        let notes = patch
            .notes
            .as_deref()
            .map(|n| normalize_notes(Some(n)))
            .transpose()?;

        with_retry("update_line", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            lock_open_order(&mut tx, order_id).await?;
            let line = lock_line_of(&mut tx, order_id, line_id).await?;

            let quantity = quantity.unwrap_or(line.quantity);
            let notes = match &notes {
                Some(replacement) => replacement.as_deref(),
                None => line.notes.as_deref(),
            };
            let updated = tx.update_line(line_id, quantity, notes).await?;
            tx.commit().await?;

            info!(
                order_id = %order_id,
                line_id = %line_id,
                quantity = updated.quantity,
                "Line updated"
            );
            Ok(updated)
        })
        .await
    }

    pub async fn remove_line(&self, order_id: OrderId, line_id: LineId) -> EngineResult<()> {
        with_retry("remove_line", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            lock_open_order(&mut tx, order_id).await?;
            lock_line_of(&mut tx, order_id, line_id).await?;

            tx.delete_line(line_id).await?;
            tx.commit().await?;

            info!(order_id = %order_id, line_id = %line_id, "Line removed");
            Ok(())
        })
        .await
    }

    /// Collapses lines with the same item, unit price and notes into the
    /// oldest of them.
    pub async fn merge_lines(&self, order_id: OrderId) -> EngineResult<OrderView> {
        with_retry("merge_lines", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            let order = lock_open_order(&mut tx, order_id).await?;

            let lines = tx.lines(order_id).await?;
            let plan = plan_merge(&lines)?;
            if plan.is_noop() {
                debug!(order_id = %order_id, "No lines to merge");
                return view(order, lines);
            }

            for kept in &plan.keep {
                let notes = lines
                    .iter()
                    .find(|l| l.id == kept.line_id)
                    .and_then(|l| l.notes.clone());
                tx.update_line(kept.line_id, kept.quantity, notes.as_deref())
                    .await?;
            }
            for removed in &plan.remove {
                tx.delete_line(*removed).await?;
            }

            let lines = tx.lines(order_id).await?;
            tx.commit().await?;

            info!(
                order_id = %order_id,
                merged = plan.remove.len(),
                remaining = lines.len(),
                "Lines merged"
            );
            view(order, lines)
        })
        .await
    }

    // =========================================================================
    // Order Mutations
    // =========================================================================

    /// Moves an open, unpaid order to `cancelled`.
    pub async fn cancel(&self, order_id: OrderId) -> EngineResult<Order> {
        with_retry("cancel", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            let order = tx
                .lock_order(order_id)
                .await?
                .ok_or(EngineError::OrderNotFound(order_id))?;

            if tx.payment_for_order(order_id).await?.is_some() {
                return Err(EngineError::PaymentExists(order_id));
            }
            order.ensure_transition(OrderStatus::Cancelled)?;

            let cancelled = tx
                .close_order(order_id, OrderStatus::Cancelled, None)
                .await?;
            tx.commit().await?;

            info!(order_id = %order_id, table_id = %cancelled.table_id, "Order cancelled");
            Ok(cancelled)
        })
        .await
    }

    /// Replaces the order's advisory notes. Allowed in any status.
    pub async fn set_notes(&self, order_id: OrderId, notes: Option<&str>) -> EngineResult<Order> {
        let notes = normalize_notes(notes)?;

        with_retry("set_notes", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            tx.lock_order(order_id)
                .await?
                .ok_or(EngineError::OrderNotFound(order_id))?;

            let order = tx.update_order_notes(order_id, notes.as_deref()).await?;
            tx.commit().await?;

            debug!(order_id = %order_id, "Order notes updated");
            Ok(order)
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The order with its lines and total.
    pub async fn get(&self, order_id: OrderId) -> EngineResult<OrderView> {
        with_retry("get_order", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            let order = tx
                .find_order(order_id)
                .await?
                .ok_or(EngineError::OrderNotFound(order_id))?;
            let lines = tx.lines(order_id).await?;
            view(order, lines)
        })
        .await
    }

    /// Sum of the persisted lines.
    pub async fn total(&self, order_id: OrderId) -> EngineResult<Money> {
        with_retry("order_total", self.max_attempts, || async {
            let mut tx = self.store.begin().await?;
            tx.find_order(order_id)
                .await?
                .ok_or(EngineError::OrderNotFound(order_id))?;
            let lines = tx.lines(order_id).await?;
            Ok(order_total(&lines)?)
        })
        .await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Locks the order and fails unless it is open.
async fn lock_open_order<T: StoreTx>(tx: &mut T, order_id: OrderId) -> EngineResult<Order> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or(EngineError::OrderNotFound(order_id))?;
    order.ensure_open()?;
    Ok(order)
}

/// Locks a line that must belong to `order_id`.
async fn lock_line_of<T: StoreTx>(
    tx: &mut T,
    order_id: OrderId,
    line_id: LineId,
) -> EngineResult<OrderLine> {
    match tx.lock_line(line_id).await? {
        Some(line) if line.order_id == order_id => Ok(line),
        _ => Err(EngineError::LineNotFound { order_id, line_id }),
    }
}

fn view(order: Order, items: Vec<OrderLine>) -> EngineResult<OrderView> {
    let total = order_total(&items)?;
    Ok(OrderView { order, items, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinein_core::CoreError;
    use dinein_db::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        orders: OrderService<MemoryStore>,
        order_id: OrderId,
        pad_thai: MenuItemId,
        iced_tea: MenuItemId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let category = store.insert_category("Mains").await.unwrap();
        let pad_thai = store
            .insert_menu_item(category, "Pad Thai", Money::from_minor(12000))
            .await
            .unwrap();
        let iced_tea = store
            .insert_menu_item(category, "Thai Iced Tea", Money::from_minor(5550))
            .await
            .unwrap();
        let table = store.insert_table(5, 4, "qr-5").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table.id).await.unwrap();
        tx.commit().await.unwrap();

        Fixture {
            orders: OrderService::new(Arc::clone(&store), 3),
            store,
            order_id: order.id,
            pad_thai: pad_thai.id,
            iced_tea: iced_tea.id,
        }
    }

    #[tokio::test]
    async fn test_add_line_snapshots_and_totals() {
        let f = fixture().await;

        let line = f
            .orders
            .add_line(f.order_id, f.pad_thai, 2, Some(" no peanuts "))
            .await
            .unwrap();
        assert_eq!(line.name_snapshot, "Pad Thai");
        assert_eq!(line.unit_price, Money::from_minor(12000));
        assert_eq!(line.notes.as_deref(), Some("no peanuts"));
        assert_eq!(f.orders.total(f.order_id).await.unwrap().to_string(), "240.00");

        f.orders.add_line(f.order_id, f.iced_tea, 1, None).await.unwrap();
        assert_eq!(f.orders.total(f.order_id).await.unwrap().to_string(), "295.50");

        // A price change after the fact leaves existing lines alone.
        f.store
            .set_menu_price(f.pad_thai, Money::from_minor(99900))
            .await
            .unwrap();
        let view = f.orders.get(f.order_id).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.total.to_string(), "295.50");
    }

    #[tokio::test]
    async fn test_add_line_inserts_duplicates() {
        let f = fixture().await;
        f.orders.add_line(f.order_id, f.pad_thai, 1, None).await.unwrap();
        f.orders.add_line(f.order_id, f.pad_thai, 1, None).await.unwrap();

        let view = f.orders.get(f.order_id).await.unwrap();
        assert_eq!(view.items.len(), 2);
    }

    #[tokio::test]
    async fn test_add_line_rejections() {
        let f = fixture().await;

        for qty in [0, -3, 1000] {
            let err = f.orders.add_line(f.order_id, f.pad_thai, qty, None).await.unwrap_err();
            assert!(matches!(err, EngineError::Core(CoreError::Validation(_))), "qty {qty}");
        }

        assert!(matches!(
            f.orders.add_line(f.order_id, MenuItemId(404), 1, None).await,
            Err(EngineError::ItemNotFound(_))
        ));

        f.store.set_menu_active(f.iced_tea, false).await.unwrap();
        assert!(matches!(
            f.orders.add_line(f.order_id, f.iced_tea, 1, None).await,
            Err(EngineError::ItemInactive(_))
        ));

        assert!(matches!(
            f.orders.add_line(OrderId(404), f.pad_thai, 1, None).await,
            Err(EngineError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_line() {
        let f = fixture().await;
        let line = f
            .orders
            .add_line(f.order_id, f.pad_thai, 1, Some("spicy"))
            .await
            .unwrap();

        let updated = f
            .orders
            .update_line(
                f.order_id,
                line.id,
                LinePatch {
                    quantity: Some(3),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.notes.as_deref(), Some("spicy"));
        assert_eq!(updated.unit_price, line.unit_price);

        let cleared = f
            .orders
            .update_line(
                f.order_id,
                line.id,
                LinePatch {
                    quantity: None,
                    notes: Some("   ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.quantity, 3);
        assert_eq!(cleared.notes, None);

        assert!(f
            .orders
            .update_line(f.order_id, line.id, LinePatch::default())
            .await
            .is_err());
        assert!(matches!(
            f.orders
                .update_line(
                    f.order_id,
                    line.id,
                    LinePatch {
                        quantity: Some(0),
                        notes: None
                    }
                )
                .await,
            Err(EngineError::Core(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_line_must_belong_to_order() {
        let f = fixture().await;
        let line = f.orders.add_line(f.order_id, f.pad_thai, 1, None).await.unwrap();

        let other_table = f.store.insert_table(6, 2, "qr-6").await.unwrap();
        let mut tx = f.store.begin().await.unwrap();
        let other = tx.insert_open_order(other_table.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(
            f.orders.remove_line(other.id, line.id).await,
            Err(EngineError::LineNotFound { .. })
        ));
        assert!(matches!(
            f.orders.remove_line(f.order_id, LineId(999)).await,
            Err(EngineError::LineNotFound { .. })
        ));

        f.orders.remove_line(f.order_id, line.id).await.unwrap();
        assert!(f.orders.get(f.order_id).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_merge_lines() {
        let f = fixture().await;
        let first = f.orders.add_line(f.order_id, f.pad_thai, 2, None).await.unwrap();
        f.orders.add_line(f.order_id, f.iced_tea, 1, None).await.unwrap();
        f.orders.add_line(f.order_id, f.pad_thai, 3, None).await.unwrap();
        f.orders
            .add_line(f.order_id, f.pad_thai, 1, Some("no peanuts"))
            .await
            .unwrap();
        let before = f.orders.total(f.order_id).await.unwrap();

        let view = f.orders.merge_lines(f.order_id).await.unwrap();
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.total, before);
        let merged = view.items.iter().find(|l| l.id == first.id).unwrap();
        assert_eq!(merged.quantity, 5);

        // Running it again changes nothing.
        let again = f.orders.merge_lines(f.order_id).await.unwrap();
        assert_eq!(again.items, view.items);
    }

    #[tokio::test]
    async fn test_cancel_freezes_order() {
        let f = fixture().await;
        let line = f.orders.add_line(f.order_id, f.pad_thai, 1, None).await.unwrap();

        let cancelled = f.orders.cancel(f.order_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.closed_at.is_some());

        let not_open = |r: EngineResult<_>| {
            matches!(r, Err(EngineError::Core(CoreError::OrderNotOpen { .. })))
        };
        assert!(not_open(
            f.orders.add_line(f.order_id, f.pad_thai, 1, None).await.map(|_| ())
        ));
        assert!(not_open(
            f.orders
                .update_line(
                    f.order_id,
                    line.id,
                    LinePatch {
                        quantity: Some(2),
                        notes: None
                    }
                )
                .await
                .map(|_| ())
        ));
        assert!(not_open(f.orders.remove_line(f.order_id, line.id).await));
        assert!(not_open(f.orders.merge_lines(f.order_id).await.map(|_| ())));
        assert!(not_open(f.orders.cancel(f.order_id).await.map(|_| ())));

        // Notes stay editable.
        let noted = f.orders.set_notes(f.order_id, Some("walked out")).await.unwrap();
        assert_eq!(noted.notes.as_deref(), Some("walked out"));
        assert_eq!(noted.status, OrderStatus::Cancelled);
        assert_eq!(f.orders.get(f.order_id).await.unwrap().items.len(), 1);
    }
}
