//! # Order Rules
//!
//! The pure half of the order aggregate: state checks, totals, line merging,
//! and settlement replay comparison. The engine loads rows under lock, asks
//! these functions what is allowed, then writes the result.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open_for ──► OPEN ──add/update/remove/merge──► OPEN                  │
//! │                  │                                                      │
//! │                  ├── settle ──► CLOSED     closed_at = paid_at          │
//! │                  │                                                      │
//! │                  └── cancel ──► CANCELLED  closed_at = now              │
//! │                                                                         │
//! │   ensure_open()      gates every line mutation                         │
//! │   ensure_transition() gates settle / cancel                            │
//! │   order_total()      Σ unit_price × quantity, exact                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineId, MenuItemId, Order, OrderLine, OrderStatus, Payment, PaymentMethod};
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// State Checks
// =============================================================================

impl Order {
    /// Fails with `OrderNotOpen` unless the order accepts mutations.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::OrderNotOpen {
                order_id: self.id,
                status: self.status,
            })
        }
    }

    /// Checks that the order may move to `next`.
    ///
    /// A terminal order reports `OrderNotOpen` (the caller asked to act on
    /// an order that is already finished); any other illegal move reports
    /// `InvalidTransition`.
    pub fn ensure_transition(&self, next: OrderStatus) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::OrderNotOpen {
                order_id: self.id,
                status: self.status,
            });
        }
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Σ `unit_price × quantity` over the given lines.
///
/// An order with no lines totals zero.
pub fn order_total(lines: &[OrderLine]) -> CoreResult<Money> {
    lines
        .iter()
        .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.line_total()?))
}

// =============================================================================
// Line Merging
// =============================================================================

/// New quantity for a line that absorbs its duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedLine {
    pub line_id: LineId,
    pub quantity: i32,
}

/// What a merge does to an order's lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Surviving lines whose quantity grows, ordered by line id.
    pub keep: Vec<MergedLine>,
    /// Lines folded into a survivor, ordered by line id.
    pub remove: Vec<LineId>,
}

impl MergePlan {
    /// True when no two lines were duplicates.
    pub fn is_noop(&self) -> bool {
        self.keep.is_empty() && self.remove.is_empty()
    }
}

/// Plans the collapse of duplicate lines.
///
/// Lines are duplicates when item, unit price snapshot, and notes are all
/// equal. The oldest line of each group survives with the summed quantity;
/// the snapshot never changes because every member shares it.
///
/// ## Errors
/// `Validation(OutOfRange)` when a merged quantity would exceed 999.
pub fn plan_merge(lines: &[OrderLine]) -> CoreResult<MergePlan> {
    let mut groups: HashMap<(MenuItemId, Money, Option<&str>), Vec<&OrderLine>> = HashMap::new();
    for line in lines {
        groups
            .entry((line.item_id, line.unit_price, line.notes.as_deref()))
            .or_default()
            .push(line);
    }

    let mut plan = MergePlan::default();
    for mut group in groups.into_values().filter(|g| g.len() > 1) {
        group.sort_by_key(|l| (l.created_at, l.id));

        let quantity: i64 = group.iter().map(|l| i64::from(l.quantity)).sum();
        if quantity > i64::from(MAX_LINE_QUANTITY) {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::from(MAX_LINE_QUANTITY),
            }
            .into());
        }

        plan.keep.push(MergedLine {
            line_id: group[0].id,
            quantity: quantity as i32,
        });
        plan.remove.extend(group[1..].iter().map(|l| l.id));
    }

    plan.keep.sort_by_key(|m| m.line_id);
    plan.remove.sort();
    Ok(plan)
}

// =============================================================================
// Settlement Replay
// =============================================================================

/// Decides whether a repeated settle request is a replay of `existing`.
///
/// Identical method and reference (after normalization) replay; anything
/// else conflicts.
pub fn check_replay(
    existing: &Payment,
    method: PaymentMethod,
    reference: Option<&str>,
) -> CoreResult<()> {
    if existing.method == method && existing.reference.as_deref() == reference {
        Ok(())
    } else {
        Err(CoreError::PaymentConflict {
            order_id: existing.order_id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, PaymentId, TableId};
    use chrono::{Duration, TimeZone, Utc};

    fn order(status: OrderStatus) -> Order {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        Order {
            id: OrderId(42),
            table_id: TableId(5),
            status,
            notes: None,
            created_at: now,
            updated_at: now,
            closed_at: status.is_terminal().then_some(now),
        }
    }

    fn line(id: i64, item: i64, qty: i32, price: i64, notes: Option<&str>) -> OrderLine {
        let base = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        OrderLine {
            id: LineId(id),
            order_id: OrderId(42),
            item_id: MenuItemId(item),
            name_snapshot: format!("item {item}"),
            quantity: qty,
            unit_price: Money::from_minor(price),
            notes: notes.map(str::to_string),
            created_at: base + Duration::seconds(id),
            updated_at: base + Duration::seconds(id),
        }
    }

    #[test]
    fn test_ensure_open() {
        assert!(order(OrderStatus::Open).ensure_open().is_ok());
        assert!(matches!(
            order(OrderStatus::Closed).ensure_open(),
            Err(CoreError::OrderNotOpen {
                status: OrderStatus::Closed,
                ..
            })
        ));
        assert!(order(OrderStatus::Cancelled).ensure_open().is_err());
    }

    #[test]
    fn test_ensure_transition() {
        let open = order(OrderStatus::Open);
        assert!(open.ensure_transition(OrderStatus::Closed).is_ok());
        assert!(open.ensure_transition(OrderStatus::Cancelled).is_ok());
        assert!(matches!(
            open.ensure_transition(OrderStatus::Open),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            order(OrderStatus::Cancelled).ensure_transition(OrderStatus::Closed),
            Err(CoreError::OrderNotOpen { .. })
        ));
    }

    #[test]
    fn test_order_total() {
        // 120.00 × 2 + 55.50 × 1
        let lines = vec![line(1, 10, 2, 12000, None), line(2, 11, 1, 5550, None)];
        assert_eq!(order_total(&lines).unwrap().to_string(), "295.50");
        assert_eq!(order_total(&[]).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_order_total_overflow() {
        let lines = vec![
            line(1, 10, 999, 1 << 61, None),
            line(2, 11, 999, 1 << 61, None),
        ];
        assert!(matches!(order_total(&lines), Err(CoreError::Overflow)));
    }

    #[test]
    fn test_plan_merge_keeps_oldest() {
        let lines = vec![
            line(3, 10, 1, 12000, None),
            line(1, 10, 2, 12000, None),
            line(2, 11, 1, 5550, None),
            line(4, 10, 4, 12000, None),
        ];
        let plan = plan_merge(&lines).unwrap();
        assert_eq!(
            plan.keep,
            vec![MergedLine {
                line_id: LineId(1),
                quantity: 7
            }]
        );
        assert_eq!(plan.remove, vec![LineId(3), LineId(4)]);
    }

    #[test]
    fn test_plan_merge_respects_price_and_notes() {
        let lines = vec![
            line(1, 10, 1, 12000, None),
            line(2, 10, 1, 13000, None),
            line(3, 10, 1, 12000, Some("no chili")),
        ];
        assert!(plan_merge(&lines).unwrap().is_noop());
    }

    #[test]
    fn test_plan_merge_quantity_cap() {
        let lines = vec![line(1, 10, 600, 100, None), line(2, 10, 400, 100, None)];
        assert!(matches!(
            plan_merge(&lines),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_check_replay() {
        let payment = Payment {
            id: PaymentId(1),
            order_id: OrderId(42),
            amount: Money::from_minor(29550),
            method: PaymentMethod::Card,
            reference: Some("AUTH-001".to_string()),
            paid_at: Utc::now(),
        };

        assert!(check_replay(&payment, PaymentMethod::Card, Some("AUTH-001")).is_ok());
        assert!(matches!(
            check_replay(&payment, PaymentMethod::Qr, Some("AUTH-001")),
            Err(CoreError::PaymentConflict { .. })
        ));
        assert!(check_replay(&payment, PaymentMethod::Card, Some("AUTH-002")).is_err());
        assert!(check_replay(&payment, PaymentMethod::Card, None).is_err());
    }
}
