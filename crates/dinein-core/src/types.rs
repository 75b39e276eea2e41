//! # Domain Types
//!
//! Core domain types used throughout the dine-in POS backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiningTable    │   │     Order       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  table_id       │◄──│  order_id (1:1) │       │
//! │  │  number         │   │  status         │   │  amount         │       │
//! │  │  qr_token       │   │  closed_at?     │   │  method         │       │
//! │  └─────────────────┘   └────────┬────────┘   │  paid_at        │       │
//! │                                 │ owns       └─────────────────┘       │
//! │  ┌─────────────────┐   ┌────────▼────────┐                             │
//! │  │    MenuItem     │   │   OrderLine     │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  price (live)   │──►│  unit_price     │  (snapshot, frozen)         │
//! │  │  name  (live)   │──►│  name_snapshot  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │  OrderStatus    │   │ PaymentMethod   │                             │
//! │  │  open           │   │ cash  card      │                             │
//! │  │  closed         │   │ qr    wallet    │                             │
//! │  │  cancelled      │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has a numeric id assigned by the store, wrapped in its own
//! newtype so an `OrderId` can never be passed where a `LineId` is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw numeric id.
            #[inline]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                $name(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a dining table.
    TableId
);
entity_id!(
    /// Identifies a menu category.
    CategoryId
);
entity_id!(
    /// Identifies a menu item.
    MenuItemId
);
entity_id!(
    /// Identifies an order.
    OrderId
);
entity_id!(
    /// Identifies an order line.
    LineId
);
entity_id!(
    /// Identifies a payment.
    PaymentId
);

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## State Machine
/// ```text
///            addLine / updateLine / removeLine
///                 ┌──────────┐
///                 ▼          │
///   ────────►  OPEN ─────────┘
///               │   │
///       settle  │   │  cancel
///               ▼   ▼
///          CLOSED   CANCELLED      (both terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepting line changes.
    Open,
    /// Settled by a payment.
    Closed,
    /// Abandoned without payment.
    Cancelled,
}

impl OrderStatus {
    /// Canonical lowercase name, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Closed => "closed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Closed and cancelled orders never change status again.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Open)
    }

    /// Whether the state machine allows `self → next`.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Open, OrderStatus::Closed) | (OrderStatus::Open, OrderStatus::Cancelled)
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "closed" => Ok(OrderStatus::Closed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::InvalidEnum {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash at the counter.
    Cash,
    /// Card on an external terminal; reference is the approval code.
    Card,
    /// QR / PromptPay transfer; reference is the transaction id.
    Qr,
    /// E-wallet; reference is the wallet transaction id.
    Wallet,
}

impl PaymentMethod {
    /// Every method, in canonical order.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Qr,
        PaymentMethod::Wallet,
    ];

    /// Canonical lowercase name, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Qr => "qr",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::InvalidEnum {
                kind: "payment method",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Dining Table
// =============================================================================

/// A physical table in the dining room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiningTable {
    pub id: TableId,
    /// Number painted on the table (unique, positive).
    pub number: i32,
    /// Opaque token encoded in the table's QR code.
    pub qr_token: String,
    /// Number of seats.
    pub seating: i32,
    /// Inactive tables cannot host orders.
    pub active: bool,
}

/// Produces QR tokens for newly registered tables.
pub trait QrTokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random 32-hex-character tokens (UUID v4, no hyphens).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidQrTokens;

impl QrTokenGenerator for UuidQrTokens {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

// =============================================================================
// Menu
// =============================================================================

/// A menu item as currently listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    /// Live price; lines copy it at insertion time.
    #[ts(type = "string")]
    pub price: Money,
    /// Only active items may be added to new lines.
    pub active: bool,
}

/// What the menu snapshot reader returns for one item.
///
/// Read inside the same transaction that inserts the line, so the name and
/// price are the committed catalog state at that instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSnapshot {
    pub item_id: MenuItemId,
    pub name: String,
    pub price: Money,
    pub active: bool,
}

impl From<&MenuItem> for MenuSnapshot {
    fn from(item: &MenuItem) -> Self {
        MenuSnapshot {
            item_id: item.id,
            name: item.name.clone(),
            price: item.price,
            active: item.active,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order accumulated against one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: OrderId,
    pub table_id: TableId,
    pub status: OrderStatus,
    /// Advisory notes; the only field that may change after closing.
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Set exactly when status is closed or cancelled.
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item on an order.
/// Uses snapshot pattern to freeze menu data at the time the line is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: LineId,
    pub order_id: OrderId,
    pub item_id: MenuItemId,
    /// Menu item name at time of insertion (frozen).
    pub name_snapshot: String,
    pub quantity: i32,
    /// Unit price at time of insertion (frozen).
    #[ts(type = "string")]
    pub unit_price: Money,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OrderLine {
    /// `unit_price × quantity`.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price.mul_by_qty(i64::from(self.quantity))
    }
}

/// An order together with its lines and computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    #[ts(type = "string")]
    pub total: Money,
}

// =============================================================================
// Payment
// =============================================================================

/// The single payment that settles an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Equal to the order total at the instant of settlement.
    #[ts(type = "string")]
    pub amount: Money,
    pub method: PaymentMethod,
    /// Approval code / transaction id; opaque.
    pub reference: Option<String>,
    /// Store commit timestamp.
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse() {
        assert_eq!("open".parse::<OrderStatus>().unwrap(), OrderStatus::Open);
        assert_eq!(
            "cancelled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!(matches!(
            "Open".parse::<OrderStatus>(),
            Err(CoreError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn test_payment_method_parse() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("CASH".parse::<PaymentMethod>().is_err());
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Closed));
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Closed.can_transition_to(OrderStatus::Open));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Closed));
        assert!(!OrderStatus::Open.can_transition_to(OrderStatus::Open));
        assert!(OrderStatus::Closed.is_terminal());
        assert!(!OrderStatus::default().is_terminal());
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Wallet).unwrap(),
            "\"wallet\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_ids_are_transparent() {
        assert_eq!(serde_json::to_string(&OrderId(42)).unwrap(), "42");
        assert_eq!(OrderId::from(7).get(), 7);
    }

    #[test]
    fn test_qr_tokens_are_unique() {
        let gen = UuidQrTokens;
        let a = gen.generate();
        let b = gen.generate();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_line_total() {
        let now = Utc::now();
        let line = OrderLine {
            id: LineId(1),
            order_id: OrderId(1),
            item_id: MenuItemId(10),
            name_snapshot: "Pad Thai".to_string(),
            quantity: 2,
            unit_price: Money::from_minor(12000),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(line.line_total().unwrap().to_minor(), 24000);
    }
}
