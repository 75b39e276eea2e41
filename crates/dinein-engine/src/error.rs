//! # Engine Errors
//!
//! Every failure an engine operation can report, with the API error kind it
//! maps to.
//!
//! ## Kind Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind     HTTP   Variants                                          │
//! │  ───────────   ────   ─────────────────────────────────────────────     │
//! │  NotFound      404    TableNotFound, QrUnknown, OrderNotFound,          │
//! │                       LineNotFound, ItemNotFound, NoOpenOrder,          │
//! │                       PaymentNotFound, DbError::NotFound                │
//! │  Validation    400    CoreError::{Validation, InvalidEnum,              │
//! │                       InvalidMoney, Overflow}                           │
//! │  Conflict      409    TableInactive, ItemInactive, PaymentExists,       │
//! │                       CoreError::{OrderNotOpen, InvalidTransition,      │
//! │                       EmptyOrder, PaymentConflict},                     │
//! │                       DbError::{UniqueViolation, ForeignKeyViolation}   │
//! │  Transient     503    DbError::Transient                                │
//! │  Internal      500    everything else                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use dinein_core::{CoreError, LineId, MenuItemId, OrderId, TableId, ValidationError};
use dinein_db::DbError;

/// Broad category of an engine error, as clients see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Transient,
    Internal,
}

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Table {0} not found")]
    TableNotFound(TableId),

    /// The table exists but is not hosting orders.
    #[error("Table {0} is inactive")]
    TableInactive(TableId),

    #[error("QR token does not match any table")]
    QrUnknown,

    #[error("No open order for table {0}")]
    NoOpenOrder(TableId),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The line does not exist, or belongs to another order.
    #[error("Line {line_id} not found on order {order_id}")]
    LineNotFound { order_id: OrderId, line_id: LineId },

    #[error("Menu item {0} not found")]
    ItemNotFound(MenuItemId),

    #[error("Menu item {0} is not available")]
    ItemInactive(MenuItemId),

    #[error("Order {0} has no payment")]
    PaymentNotFound(OrderId),

    /// Cancelling an order that has already been paid.
    #[error("Order {0} has a payment and cannot be cancelled")]
    PaymentExists(OrderId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TableNotFound(_)
            | EngineError::QrUnknown
            | EngineError::NoOpenOrder(_)
            | EngineError::OrderNotFound(_)
            | EngineError::LineNotFound { .. }
            | EngineError::ItemNotFound(_)
            | EngineError::PaymentNotFound(_) => ErrorKind::NotFound,

            EngineError::TableInactive(_)
            | EngineError::ItemInactive(_)
            | EngineError::PaymentExists(_) => ErrorKind::Conflict,

            EngineError::Core(err) => match err {
                CoreError::Validation(_)
                | CoreError::InvalidEnum { .. }
                | CoreError::InvalidMoney { .. }
                | CoreError::Overflow => ErrorKind::Validation,
                CoreError::OrderNotOpen { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::EmptyOrder(_)
                | CoreError::PaymentConflict { .. } => ErrorKind::Conflict,
            },

            EngineError::Store(err) => match err {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    ErrorKind::Conflict
                }
                DbError::Transient(_) => ErrorKind::Transient,
                DbError::MigrationFailed(_) | DbError::Internal(_) => ErrorKind::Internal,
            },
        }
    }

    /// Whether re-running the whole transaction may succeed.
    ///
    /// Unique violations qualify: the re-run reads the row the competing
    /// transaction committed and takes the idempotent path.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Store(DbError::Transient(_) | DbError::UniqueViolation { .. })
        )
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dinein_core::OrderStatus;

    #[test]
    fn test_kinds() {
        assert_eq!(EngineError::QrUnknown.kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::TableInactive(TableId(5)).kind(), ErrorKind::Conflict);
        assert_eq!(
            EngineError::from(CoreError::OrderNotOpen {
                order_id: OrderId(42),
                status: OrderStatus::Closed,
            })
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::from(ValidationError::MustBePositive {
                field: "quantity".to_string()
            })
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::from(DbError::Transient("40001".to_string())).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            EngineError::from(DbError::Internal("boom".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::from(DbError::Transient("x".to_string())).is_retryable());
        assert!(EngineError::from(DbError::unique("payments_order_id_key")).is_retryable());
        assert!(!EngineError::from(CoreError::EmptyOrder(OrderId(1))).is_retryable());
        assert!(!EngineError::OrderNotFound(OrderId(1)).is_retryable());
    }
}
