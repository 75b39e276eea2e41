//! # Error Types
//!
//! Domain-specific error types for dinein-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dinein-core errors (this file)                                        │
//! │  ├── CoreError        - Money, enum, and order-rule failures           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dinein-db errors                                                      │
//! │  └── DbError          - Store failures (unique violation, transient)   │
//! │                                                                         │
//! │  dinein-engine errors                                                  │
//! │  └── EngineError      - Operation failures with an API error kind      │
//! │                                                                         │
//! │  api-server errors                                                     │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError → client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{OrderId, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A monetary value could not be constructed.
    ///
    /// ## When This Occurs
    /// - `Money::from_major` with a negative, NaN, or infinite float
    /// - A malformed decimal string on the wire
    #[error("Invalid money value '{input}': {reason}")]
    InvalidMoney { input: String, reason: String },

    /// Monetary arithmetic left the representable range.
    #[error("Monetary overflow")]
    Overflow,

    /// A string did not name any variant of an enumeration.
    #[error("Invalid {kind}: '{value}'")]
    InvalidEnum { kind: &'static str, value: String },

    /// The order is not open, so it cannot be mutated or settled.
    ///
    /// ## When This Occurs
    /// - Adding a line to a settled order
    /// - Cancelling an order twice
    /// - Settling a cancelled order
    #[error("Order {order_id} is {status}, not open")]
    OrderNotOpen {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A status change the state machine does not allow.
    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Settlement requested for an order whose total is zero.
    #[error("Order {0} has no billable lines")]
    EmptyOrder(OrderId),

    /// A payment already exists for the order with a different
    /// method or reference.
    #[error("Order {order_id} is already paid with a different method or reference")]
    PaymentConflict { order_id: OrderId },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidMoney error.
    pub fn invalid_money(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidMoney {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any transaction starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date, invalid time zone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OrderNotOpen {
            order_id: OrderId(42),
            status: OrderStatus::Closed,
        };
        assert_eq!(err.to_string(), "Order 42 is closed, not open");

        let err = CoreError::InvalidEnum {
            kind: "payment method",
            value: "cheque".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid payment method: 'cheque'");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::TooLong {
            field: "reference".to_string(),
            max: 128,
        };
        assert_eq!(err.to_string(), "reference must be at most 128 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "method".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
