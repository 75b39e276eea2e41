//! # Validation Module
//!
//! Input validation utilities for the dine-in POS backend.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (axum)                                       │
//! │  ├── JSON shape, path ids, query strings                               │
//! │  └── Malformed input → 400 before any service runs                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine services                                              │
//! │  └── THIS MODULE: quantity, notes, references, dates, limits           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                        │
//! │  ├── CHECK constraints (quantity > 0, amount > 0)                      │
//! │  ├── UNIQUE constraints (one open order, one payment)                  │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dinein_core::validation::{normalize_notes, validate_quantity};
//!
//! assert_eq!(validate_quantity(2).unwrap(), 2);
//! assert_eq!(normalize_notes(Some("  no ice ")).unwrap().as_deref(), Some("no ice"));
//! assert_eq!(normalize_notes(Some("   ")).unwrap(), None);
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;
use crate::{DEFAULT_TOP_ITEMS, MAX_LINE_QUANTITY, MAX_NOTES_LEN, MAX_REFERENCE_LEN, MAX_TOP_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Ordering screen: Add Item                                              │
/// │                                                                         │
/// │  Guest picks quantity: 2                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → 400 "quantity must be positive"                 │
/// │       │                                                                 │
/// │       ├── qty > 999? → 400 "quantity must be between 1 and 999"        │
/// │       │                                                                 │
/// │       └── OK → line is inserted                                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<i32> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > i64::from(MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(MAX_LINE_QUANTITY),
        });
    }

    // Bounded above by MAX_LINE_QUANTITY, so this always fits.
    Ok(qty as i32)
}

/// Validates the `limit` of a top-items query.
///
/// Absent means [`DEFAULT_TOP_ITEMS`]; anything above [`MAX_TOP_ITEMS`] is
/// capped rather than rejected.
pub fn validate_limit(limit: Option<i64>) -> ValidationResult<usize> {
    match limit {
        None => Ok(DEFAULT_TOP_ITEMS),
        Some(n) if n < 1 => Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_TOP_ITEMS as i64,
        }),
        Some(n) => Ok((n as u64).min(MAX_TOP_ITEMS as u64) as usize),
    }
}

/// Validates a calendar month.
pub fn validate_month(year: i32, month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }

    if !(1..=9999).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 1,
            max: 9999,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Trims free text; blank becomes `None`; longer than `max` characters fails.
fn normalize_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(value.to_string()))
}

/// Normalizes line or order notes (at most 500 characters).
pub fn normalize_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    normalize_text("notes", notes, MAX_NOTES_LEN)
}

/// Normalizes a payment reference (approval code, transaction id).
///
/// The content is opaque; only the length is bounded (128 characters).
pub fn normalize_reference(reference: Option<&str>) -> ValidationResult<Option<String>> {
    normalize_text("reference", reference, MAX_REFERENCE_LEN)
}

// =============================================================================
// Date Validators
// =============================================================================

/// A revenue query bound as the caller wrote it.
///
/// A bare date means local midnight in the revenue zone; resolving it needs
/// the zone, which this crate leaves to [`crate::revenue::RevenueZone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrInstant {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// ## Example
/// ```rust
/// use dinein_core::validation::parse_date;
///
/// assert!(parse_date("date", "2025-01-15").is_ok());
/// assert!(parse_date("date", "2025-02-30").is_err());
/// assert!(parse_date("date", "15/01/2025").is_err());
/// ```
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected YYYY-MM-DD ({e})"),
        }
    })
}

/// Parses either a `YYYY-MM-DD` date or an RFC 3339 instant.
pub fn parse_date_or_instant(field: &str, value: &str) -> ValidationResult<DateOrInstant> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(DateOrInstant::Date(date));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| DateOrInstant::Instant(dt.with_timezone(&Utc)))
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
