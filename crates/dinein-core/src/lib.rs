//! # dinein-core: Pure Business Logic for the Dine-in POS
//!
//! This crate is the **heart** of the order lifecycle and settlement engine.
//! It contains the business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dine-in POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Clients (admin tools, QR ordering screens)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP /api/v1                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    api-server (axum)                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dinein-engine                                │   │
//! │  │    table sessions, orders, settlement, revenue                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dinein-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ │   │
//! │  │   │  types  │ │  money  │ │  order  │ │ revenue │ │validation│ │   │
//! │  │   │ Order   │ │  Money  │ │ totals  │ │ buckets │ │  rules  │ │   │
//! │  │   │ Payment │ │         │ │ merging │ │  zone   │ │         │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dinein-db (Storage Layer)                    │   │
//! │  │              Store contract, PostgreSQL, in-memory              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (DiningTable, Order, OrderLine, Payment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Order state checks, totals, line merging, settlement replay
//! - [`revenue`] - Revenue zone, intervals, and aggregations
//! - [`clock`] - Time sources for stores that stamp their own rows
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dinein_core::money::Money;
//!
//! // Prices are minor units (satang)
//! let pad_thai = Money::from_minor(12000);  // ฿120.00
//! let tea = Money::from_minor(5550);        // ฿55.50
//!
//! let total = pad_thai.mul_by_qty(2).unwrap().checked_add(tea).unwrap();
//! assert_eq!(total.to_string(), "295.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod money;
pub mod order;
pub mod revenue;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use dinein_core::Money` instead of
// `use dinein_core::money::Money`

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use revenue::{Interval, RevenueZone};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Also caps the result of merging duplicate lines.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Maximum length of a payment reference, in characters
pub const MAX_REFERENCE_LEN: usize = 128;

/// Maximum length of order or line notes, in characters
pub const MAX_NOTES_LEN: usize = 500;

/// Top-items rows returned when the caller gives no limit
pub const DEFAULT_TOP_ITEMS: usize = 10;

/// Upper bound on the top-items limit
pub const MAX_TOP_ITEMS: usize = 100;
