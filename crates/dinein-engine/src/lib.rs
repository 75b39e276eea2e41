//! # dinein-engine: Order Lifecycle & Settlement
//!
//! Applies the dinein-core rules inside dinein-db transactions. Each public
//! operation is one transaction, re-run when the store reports a transient
//! failure or a lost uniqueness race.
//!
//! ## Services
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Engine<S>                                  │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────┐ ┌────────────────┐ ┌──────────┐ │
//! │  │ TableSessionGuard│ │ OrderService │ │ PaymentSettler │ │ Revenue  │ │
//! │  │  open_for        │ │  add_line    │ │  settle        │ │ Service  │ │
//! │  │  resolve_qr      │ │  update_line │ │  payment_for   │ │  daily   │ │
//! │  │  current_open_.. │ │  remove_line │ │                │ │  hourly  │ │
//! │  │                  │ │  merge_lines │ │                │ │  stats   │ │
//! │  │                  │ │  cancel, get │ │                │ │  ...     │ │
//! │  └────────┬─────────┘ └──────┬───────┘ └───────┬────────┘ └────┬─────┘ │
//! │           └──────────────────┴─────────┬───────┴───────────────┘       │
//! │                                        ▼                                │
//! │                              Arc<S: Store>                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use dinein_core::{PaymentMethod, TableId};
//! use dinein_db::MemoryStore;
//! use dinein_engine::{Engine, EngineConfig};
//!
//! # async fn run() -> Result<(), dinein_engine::EngineError> {
//! let engine = Engine::new(MemoryStore::new(), EngineConfig::default());
//! let opened = engine.sessions().open_for(TableId(5)).await?;
//! let settled = engine
//!     .payments()
//!     .settle(opened.order.id, PaymentMethod::Cash, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod orders;
pub mod retry;
pub mod revenue;
pub mod session;
pub mod settle;

use std::sync::Arc;

use dinein_core::RevenueZone;
use dinein_db::Store;

pub use error::{EngineError, EngineResult, ErrorKind};
pub use orders::{LinePatch, OrderService};
pub use revenue::RevenueService;
pub use session::{OpenedOrder, TableSessionGuard};
pub use settle::{PaymentSettler, Settlement};

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Zone for revenue day, month and hour boundaries.
    pub zone: RevenueZone,
    /// Runs per operation before a retryable error surfaces.
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            zone: RevenueZone::default(),
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// All engine services over one shared store.
pub struct Engine<S> {
    store: Arc<S>,
    sessions: TableSessionGuard<S>,
    orders: OrderService<S>,
    payments: PaymentSettler<S>,
    revenue: RevenueService<S>,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Engine {
            store: Arc::clone(&self.store),
            sessions: self.sessions.clone(),
            orders: self.orders.clone(),
            payments: self.payments.clone(),
            revenue: self.revenue.clone(),
        }
    }
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    pub fn from_arc(store: Arc<S>, config: EngineConfig) -> Self {
        let attempts = config.max_attempts;
        Engine {
            sessions: TableSessionGuard::new(Arc::clone(&store), attempts),
            orders: OrderService::new(Arc::clone(&store), attempts),
            payments: PaymentSettler::new(Arc::clone(&store), attempts),
            revenue: RevenueService::new(Arc::clone(&store), config.zone, attempts),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sessions(&self) -> &TableSessionGuard<S> {
        &self.sessions
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    pub fn payments(&self) -> &PaymentSettler<S> {
        &self.payments
    }

    pub fn revenue(&self) -> &RevenueService<S> {
        &self.revenue
    }
}
