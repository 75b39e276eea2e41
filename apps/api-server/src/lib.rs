//! # Dine-in API
//!
//! HTTP server for the order lifecycle and settlement engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Server                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  tables        │  │  orders        │  │  revenue                   ││
//! │  │                │  │                │  │                            ││
//! │  │ • open order   │  │ • lines        │  │ • daily / monthly          ││
//! │  │ • current      │  │ • cancel       │  │ • ranges / hourly          ││
//! │  │ • QR resolve   │  │ • settle       │  │ • by method / top items    ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │          │                  │                       │                  │
//! │          └──────────────────┼───────────────────────┘                  │
//! │                             ▼                                          │
//! │                    Engine<S: Store>                                    │
//! │              PgStore in production, MemoryStore in tests               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the environment variables.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use dinein_db::Store;
use dinein_engine::Engine;

// Re-exports
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::HttpTimeouts;
pub use state::AppState;

/// Builds the application router over an engine.
pub fn app<S: Store>(engine: Engine<S>, timeouts: HttpTimeouts) -> Router {
    routes::build_router(AppState::new(engine), timeouts)
}
