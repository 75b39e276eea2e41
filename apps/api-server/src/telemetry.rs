//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the default filter. Production output is one JSON
//! object per event; development output is the pretty formatter.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,dinein=debug,tower_http=info";

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if production {
        builder.json().with_current_span(true).init();
    } else {
        builder.pretty().init();
    }
}
