//! Health check endpoint

use axum::extract::State;
use axum::Json;
use http::StatusCode;

use dinein_db::Store;

use crate::state::AppState;

pub async fn health<S: Store>(State(state): State<AppState<S>>) -> (StatusCode, Json<serde_json::Value>) {
    match state.engine.store().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "dinein-api",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "service": "dinein-api",
                })),
            )
        }
    }
}
