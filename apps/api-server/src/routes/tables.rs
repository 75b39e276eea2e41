//! Table session endpoints.
//!
//! | Method | Path                        | Engine call            |
//! |--------|-----------------------------|------------------------|
//! | POST   | `/tables/{id}/orders`       | `open_for`             |
//! | GET    | `/tables/{id}/order`        | `current_open_order`   |
//! | GET    | `/tables/qr/{token}/order`  | `resolve_qr`           |
//!
//! Opening returns 200 whether the order was created or joined.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use dinein_core::{Order, TableId};
use dinein_db::Store;
use dinein_engine::EngineError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/tables/{id}/orders", post(open_order::<S>))
        .route("/tables/{id}/order", get(current_order::<S>))
        .route("/tables/qr/{token}/order", get(resolve_qr::<S>))
}

async fn open_order<S: Store>(
    State(state): State<AppState<S>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Order>> {
    let Path(id) = path?;
    let opened = state.engine.sessions().open_for(TableId(id)).await?;
    Ok(Json(opened.order))
}

async fn current_order<S: Store>(
    State(state): State<AppState<S>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Order>> {
    let Path(id) = path?;
    let table = TableId(id);
    let order = state
        .engine
        .sessions()
        .current_open_order(table)
        .await?
        .ok_or(EngineError::NoOpenOrder(table))?;
    Ok(Json(order))
}

async fn resolve_qr<S: Store>(
    State(state): State<AppState<S>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Order>> {
    let Path(token) = path?;
    let opened = state.engine.sessions().resolve_qr(&token).await?;
    Ok(Json(opened.order))
}
