//! Order, line and payment endpoints.
//!
//! | Method | Path                               | Success             |
//! |--------|------------------------------------|---------------------|
//! | GET    | `/orders/{id}`                     | 200 order + lines   |
//! | PATCH  | `/orders/{id}`                     | 200 (notes)         |
//! | POST   | `/orders/{id}/items`               | 201 line            |
//! | POST   | `/orders/{id}/items/merge`         | 200 order + lines   |
//! | PATCH  | `/orders/{id}/items/{line_id}`     | 200 line            |
//! | DELETE | `/orders/{id}/items/{line_id}`     | 204                 |
//! | POST   | `/orders/{id}/cancel`              | 200 order           |
//! | POST   | `/orders/{id}/payment`             | 201, replay 200     |
//! | GET    | `/orders/{id}/payment`             | 200, 404 if unpaid  |

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use http::StatusCode;

use dinein_core::{LineId, Order, OrderId, OrderLine, OrderView, Payment};
use dinein_db::Store;
use dinein_engine::{EngineError, LinePatch};

use crate::error::ApiResult;
use crate::routes::dto::{AddLineRequest, SetNotesRequest, SettleRequest};
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/orders/{id}", get(get_order::<S>).patch(set_notes::<S>))
        .route("/orders/{id}/items", post(add_line::<S>))
        .route("/orders/{id}/items/merge", post(merge_lines::<S>))
        .route(
            "/orders/{id}/items/{line_id}",
            patch(update_line::<S>).delete(remove_line::<S>),
        )
        .route("/orders/{id}/cancel", post(cancel::<S>))
        .route(
            "/orders/{id}/payment",
            post(settle::<S>).get(payment_for::<S>),
        )
}

type OrderPath = Result<Path<i64>, PathRejection>;
type LinePath = Result<Path<(i64, i64)>, PathRejection>;

async fn get_order<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
) -> ApiResult<Json<OrderView>> {
    let Path(id) = path?;
    Ok(Json(state.engine.orders().get(OrderId(id)).await?))
}

async fn set_notes<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
    body: Result<Json<SetNotesRequest>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let Path(id) = path?;
    let Json(req) = body?;
    let order = state
        .engine
        .orders()
        .set_notes(OrderId(id), req.notes.as_deref())
        .await?;
    Ok(Json(order))
}

async fn add_line<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
    body: Result<Json<AddLineRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderLine>)> {
    let Path(id) = path?;
    let Json(req) = body?;
    let line = state
        .engine
        .orders()
        .add_line(OrderId(id), req.item_id, req.quantity, req.notes.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn merge_lines<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
) -> ApiResult<Json<OrderView>> {
    let Path(id) = path?;
    Ok(Json(state.engine.orders().merge_lines(OrderId(id)).await?))
}

async fn update_line<S: Store>(
    State(state): State<AppState<S>>,
    path: LinePath,
    body: Result<Json<LinePatch>, JsonRejection>,
) -> ApiResult<Json<OrderLine>> {
    let Path((id, line_id)) = path?;
    let Json(patch) = body?;
    let line = state
        .engine
        .orders()
        .update_line(OrderId(id), LineId(line_id), patch)
        .await?;
    Ok(Json(line))
}

async fn remove_line<S: Store>(
    State(state): State<AppState<S>>,
    path: LinePath,
) -> ApiResult<StatusCode> {
    let Path((id, line_id)) = path?;
    state
        .engine
        .orders()
        .remove_line(OrderId(id), LineId(line_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
) -> ApiResult<Json<Order>> {
    let Path(id) = path?;
    Ok(Json(state.engine.orders().cancel(OrderId(id)).await?))
}

async fn settle<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let Path(id) = path?;
    let Json(req) = body?;
    let method = req.method()?;
    let settled = state
        .engine
        .payments()
        .settle(OrderId(id), method, req.reference.as_deref())
        .await?;

    let status = if settled.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(settled.payment)))
}

async fn payment_for<S: Store>(
    State(state): State<AppState<S>>,
    path: OrderPath,
) -> ApiResult<Json<Payment>> {
    let Path(id) = path?;
    let order_id = OrderId(id);
    let payment = state
        .engine
        .payments()
        .payment_for(order_id)
        .await?
        .ok_or(EngineError::PaymentNotFound(order_id))?;
    Ok(Json(payment))
}
