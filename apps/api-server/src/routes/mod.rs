//! # HTTP Routes
//!
//! ## Middleware Stack (outermost first)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SetRequestId        x-request-id = uuid v4 unless the client sent one  │
//! │  PropagateRequestId  copies x-request-id onto the response              │
//! │  Trace               span per request, carrying the request id          │
//! │  Timeout             whole-request deadline (SERVER_WRITE_TIMEOUT);     │
//! │                      dropping the handler rolls its transaction back    │
//! │  RequestBodyTimeout  body read deadline (SERVER_READ_TIMEOUT)           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  /health             store reachability                                 │
//! │  /api/v1/tables/..   table sessions                                     │
//! │  /api/v1/orders/..   lines, cancel, settlement                          │
//! │  /api/v1/revenue/..  reports                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod health;
pub mod orders;
pub mod revenue;
pub mod tables;

use std::time::Duration;

use axum::body::Body;
use axum::routing::get;
use axum::Router;
use http::{HeaderValue, Request, StatusCode};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use dinein_db::Store;

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Receiving the request body
    pub read: Duration,
    /// The whole request, handler included
    pub write: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        HttpTimeouts {
            read: Duration::from_secs(10),
            write: Duration::from_secs(30),
        }
    }
}

/// Uuid v4 request ids.
#[derive(Clone, Copy)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Builds the `/api/v1` routes without middleware or state.
pub fn api_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .merge(tables::router::<S>())
        .merge(orders::router::<S>())
        .merge(revenue::router::<S>())
}

/// Builds the complete application with middleware and state.
pub fn build_router<S: Store>(state: AppState<S>, timeouts: HttpTimeouts) -> Router {
    Router::new()
        .nest("/api/v1", api_routes::<S>())
        .route("/health", get(health::health::<S>))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(XRequestId))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeouts.write,
                ))
                .layer(RequestBodyTimeoutLayer::new(timeouts.read)),
        )
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::new(ErrorCode::NotFound, "No such route")
}
