//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler ── Result<T, ApiError>                                         │
//! │     │                                                                   │
//! │     ├── bad JSON / path / query ──► ApiError::validation ─► 400         │
//! │     │                                                                   │
//! │     ├── EngineError ── kind() ──┬── NotFound   ─► 404                   │
//! │     │                           ├── Validation ─► 400                   │
//! │     │                           ├── Conflict   ─► 409                   │
//! │     │                           ├── Transient  ─► 503                   │
//! │     │                           └── Internal   ─► 500 (detail logged,   │
//! │     │                                              not returned)        │
//! │     ▼                                                                   │
//! │  { "code": "CONFLICT", "message": "Order 42 is closed" }                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! 5xx responses are logged at error level and 4xx at info level, inside
//! the request's trace span so the `x-request-id` travels with them.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use dinein_core::ValidationError;
use dinein_engine::{EngineError, ErrorKind};

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Order 42 not found"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Request conflicts with the current state (409)
    Conflict,

    /// Store temporarily unavailable; retry advised (503)
    Unavailable,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Converts engine errors to API errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ApiError::new(ErrorCode::NotFound, err.to_string()),
            ErrorKind::Validation => ApiError::validation(err.to_string()),
            ErrorKind::Conflict => ApiError::new(ErrorCode::Conflict, err.to_string()),
            ErrorKind::Transient => {
                tracing::warn!(error = %err, "Store unavailable after retries");
                ApiError::new(
                    ErrorCode::Unavailable,
                    "Service temporarily unavailable, please retry",
                )
            }
            ErrorKind::Internal => {
                // Log the actual error but return a generic message
                tracing::error!(error = %err, "Internal engine error");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = ?self.code, message = %self.message, "Request failed");
        } else {
            tracing::info!(status = status.as_u16(), code = ?self.code, message = %self.message, "Request rejected");
        }
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use dinein_core::{CoreError, OrderId, OrderStatus};
    use dinein_db::DbError;

    #[test]
    fn test_engine_error_mapping() {
        let not_open = ApiError::from(EngineError::from(CoreError::OrderNotOpen {
            order_id: OrderId(42),
            status: OrderStatus::Closed,
        }));
        assert_eq!(not_open.status(), StatusCode::CONFLICT);

        let missing = ApiError::from(EngineError::OrderNotFound(OrderId(7)));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "Order 7 not found");

        let transient = ApiError::from(EngineError::from(DbError::Transient("40001".into())));
        assert_eq!(transient.status(), StatusCode::SERVICE_UNAVAILABLE);

        let internal = ApiError::from(EngineError::from(DbError::Internal("disk on fire".into())));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("disk"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::new(ErrorCode::NotFound, "Table 3 not found");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": "NOT_FOUND", "message": "Table 3 not found" })
        );
    }
}
