//! Error types for web handlers.
//!
//! [`AppError`] bridges [`OrderError`] and malformed requests to HTTP
//! responses. The body is always `{ "code": ..., "message": ... }`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use order_engine_core::error::OrderError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Order>, AppError> {
///     let order = state.orders.get_order(id).await?;
///     Ok(Json(order))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// HTTP status this error responds with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Map engine errors to HTTP statuses.
///
/// Messages of client errors are passed through; storage failures are
/// logged with their detail and reported generically.
impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let status = match &err {
            OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::InsufficientStock { .. }
            | OrderError::IllegalTransition { .. }
            | OrderError::Conflict(_) => StatusCode::CONFLICT,
            OrderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OrderError::ReconciliationFailed { .. } | OrderError::Contention(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            OrderError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = err.kind().to_ascii_uppercase();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let message = "An internal error occurred".to_string();
            return Self::new(status, message, code).with_source(anyhow::Error::new(err));
        }
        Self::new(status, err.to_string(), code)
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use order_engine_core::error::Resource;
    use order_engine_core::types::{OrderId, OrderStatus, ProductId};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn order_errors_map_to_statuses() {
        let cases = [
            (OrderError::not_found(Resource::Order, "x"), StatusCode::NOT_FOUND),
            (OrderError::EmptyCart, StatusCode::UNPROCESSABLE_ENTITY),
            (
                OrderError::InsufficientStock {
                    product_id: ProductId::new(),
                    requested: 2,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                OrderError::IllegalTransition {
                    order_id: OrderId::new(),
                    from: OrderStatus::Delivered,
                    event: "AdminCancel".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (OrderError::Conflict(OrderId::new()), StatusCode::CONFLICT),
            (OrderError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (
                OrderError::ReconciliationFailed {
                    attempts: 4,
                    reason: "deadline exceeded".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                OrderError::PersistenceFailure("connection reset".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let kind = err.kind();
            let app = AppError::from(err);
            assert_eq!(app.status(), expected, "{kind}");
            assert_eq!(app.code(), kind.to_ascii_uppercase());
        }
    }

    #[test]
    fn persistence_detail_is_not_exposed() {
        let app = AppError::from(OrderError::PersistenceFailure("password=hunter2".to_string()));
        assert!(!app.to_string().contains("hunter2"));
        assert!(std::error::Error::source(&app).is_some());
    }

    #[test]
    fn insufficient_stock_message_reaches_the_client() {
        let product_id = ProductId::new();
        let app = AppError::from(OrderError::InsufficientStock {
            product_id,
            requested: 3,
            available: 0,
        });
        assert!(app.to_string().contains(&product_id.to_string()));
    }
}
