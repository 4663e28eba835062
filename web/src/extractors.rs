//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `AuthenticatedCustomer`: the customer the authentication layer vouched for
//!
//! # Examples
//!
//! ```ignore
//! use order_engine_web::extractors::{AuthenticatedCustomer, CorrelationId};
//!
//! async fn handler(
//!     State(state): State<AppState>,
//!     correlation_id: CorrelationId,
//!     AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
//! ) -> Result<Json<Cart>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, %customer_id, "Loading cart");
//!     Ok(Json(state.carts.get_or_create_cart(customer_id).await?))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use order_engine_core::types::CustomerId;
use uuid::Uuid;

/// Header carrying the authenticated customer id.
///
/// Set by the authentication collaborator in front of this service; requests
/// reaching the engine are trusted to carry the right value.
pub const CUSTOMER_ID_HEADER: &str = "X-Customer-ID";

/// Correlation ID for request tracing.
///
/// Uses the id stored by [`correlation_id_layer`](crate::middleware::correlation_id_layer),
/// then the `X-Correlation-ID` header, and finally generates a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The customer a request acts for, read from `X-Customer-ID`.
///
/// Rejects with 401 when the header is missing or not a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedCustomer(pub CustomerId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCustomer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing X-Customer-ID header"))?;

        raw.to_str()
            .ok()
            .and_then(|s| s.trim().parse::<CustomerId>().ok())
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("Invalid X-Customer-ID header"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, _) = req.into_parts();
        parts.extensions.insert(CorrelationId(stored));
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let req = Request::builder().body(()).expect("Valid request");

        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_customer_from_header() {
        let customer = CustomerId::new();
        let req = Request::builder()
            .header(CUSTOMER_ID_HEADER, customer.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, _) = req.into_parts();
        let extracted = AuthenticatedCustomer::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(extracted, AuthenticatedCustomer(customer));
    }

    #[tokio::test]
    async fn test_customer_missing_or_garbage_is_unauthorized() {
        for req in [
            Request::builder().body(()).expect("Valid request"),
            Request::builder()
                .header(CUSTOMER_ID_HEADER, "customer-42")
                .body(())
                .expect("Valid request"),
        ] {
            let (mut parts, _) = req.into_parts();
            let err = AuthenticatedCustomer::from_request_parts(&mut parts, &())
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
