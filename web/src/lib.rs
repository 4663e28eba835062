//! Axum HTTP surface for the order engine.
//!
//! Handlers are thin: they extract the caller and the payload, call one
//! runtime service, and map the outcome to a status code through
//! [`AppError`].
//!
//! # Request Flow
//!
//! 1. [`middleware::correlation_id_layer`] opens an `http_request` span
//! 2. Extractors resolve the [`extractors::AuthenticatedCustomer`] and body
//! 3. The handler calls `OrderService`, `CartService` or `PaymentEventHandler`
//! 4. `OrderError` becomes a JSON error body with the matching status
//!
//! # Example
//!
//! ```ignore
//! use order_engine_web::{build_router, AppState};
//!
//! let state = AppState::new(store, ids, clock, config.order_service(), readiness);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use extractors::{AuthenticatedCustomer, CorrelationId, CUSTOMER_ID_HEADER};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::{AppState, ReadinessCheck};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
