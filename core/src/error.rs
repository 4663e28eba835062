//! Error taxonomy for order placement and persistence.
//!
//! [`StoreError`] is what storage implementations return. [`OrderError`] is
//! what callers of the engine see; every storage failure is translated into
//! one of its variants before it leaves the runtime.

use crate::types::{OrderId, OrderStatus, ProductId};
use std::fmt;
use thiserror::Error;

/// Kind of record a lookup was for
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// A catalog product
    Product,
    /// A customer's cart
    Cart,
    /// An order
    Order,
    /// A line inside a cart
    CartItem,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Product => "product",
            Self::Cart => "cart",
            Self::Order => "order",
            Self::CartItem => "cart item",
        })
    }
}

/// Errors raised by storage implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Record does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record
        resource: Resource,
        /// Identifier that was looked up
        id: String,
    },

    /// Record with this identifier already exists
    #[error("{resource} already exists: {id}")]
    Duplicate {
        /// Kind of record
        resource: Resource,
        /// Conflicting identifier
        id: String,
    },

    /// Transaction lost a race (serialization failure, deadlock, stale version).
    ///
    /// Retrying the whole transaction may succeed.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Connection or query failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::NotFound`]
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether retrying the transaction from the start may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Errors surfaced by the order engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Cart, order or product does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record
        resource: Resource,
        /// Identifier that was looked up
        id: String,
    },

    /// Placement attempted with an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Not enough stock for a product
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that ran short
        product_id: ProductId,
        /// Units requested
        requested: u32,
        /// Units available when checked
        available: u32,
    },

    /// Event not permitted from the order's current status
    #[error("Illegal transition for order {order_id}: {event} not allowed from {from}")]
    IllegalTransition {
        /// Order the event was applied to
        order_id: OrderId,
        /// Status the order was in
        from: OrderStatus,
        /// Rejected event
        event: String,
    },

    /// Retries exhausted, deadline hit or storage failure mid-transaction
    #[error("Reconciliation failed after {attempts} attempt(s): {reason}")]
    ReconciliationFailed {
        /// Attempts made
        attempts: u32,
        /// Last failure
        reason: String,
    },

    /// Transient storage contention, retried internally before surfacing
    #[error("Transaction conflict: {0}")]
    Contention(String),

    /// Order with this identifier already exists
    #[error("Order already exists: {0}")]
    Conflict(OrderId),

    /// Malformed input (bad quantity, missing cart line, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected storage failure
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl OrderError {
    /// Convenience constructor for [`OrderError::NotFound`]
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether the operation may succeed if retried from the start.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_))
    }

    /// Short label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::ReconciliationFailed { .. } => "reconciliation_failed",
            Self::Contention(_) => "contention",
            Self::Conflict(_) => "conflict",
            Self::InvalidRequest(_) => "invalid_request",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { resource, id } => Self::NotFound { resource, id },
            StoreError::Duplicate { id, .. } => match id.parse() {
                Ok(order_id) => Self::Conflict(order_id),
                Err(_) => Self::PersistenceFailure(format!("duplicate record: {id}")),
            },
            StoreError::Conflict(reason) => Self::Contention(reason),
            StoreError::Database(reason) => Self::PersistenceFailure(reason),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(StoreError::Conflict("deadlock".into()).is_retryable());
        assert!(!StoreError::Database("down".into()).is_retryable());
        assert!(!StoreError::not_found(Resource::Order, "x").is_retryable());
    }

    #[test]
    fn store_errors_translate_to_order_errors() {
        let order_id = OrderId::new();
        let dup = StoreError::Duplicate {
            resource: Resource::Order,
            id: order_id.to_string(),
        };
        assert_eq!(OrderError::from(dup), OrderError::Conflict(order_id));

        let err = OrderError::from(StoreError::Conflict("serialization failure".into()));
        assert!(err.is_retryable());

        let err = OrderError::from(StoreError::Database("connection reset".into()));
        assert_eq!(err.kind(), "persistence_failure");
    }

    #[test]
    fn insufficient_stock_message_names_product_and_counts() {
        let product_id = ProductId::new();
        let err = OrderError::InsufficientStock {
            product_id,
            requested: 3,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains(&product_id.to_string()));
        assert!(msg.contains("requested 3"));
        assert!(msg.contains("available 1"));
    }
}
