//! # Order Engine Runtime
//!
//! Imperative shell around the pure pieces in `order-engine-core`.
//!
//! ## Core Components
//!
//! - **`OrderService`**: places orders from carts under a deadline, reads and
//!   lists orders, applies lifecycle events
//! - **`InventoryReconciler`**: reserves stock and commits the order in one
//!   transaction, retrying transient contention
//! - **`OrderStore`**: the persistence boundary; status changes always pass
//!   through the state machine
//! - **`PaymentEventHandler`**: applies at-least-once payment outcomes
//! - **`CartService`**: cart mutation
//! - **`StockService`**: product lookup and administrative stock edits
//!
//! ## Example
//!
//! ```ignore
//! use order_engine_runtime::{OrderService, OrderServiceConfig};
//!
//! let service = OrderService::new(store, ids, clock, OrderServiceConfig::default());
//! let order = service.create_order(customer_id, shipping_address).await?;
//! ```

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Atomic stock reservation and order commit
pub mod reconciler;

/// Order persistence boundary
pub mod order_store;

/// Payment event intake
pub mod payment;

/// Cart mutation
pub mod cart_service;

/// Order operations
pub mod service;

/// Administrative stock edits
pub mod stock;

pub use cart_service::CartService;
pub use order_store::OrderStore;
pub use payment::{PaymentEvent, PaymentEventHandler, PaymentEventKind};
pub use reconciler::InventoryReconciler;
pub use retry::RetryPolicy;
pub use service::{OrderService, OrderServiceConfig};
pub use stock::{StockAdjustment, StockService};
