//! # Order Engine Core
//!
//! Domain types, collaborator traits and the pure pieces of order placement.
//!
//! This crate owns everything that does not touch a database, a clock or a
//! network socket directly. Side effects are reached through traits that the
//! `order-engine-postgres` and `order-engine-testing` crates implement, and
//! time and identifiers are injected through the [`environment`] module.
//!
//! ## Placement Pipeline
//!
//! 1. [`cart::CartSnapshotReader`] freezes the customer's cart
//! 2. [`availability::AvailabilityChecker`] performs the advisory stock check
//! 3. [`assembler::OrderAssembler`] builds the order with captured prices
//! 4. The reconciler (runtime crate) decrements stock and persists atomically
//!
//! After placement the [`state_machine`] module is the only place that decides
//! which status changes are legal and when stock has to be credited back.
//!
//! ## Example
//!
//! ```ignore
//! use order_engine_core::{AvailabilityChecker, CartSnapshotReader, OrderAssembler};
//!
//! let snapshot = CartSnapshotReader::new().read(&store, customer_id).await?;
//! AvailabilityChecker::new().check(&store, &snapshot).await?;
//! let draft = OrderAssembler::new().assemble(customer_id, &snapshot, address, &ids, &clock)?;
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod assembler;
pub mod availability;
pub mod cart;
pub mod error;
pub mod state_machine;
pub mod store;
pub mod types;

pub use assembler::{OrderAssembler, OrderDraft};
pub use availability::AvailabilityChecker;
pub use cart::{Cart, CartItem, CartSnapshot, CartSnapshotReader};
pub use error::{OrderError, Resource, StoreError};
pub use state_machine::{OrderEvent, StockCredit, Transition};
pub use store::{
    CartStore, Catalog, CommerceStore, LockedOrder, OrderReader, StoreFuture, StoreTransaction,
    UnitOfWork,
};
pub use types::{
    CartId, CustomerId, Money, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
    OrderStatusChange, Page, PageRequest, PaymentStatus, Product, ProductId, ProductStatus,
    ShippingAddress,
};

/// Environment module - injected dependencies for deterministic logic
///
/// Everything that would make placement non-deterministic (wall clock time,
/// random identifiers) lives behind a trait here so tests can pin it down.
pub mod environment {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = test_clock();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Identifier source for orders and their line items.
    pub trait IdGenerator: Send + Sync {
        /// Produce the next unique identifier
        fn next_id(&self) -> Uuid;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Random v4 UUID generator.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIdGenerator;

    impl IdGenerator for RandomIdGenerator {
        fn next_id(&self) -> Uuid {
            Uuid::new_v4()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::environment::{Clock, IdGenerator, RandomIdGenerator, SystemClock};

    #[test]
    fn random_ids_are_distinct() {
        let ids = RandomIdGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
