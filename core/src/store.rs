//! Storage traits for the catalog, carts and orders.
//!
//! Reads that do not need isolation go through [`Catalog`], [`CartStore`]
//! and [`OrderReader`]. Anything that must be atomic (stock decrements,
//! order inserts, status changes with compensation) happens inside a
//! [`StoreTransaction`] obtained from [`UnitOfWork::begin`].
//!
//! # Implementations
//!
//! - `PostgresCommerceStore` (in `order-engine-postgres`): production
//! - `InMemoryCommerceStore` (in `order-engine-testing`): deterministic tests
//!   with fault injection
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! store can be shared as `Arc<dyn CommerceStore>` by the service layer.

use crate::cart::Cart;
use crate::error::StoreError;
use crate::types::{CustomerId, Order, OrderId, Page, PageRequest, Product, ProductId};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every storage operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Product catalog and stock ledger.
pub trait Catalog: Send + Sync {
    /// Load a product with its committed stock level.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no product with this id
    /// - `Database`: query failed
    fn get_product(&self, product_id: ProductId) -> StoreFuture<'_, Product>;

    /// Decrement stock only if at least `quantity` units are on hand.
    ///
    /// Runs in its own short transaction. Returns `false` (and changes
    /// nothing) when stock is short or the product does not exist.
    ///
    /// # Errors
    ///
    /// - `Database`: query failed
    fn conditional_decrement_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool>;

    /// Return units to stock.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no product with this id
    /// - `Database`: query failed
    fn credit_stock(&self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()>;
}

/// Persistence of shopping carts.
pub trait CartStore: Send + Sync {
    /// Load the cart owned by a customer.
    ///
    /// # Errors
    ///
    /// - `NotFound`: customer has no cart
    /// - `Database`: query failed
    fn get_cart_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Cart>;

    /// Insert or replace a cart together with its lines.
    ///
    /// # Errors
    ///
    /// - `Database`: write failed
    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()>;
}

/// Read access to committed orders.
pub trait OrderReader: Send + Sync {
    /// Load an order with its items and status history.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no order with this id
    /// - `Database`: query failed
    fn get_order(&self, order_id: OrderId) -> StoreFuture<'_, Order>;

    /// List a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// - `Database`: query failed
    fn list_orders_by_customer(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> StoreFuture<'_, Page<Order>>;
}

/// An order loaded for modification, with the version it was read at.
#[derive(Clone, Debug)]
pub struct LockedOrder {
    /// The order as currently committed
    pub order: Order,
    /// Row version, checked again when the change is saved
    pub version: i64,
}

/// A single storage transaction.
///
/// Nothing done through a transaction is visible to other readers until
/// [`commit`](StoreTransaction::commit) succeeds. Dropping a transaction
/// without committing rolls it back.
pub trait StoreTransaction: Send {
    /// Conditional decrement inside this transaction.
    ///
    /// Returns `false` without changing anything when fewer than `quantity`
    /// units are available or the product does not exist.
    ///
    /// # Errors
    ///
    /// - `Conflict`: lost a race with another transaction
    /// - `Database`: query failed
    fn conditional_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool>;

    /// Units currently available to this transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no product with this id
    /// - `Database`: query failed
    fn available_stock(&mut self, product_id: ProductId) -> StoreFuture<'_, u32>;

    /// Return units to stock inside this transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no product with this id
    /// - `Database`: query failed
    fn credit_stock(&mut self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()>;

    /// Insert a new order with its items.
    ///
    /// # Errors
    ///
    /// - `Duplicate`: an order with this id already exists
    /// - `Database`: write failed
    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, ()>;

    /// Load an order for a status change.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no order with this id
    /// - `Database`: query failed
    fn load_order_for_update(&mut self, order_id: OrderId) -> StoreFuture<'_, LockedOrder>;

    /// Persist a new status, payment status and the latest history entry.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the order changed since it was loaded at `expected_version`
    /// - `Database`: write failed
    fn save_order_status(&mut self, order: Order, expected_version: i64) -> StoreFuture<'_, ()>;

    /// Make every change visible atomically.
    ///
    /// # Errors
    ///
    /// - `Conflict`: serialization failure, the transaction must be retried
    /// - `Database`: commit failed, nothing was applied
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard every change.
    ///
    /// # Errors
    ///
    /// - `Database`: rollback failed (the connection is discarded)
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// Source of transactions.
pub trait UnitOfWork: Send + Sync {
    /// Open a new transaction.
    ///
    /// # Errors
    ///
    /// - `Database`: no connection available
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>>;
}

/// Everything the order engine needs from storage.
pub trait CommerceStore: Catalog + CartStore + OrderReader + UnitOfWork {}

impl<T> CommerceStore for T where T: Catalog + CartStore + OrderReader + UnitOfWork {}
