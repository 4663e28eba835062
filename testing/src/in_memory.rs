//! In-memory commerce store for fast, deterministic tests.
//!
//! [`InMemoryCommerceStore`] implements every storage trait the engine
//! needs, including real transaction semantics:
//!
//! - Stock decremented inside a transaction is *held*: other transactions
//!   cannot take it, but readers still see the committed level until commit
//! - Credits, order inserts and status changes are buffered and applied
//!   together on commit
//! - Rolling back, or dropping the transaction, releases every hold
//!
//! Fault injection ([`fail_next_commits`](InMemoryCommerceStore::fail_next_commits),
//! [`fail_insert_orders`](InMemoryCommerceStore::fail_insert_orders)) drives
//! the retry and error paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use order_engine_core::cart::Cart;
use order_engine_core::error::{Resource, StoreError};
use order_engine_core::store::{
    CartStore, Catalog, LockedOrder, OrderReader, StoreFuture, StoreTransaction, UnitOfWork,
};
use order_engine_core::types::{
    CustomerId, Money, Order, OrderId, Page, PageRequest, Product, ProductId, ProductStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct StockRow {
    product: Product,
    /// Units reserved by open transactions
    held: u32,
}

impl StockRow {
    const fn free(&self) -> u32 {
        self.product.stock_quantity.saturating_sub(self.held)
    }
}

#[derive(Debug)]
struct StoredOrder {
    order: Order,
    version: i64,
    /// Insertion sequence, newest highest
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, StockRow>,
    carts: HashMap<CustomerId, Cart>,
    orders: HashMap<OrderId, StoredOrder>,
    next_seq: u64,
    failing_commits: usize,
    fail_inserts: bool,
    commit_attempts: usize,
}

impl State {
    fn release(&mut self, holds: &[(ProductId, u32)]) {
        for (product_id, quantity) in holds {
            if let Some(row) = self.products.get_mut(product_id) {
                row.held = row.held.saturating_sub(*quantity);
            }
        }
    }
}

/// Transactional in-memory implementation of the commerce store traits.
///
/// # Example
///
/// ```
/// use order_engine_testing::InMemoryCommerceStore;
/// use order_engine_core::store::Catalog;
/// use order_engine_core::types::Money;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryCommerceStore::new();
/// let widget = store.add_product("Widget", Money::from_cents(1000), 3);
///
/// assert!(store.conditional_decrement_stock(widget, 2).await?);
/// assert!(!store.conditional_decrement_stock(widget, 2).await?);
/// assert_eq!(store.get_product(widget).await?.stock_quantity, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryCommerceStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryCommerceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active product and return its id.
    pub fn add_product(&self, name: &str, price: Money, stock: u32) -> ProductId {
        self.add_product_with_status(name, price, stock, ProductStatus::Active)
    }

    /// Add a product with an explicit status and return its id.
    pub fn add_product_with_status(
        &self,
        name: &str,
        price: Money,
        stock: u32,
        status: ProductStatus,
    ) -> ProductId {
        let id = ProductId::new();
        let sku = format!("SKU-{}", name.to_uppercase().replace(' ', "-"));
        self.insert_product(Product {
            id,
            name: name.to_string(),
            sku,
            price,
            stock_quantity: stock,
            status,
        });
        id
    }

    /// Insert or replace a product.
    pub fn insert_product(&self, product: Product) {
        let mut state = self.state.lock().unwrap();
        let held = state.products.get(&product.id).map_or(0, |row| row.held);
        state.products.insert(product.id, StockRow { product, held });
    }

    /// Change a product's list price.
    pub fn set_price(&self, product_id: ProductId, price: Money) {
        if let Some(row) = self.state.lock().unwrap().products.get_mut(&product_id) {
            row.product.price = price;
        }
    }

    /// Change a product's status.
    pub fn set_status(&self, product_id: ProductId, status: ProductStatus) {
        if let Some(row) = self.state.lock().unwrap().products.get_mut(&product_id) {
            row.product.status = status;
        }
    }

    /// Make the next `count` commits fail with a serialization conflict.
    pub fn fail_next_commits(&self, count: usize) {
        self.state.lock().unwrap().failing_commits = count;
    }

    /// Make every transactional order insert fail with a database error.
    pub fn fail_insert_orders(&self, fail: bool) {
        self.state.lock().unwrap().fail_inserts = fail;
    }

    /// Number of commits attempted so far, failed ones included.
    #[must_use]
    pub fn commit_attempts(&self) -> usize {
        self.state.lock().unwrap().commit_attempts
    }

    /// Number of committed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    /// Units currently held by open transactions.
    #[must_use]
    pub fn held(&self, product_id: ProductId) -> u32 {
        self.state
            .lock()
            .unwrap()
            .products
            .get(&product_id)
            .map_or(0, |row| row.held)
    }
}

impl Catalog for InMemoryCommerceStore {
    fn get_product(&self, product_id: ProductId) -> StoreFuture<'_, Product> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .products
                .get(&product_id)
                .map(|row| row.product.clone())
                .ok_or_else(|| StoreError::not_found(Resource::Product, product_id))
        })
    }

    fn conditional_decrement_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let Some(row) = state.products.get_mut(&product_id) else {
                return Ok(false);
            };
            if row.free() < quantity {
                return Ok(false);
            }
            row.product.stock_quantity -= quantity;
            Ok(true)
        })
    }

    fn credit_stock(&self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let row = state
                .products
                .get_mut(&product_id)
                .ok_or_else(|| StoreError::not_found(Resource::Product, product_id))?;
            row.product.stock_quantity = row.product.stock_quantity.saturating_add(quantity);
            Ok(())
        })
    }
}

impl CartStore for InMemoryCommerceStore {
    fn get_cart_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Cart> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .carts
                .get(&customer_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found(Resource::Cart, customer_id))
        })
    }

    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if let Some(existing) = state.carts.get(&cart.customer_id) {
                if existing.id != cart.id {
                    return Err(StoreError::Duplicate {
                        resource: Resource::Cart,
                        id: existing.id.to_string(),
                    });
                }
            }
            state.carts.insert(cart.customer_id, cart);
            Ok(())
        })
    }
}

impl OrderReader for InMemoryCommerceStore {
    fn get_order(&self, order_id: OrderId) -> StoreFuture<'_, Order> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .orders
                .get(&order_id)
                .map(|stored| stored.order.clone())
                .ok_or_else(|| StoreError::not_found(Resource::Order, order_id))
        })
    }

    fn list_orders_by_customer(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> StoreFuture<'_, Page<Order>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            let mut matching: Vec<&StoredOrder> = state
                .orders
                .values()
                .filter(|stored| stored.order.customer_id() == customer_id)
                .collect();
            matching.sort_by(|a, b| {
                b.order
                    .created_at()
                    .cmp(&a.order.created_at())
                    .then(b.seq.cmp(&a.seq))
            });

            let total = matching.len() as u64;
            let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
            let items = matching
                .into_iter()
                .skip(skip)
                .take(page.page_size() as usize)
                .map(|stored| stored.order.clone())
                .collect();

            Ok(Page {
                items,
                page: page.page(),
                page_size: page.page_size(),
                total,
            })
        })
    }
}

impl UnitOfWork for InMemoryCommerceStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        Box::pin(async move {
            let tx: Box<dyn StoreTransaction> = Box::new(InMemoryTransaction {
                state: Arc::clone(&self.state),
                holds: Vec::new(),
                credits: Vec::new(),
                inserts: Vec::new(),
                updates: Vec::new(),
                finished: false,
            });
            Ok(tx)
        })
    }
}

/// Open transaction against an [`InMemoryCommerceStore`].
#[derive(Debug)]
struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    holds: Vec<(ProductId, u32)>,
    credits: Vec<(ProductId, u32)>,
    inserts: Vec<Order>,
    updates: Vec<(Order, i64)>,
    finished: bool,
}

impl InMemoryTransaction {
    fn apply(&mut self, state: &mut State) -> Result<(), StoreError> {
        state.commit_attempts += 1;

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            state.release(&self.holds);
            return Err(StoreError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        for order in &self.inserts {
            if state.orders.contains_key(&order.id()) {
                state.release(&self.holds);
                return Err(StoreError::Duplicate {
                    resource: Resource::Order,
                    id: order.id().to_string(),
                });
            }
        }
        for (order, expected_version) in &self.updates {
            let current = state.orders.get(&order.id()).map(|stored| stored.version);
            if current != Some(*expected_version) {
                state.release(&self.holds);
                return Err(StoreError::Conflict(format!(
                    "order {} changed since it was loaded",
                    order.id()
                )));
            }
        }

        for (product_id, quantity) in self.holds.drain(..) {
            if let Some(row) = state.products.get_mut(&product_id) {
                row.held = row.held.saturating_sub(quantity);
                row.product.stock_quantity = row.product.stock_quantity.saturating_sub(quantity);
            }
        }
        for (product_id, quantity) in self.credits.drain(..) {
            if let Some(row) = state.products.get_mut(&product_id) {
                row.product.stock_quantity = row.product.stock_quantity.saturating_add(quantity);
            }
        }
        for order in self.inserts.drain(..) {
            state.next_seq += 1;
            let seq = state.next_seq;
            state.orders.insert(
                order.id(),
                StoredOrder {
                    order,
                    version: 0,
                    seq,
                },
            );
        }
        for (order, _) in self.updates.drain(..) {
            if let Some(stored) = state.orders.get_mut(&order.id()) {
                stored.order = order;
                stored.version += 1;
            }
        }
        Ok(())
    }
}

impl StoreTransaction for InMemoryTransaction {
    fn conditional_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            // Let concurrent transactions interleave between statements
            tokio::task::yield_now().await;
            let mut state = self.state.lock().unwrap();
            let Some(row) = state.products.get_mut(&product_id) else {
                return Ok(false);
            };
            if row.free() < quantity {
                return Ok(false);
            }
            row.held += quantity;
            drop(state);
            self.holds.push((product_id, quantity));
            Ok(true)
        })
    }

    fn available_stock(&mut self, product_id: ProductId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .products
                .get(&product_id)
                .map(StockRow::free)
                .ok_or_else(|| StoreError::not_found(Resource::Product, product_id))
        })
    }

    fn credit_stock(&mut self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let exists = self.state.lock().unwrap().products.contains_key(&product_id);
            if !exists {
                return Err(StoreError::not_found(Resource::Product, product_id));
            }
            self.credits.push((product_id, quantity));
            Ok(())
        })
    }

    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let (fail, exists) = {
                let state = self.state.lock().unwrap();
                (state.fail_inserts, state.orders.contains_key(&order.id()))
            };
            if fail {
                return Err(StoreError::Database("injected insert failure".to_string()));
            }
            if exists || self.inserts.iter().any(|o| o.id() == order.id()) {
                return Err(StoreError::Duplicate {
                    resource: Resource::Order,
                    id: order.id().to_string(),
                });
            }
            self.inserts.push(order);
            Ok(())
        })
    }

    fn load_order_for_update(&mut self, order_id: OrderId) -> StoreFuture<'_, LockedOrder> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .orders
                .get(&order_id)
                .map(|stored| LockedOrder {
                    order: stored.order.clone(),
                    version: stored.version,
                })
                .ok_or_else(|| StoreError::not_found(Resource::Order, order_id))
        })
    }

    fn save_order_status(&mut self, order: Order, expected_version: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.updates.push((order, expected_version));
            Ok(())
        })
    }

    fn commit(mut self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            let shared = Arc::clone(&self.state);
            let mut state = shared.lock().unwrap();
            self.finished = true;
            let result = self.apply(&mut state);
            self.holds.clear();
            result
        })
    }

    fn rollback(mut self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.state.lock().unwrap().release(&self.holds);
            self.holds.clear();
            self.finished = true;
            Ok(())
        })
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.finished || self.holds.is_empty() {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            state.release(&self.holds);
        }
    }
}
