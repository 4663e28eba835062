//! Order operations exposed to the HTTP layer and other collaborators.
//!
//! `create_order` runs the whole placement pipeline under one deadline:
//!
//! ```text
//! CartSnapshotReader → AvailabilityChecker → OrderAssembler → InventoryReconciler
//! ```
//!
//! Every outcome is either a committed order with its stock reserved or an
//! error with nothing persisted.

use crate::metrics::PlacementMetrics;
use crate::order_store::OrderStore;
use crate::reconciler::{DEADLINE_EXCEEDED, InventoryReconciler};
use crate::retry::RetryPolicy;
use order_engine_core::assembler::OrderAssembler;
use order_engine_core::availability::AvailabilityChecker;
use order_engine_core::cart::CartSnapshotReader;
use order_engine_core::environment::{Clock, IdGenerator};
use order_engine_core::error::OrderError;
use order_engine_core::state_machine::OrderEvent;
use order_engine_core::store::CommerceStore;
use order_engine_core::types::{CustomerId, Order, OrderId, Page, PageRequest, ShippingAddress};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Runtime policy for [`OrderService`].
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    /// Upper bound on one `create_order` call, end to end
    pub deadline: Duration,
    /// Retry policy for transient storage contention
    pub retry: RetryPolicy,
    /// Largest page `list_orders` will return
    pub max_page_size: u32,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            max_page_size: 10,
        }
    }
}

/// Entry point for placing, reading and advancing orders.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CommerceStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: OrderServiceConfig,
    reader: CartSnapshotReader,
    checker: AvailabilityChecker,
    assembler: OrderAssembler,
    reconciler: InventoryReconciler,
    orders: OrderStore,
}

impl OrderService {
    /// Wire a service over `store` with injected identifiers and time.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: OrderServiceConfig,
    ) -> Self {
        let reconciler = InventoryReconciler::new(Arc::clone(&store), config.retry.clone());
        let orders = OrderStore::new(Arc::clone(&store), Arc::clone(&clock), config.retry.clone());
        Self {
            store,
            ids,
            clock,
            config,
            reader: CartSnapshotReader::new(),
            checker: AvailabilityChecker::new(),
            assembler: OrderAssembler::new(),
            reconciler,
            orders,
        }
    }

    /// The order store this service writes through.
    #[must_use]
    pub const fn order_store(&self) -> &OrderStore {
        &self.orders
    }

    /// Place an order from the customer's current cart.
    ///
    /// Items come from the cart; the caller supplies only where to ship.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no cart, or a cart line names an unknown product
    /// - `EmptyCart`: the cart has no lines
    /// - `InsufficientStock`: a product cannot cover its line
    /// - `ReconciliationFailed`: contention outlasted the retries or the deadline
    /// - `PersistenceFailure`: the store failed
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        shipping_address: ShippingAddress,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let deadline = started + self.config.deadline;

        let placed = match tokio::time::timeout_at(
            deadline,
            self.place(customer_id, shipping_address, deadline),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(OrderError::ReconciliationFailed {
                attempts: 0,
                reason: DEADLINE_EXCEEDED.to_string(),
            }),
        };

        match &placed {
            Ok(order) => {
                PlacementMetrics::record_placed(started.elapsed());
                tracing::info!(
                    order_id = %order.id(),
                    customer_id = %customer_id,
                    items = order.items().len(),
                    total = %order.total_amount(),
                    "Order placed"
                );
            }
            Err(err) => {
                PlacementMetrics::record_rejected(err.kind());
                tracing::info!(
                    customer_id = %customer_id,
                    reason = err.kind(),
                    error = %err,
                    "Order placement rejected"
                );
            }
        }
        placed
    }

    async fn place(
        &self,
        customer_id: CustomerId,
        shipping_address: ShippingAddress,
        deadline: Instant,
    ) -> Result<Order, OrderError> {
        let snapshot = self.reader.read(self.store.as_ref(), customer_id).await?;
        self.checker.check(self.store.as_ref(), &snapshot).await?;
        let draft = self.assembler.assemble(
            customer_id,
            &snapshot,
            shipping_address,
            self.ids.as_ref(),
            self.clock.as_ref(),
        )?;
        self.reconciler.reconcile(&draft, deadline).await
    }

    /// Load one order.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such order
    /// - `PersistenceFailure`: the store failed
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(order_id).await
    }

    /// List a customer's orders, newest first.
    ///
    /// `page` below 1 is read as 1; `page_size` outside `1..=max_page_size`
    /// is read as `max_page_size`.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` when the store fails.
    pub async fn list_orders(
        &self,
        customer_id: CustomerId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Order>, OrderError> {
        let request = PageRequest::new(page, page_size, self.config.max_page_size);
        self.orders.list_by_customer(customer_id, request).await
    }

    /// Advance an order through the state machine.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such order
    /// - `IllegalTransition`: the event is not allowed from the current status
    /// - `ReconciliationFailed` / `PersistenceFailure`: storage trouble
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        event: OrderEvent,
    ) -> Result<Order, OrderError> {
        self.orders.update_status(order_id, event).await
    }
}
