//! Durable order persistence with state-machine-guarded status changes.
//!
//! [`OrderStore::update_status`] is the only way an order's status changes
//! after placement. It loads the order inside a transaction, runs the
//! transition, credits any compensation and saves the new status with an
//! optimistic version check, all before a single commit. A replayed
//! cancellation therefore sees the order already `Cancelled`, is rejected
//! by the state machine, and credits nothing.

use crate::metrics::LifecycleMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use order_engine_core::environment::Clock;
use order_engine_core::error::{OrderError, StoreError};
use order_engine_core::state_machine::{self, OrderEvent};
use order_engine_core::store::CommerceStore;
use order_engine_core::types::{CustomerId, Order, OrderId, Page, PageRequest};
use std::sync::Arc;

/// Order persistence boundary.
#[derive(Clone)]
pub struct OrderStore {
    store: Arc<dyn CommerceStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl OrderStore {
    /// Create an order store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Persist a new order without touching stock.
    ///
    /// Orders placed through the reconciler are inserted there, inside the
    /// stock transaction; this entry point is for orders whose stock is
    /// already accounted for.
    ///
    /// # Errors
    ///
    /// - `Conflict`: an order with this id already exists
    /// - `PersistenceFailure`: the store failed
    pub async fn create(&self, order: Order) -> Result<(), OrderError> {
        let order_id = order.id();
        let mut tx = self.store.begin().await?;
        match tx.insert_order(order).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => return Err(OrderError::Conflict(order_id)),
            Err(err) => return Err(err.into()),
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load one order.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such order
    /// - `PersistenceFailure`: the store failed
    pub async fn get(&self, order_id: OrderId) -> Result<Order, OrderError> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// List a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` when the store fails.
    pub async fn list_by_customer(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        Ok(self.store.list_orders_by_customer(customer_id, page).await?)
    }

    /// Apply `event` to an order through the state machine.
    ///
    /// Transitions into `Cancelled` credit every line's quantity back to
    /// stock in the same transaction as the status change.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such order
    /// - `IllegalTransition`: the event is not allowed from the current status
    /// - `ReconciliationFailed`: contention persisted through every retry
    /// - `PersistenceFailure`: the store failed
    pub async fn update_status(&self, order_id: OrderId, event: OrderEvent) -> Result<Order, OrderError> {
        let result = retry_with_predicate(
            &self.policy,
            move || self.apply(order_id, event),
            OrderError::is_retryable,
        )
        .await;

        match result {
            Ok(order) => {
                LifecycleMetrics::record_transition(event.as_str());
                tracing::info!(
                    order_id = %order_id,
                    event = %event,
                    status = %order.status,
                    payment_status = %order.payment_status,
                    "Order status updated"
                );
                Ok(order)
            }
            Err(err @ OrderError::IllegalTransition { .. }) => {
                LifecycleMetrics::record_illegal();
                Err(err)
            }
            Err(err) if err.is_retryable() => Err(OrderError::ReconciliationFailed {
                attempts: u32::try_from(self.policy.max_attempts()).unwrap_or(u32::MAX),
                reason: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn apply(&self, order_id: OrderId, event: OrderEvent) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let locked = tx.load_order_for_update(order_id).await?;

        // Dropping `tx` on the error path rolls it back
        let transition = state_machine::transition(&locked.order, event, self.clock.now())?;

        for credit in &transition.compensation {
            tx.credit_stock(credit.product_id, credit.quantity).await?;
        }
        tx.save_order_status(transition.order.clone(), locked.version)
            .await?;
        tx.commit().await?;

        if !transition.compensation.is_empty() {
            LifecycleMetrics::record_compensation();
            tracing::info!(
                order_id = %order_id,
                event = %event,
                lines = transition.compensation.len(),
                "Reserved stock credited back"
            );
        }

        Ok(transition.order)
    }
}
