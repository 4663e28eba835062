//! Inventory reconciliation: reserve stock and persist the order atomically.
//!
//! One attempt runs inside a single store transaction:
//!
//! 1. Conditionally decrement stock for every draft line, in line order
//!    (lines are sorted by product id, so concurrent orders touching the
//!    same products always lock them in the same order)
//! 2. If any decrement finds too little stock, roll back and report
//!    `InsufficientStock` with the quantity this transaction could see
//! 3. Insert the order (`Pending`/`Pending`) and its items
//! 4. Commit
//!
//! Transient contention (serialization failure, deadlock) reruns the whole
//! attempt under the [`RetryPolicy`]. Nothing is visible to other readers
//! unless the commit succeeds, so a failed or abandoned attempt leaves no
//! stock change behind.

use crate::metrics::ReconciliationMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use order_engine_core::assembler::OrderDraft;
use order_engine_core::error::{OrderError, StoreError};
use order_engine_core::store::CommerceStore;
use order_engine_core::types::Order;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::Instant;

/// Reason reported when the placement deadline expires.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Reserves stock for an [`OrderDraft`] and commits it as an order.
#[derive(Clone)]
pub struct InventoryReconciler {
    store: Arc<dyn CommerceStore>,
    policy: RetryPolicy,
}

impl InventoryReconciler {
    /// Create a reconciler over `store` retrying according to `policy`.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Reserve stock for `draft` and persist it, finishing before `deadline`.
    ///
    /// Reconciling the same draft again after a successful commit returns
    /// the stored order instead of placing it twice.
    ///
    /// # Errors
    ///
    /// - `InsufficientStock`: a product could not cover its line
    /// - `NotFound`: a line references a product that does not exist
    /// - `ReconciliationFailed`: retries exhausted or the deadline expired
    /// - `PersistenceFailure`: the store failed for a non-transient reason
    pub async fn reconcile(&self, draft: &OrderDraft, deadline: Instant) -> Result<Order, OrderError> {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let retried = retry_with_predicate(
            &self.policy,
            move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt > 1 {
                    ReconciliationMetrics::record_retry();
                }
                self.attempt(draft, attempt).await
            },
            OrderError::is_retryable,
        );

        let outcome = tokio::time::timeout_at(deadline, retried).await;
        let attempts = attempts.load(Ordering::SeqCst);

        match outcome {
            Ok(Ok(order)) => Ok(order),
            Ok(Err(err)) if err.is_retryable() => {
                ReconciliationMetrics::record_exhausted();
                tracing::error!(
                    order_id = %draft.order_id(),
                    attempts,
                    error = %err,
                    "Reconciliation retries exhausted"
                );
                Err(OrderError::ReconciliationFailed {
                    attempts,
                    reason: err.to_string(),
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => {
                ReconciliationMetrics::record_exhausted();
                tracing::error!(
                    order_id = %draft.order_id(),
                    attempts,
                    "Reconciliation deadline exceeded, transaction abandoned"
                );
                Err(OrderError::ReconciliationFailed {
                    attempts,
                    reason: DEADLINE_EXCEEDED.to_string(),
                })
            }
        }
    }

    async fn attempt(&self, draft: &OrderDraft, attempt: u32) -> Result<Order, OrderError> {
        let order_id = draft.order_id();
        let mut tx = self.store.begin().await?;

        for (product_id, quantity) in draft.reservations() {
            if !tx.conditional_decrement_stock(product_id, quantity).await? {
                let available = tx.available_stock(product_id).await;
                tx.rollback().await?;
                let available = available?;
                tracing::info!(
                    order_id = %order_id,
                    product_id = %product_id,
                    requested = quantity,
                    available,
                    attempt,
                    "Conditional decrement refused, order rolled back"
                );
                return Err(OrderError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                });
            }
        }

        match tx.insert_order(draft.order().clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                // An earlier attempt committed but its acknowledgement was lost
                tx.rollback().await?;
                let existing = self.store.get_order(order_id).await?;
                if existing.customer_id() != draft.order().customer_id()
                    || existing.items() != draft.order().items()
                {
                    return Err(OrderError::Conflict(order_id));
                }
                tracing::info!(
                    order_id = %order_id,
                    attempt,
                    "Order already committed by an earlier attempt"
                );
                return Ok(existing);
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;

        tracing::debug!(order_id = %order_id, attempt, "Reconciliation committed");
        Ok(draft.order().clone())
    }
}
