//! Intake of payment outcomes from the payment collaborator.
//!
//! Payment events arrive at least once and in any order relative to other
//! lifecycle events. A redelivered event finds the order already showing its
//! effect; that case is absorbed and the current order returned.

use crate::order_store::OrderStore;
use order_engine_core::error::OrderError;
use order_engine_core::state_machine::OrderEvent;
use order_engine_core::types::{Order, OrderId};
use serde::{Deserialize, Serialize};

/// Payment outcome reported by the payment collaborator
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventKind {
    /// Charge captured
    PaymentConfirmed,
    /// Charge declined
    PaymentFailed,
}

impl From<PaymentEventKind> for OrderEvent {
    fn from(kind: PaymentEventKind) -> Self {
        match kind {
            PaymentEventKind::PaymentConfirmed => Self::PaymentConfirmed,
            PaymentEventKind::PaymentFailed => Self::PaymentFailed,
        }
    }
}

/// A payment outcome for one order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Order the payment belongs to
    pub order_id: OrderId,
    /// Outcome
    pub kind: PaymentEventKind,
}

/// Applies payment events to orders.
#[derive(Clone)]
pub struct PaymentEventHandler {
    orders: OrderStore,
}

impl PaymentEventHandler {
    /// Create a handler that applies events through `orders`.
    #[must_use]
    pub const fn new(orders: OrderStore) -> Self {
        Self { orders }
    }

    /// Apply `event` to its order.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the order does not exist
    /// - `IllegalTransition`: the event conflicts with the order's state and is
    ///   not a redelivery (e.g. `PaymentConfirmed` on a cancelled order)
    /// - `ReconciliationFailed` / `PersistenceFailure`: storage trouble
    pub async fn handle(&self, event: PaymentEvent) -> Result<Order, OrderError> {
        let order_event = OrderEvent::from(event.kind);
        match self.orders.update_status(event.order_id, order_event).await {
            Err(OrderError::IllegalTransition { order_id, from, event: name }) => {
                let current = self.orders.get(event.order_id).await?;
                if order_event.already_applied_to(&current) {
                    tracing::debug!(
                        order_id = %event.order_id,
                        event = %order_event,
                        status = %current.status,
                        "Duplicate payment event absorbed"
                    );
                    Ok(current)
                } else {
                    Err(OrderError::IllegalTransition {
                        order_id,
                        from,
                        event: name,
                    })
                }
            }
            other => other,
        }
    }
}
