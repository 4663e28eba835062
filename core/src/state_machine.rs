//! Order status state machine.
//!
//! ```text
//! Pending ──PaymentConfirmed──▶ Confirmed ──ShipmentDispatched──▶ Shipped ──DeliveryConfirmed──▶ Delivered
//!    │                              │
//!    ├──PaymentFailed──▶ Cancelled ◀┤
//!    └──AdminCancel────▶ Cancelled ◀┘ (AdminCancel)
//! ```
//!
//! `Cancelled` and `Delivered` are terminal. Every transition into
//! `Cancelled` returns the order's reserved quantities as compensation, and
//! because the source status is checked first, a replayed cancellation
//! finds the order already terminal and yields no second credit.

use crate::error::OrderError;
use crate::types::{Order, OrderStatus, OrderStatusChange, PaymentStatus, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Events that move an order through its lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Payment collaborator captured the charge
    PaymentConfirmed,
    /// Payment collaborator reported a declined charge
    PaymentFailed,
    /// Operator cancelled the order
    AdminCancel,
    /// Carrier picked the order up
    ShipmentDispatched,
    /// Carrier reported delivery
    DeliveryConfirmed,
}

impl OrderEvent {
    /// Every event, in declaration order
    pub const ALL: [Self; 5] = [
        Self::PaymentConfirmed,
        Self::PaymentFailed,
        Self::AdminCancel,
        Self::ShipmentDispatched,
        Self::DeliveryConfirmed,
    ];

    /// Event name as recorded in status history
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentConfirmed => "PaymentConfirmed",
            Self::PaymentFailed => "PaymentFailed",
            Self::AdminCancel => "AdminCancel",
            Self::ShipmentDispatched => "ShipmentDispatched",
            Self::DeliveryConfirmed => "DeliveryConfirmed",
        }
    }

    /// Whether `order` already shows the effect of this payment event.
    ///
    /// Payment events are delivered at least once; a redelivery finds the
    /// order in exactly this state.
    #[must_use]
    pub fn already_applied_to(&self, order: &Order) -> bool {
        match self {
            Self::PaymentConfirmed => order.payment_status == PaymentStatus::Paid,
            Self::PaymentFailed => order.payment_status == PaymentStatus::Failed,
            Self::AdminCancel | Self::ShipmentDispatched | Self::DeliveryConfirmed => false,
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderEvent {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| OrderError::InvalidRequest(format!("unknown order event: {s}")))
    }
}

/// Units to return to a product's stock
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StockCredit {
    /// Product to credit
    pub product_id: ProductId,
    /// Units to add back
    pub quantity: u32,
}

/// Result of an accepted transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The order after the event
    pub order: Order,
    /// Stock to credit back (empty unless the order was just cancelled)
    pub compensation: Vec<StockCredit>,
}

/// Apply `event` to `order`.
///
/// The input order is not modified; the updated copy carries the new
/// status, payment status, a history entry and `updated_at = at`.
///
/// # Errors
///
/// `IllegalTransition` when the event is not permitted from the order's
/// current status, including every event on a terminal order and
/// `ShipmentDispatched` on an order that has not been paid.
pub fn transition(
    order: &Order,
    event: OrderEvent,
    at: DateTime<Utc>,
) -> Result<Transition, OrderError> {
    use OrderEvent::{AdminCancel, DeliveryConfirmed, PaymentConfirmed, PaymentFailed, ShipmentDispatched};
    use OrderStatus::{Cancelled, Confirmed, Delivered, Pending, Shipped};

    let from = order.status;
    let (to, payment_status) = match (from, event) {
        (Pending, PaymentConfirmed) => (Confirmed, PaymentStatus::Paid),
        (Pending, PaymentFailed) => (Cancelled, PaymentStatus::Failed),
        (Pending | Confirmed, AdminCancel) => (Cancelled, order.payment_status),
        (Confirmed, ShipmentDispatched) if order.payment_status == PaymentStatus::Paid => {
            (Shipped, order.payment_status)
        }
        (Shipped, DeliveryConfirmed) => (Delivered, order.payment_status),
        _ => {
            tracing::warn!(
                order_id = %order.id(),
                from = %from,
                payment_status = %order.payment_status,
                event = %event,
                "Illegal order transition rejected"
            );
            return Err(OrderError::IllegalTransition {
                order_id: order.id(),
                from,
                event: event.as_str().to_string(),
            });
        }
    };

    let compensation = if to == Cancelled {
        order
            .items()
            .iter()
            .map(|item| StockCredit {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut next = order.clone();
    next.status = to;
    next.payment_status = payment_status;
    next.updated_at = at;
    next.history.push(OrderStatusChange {
        from,
        to,
        event: event.as_str().to_string(),
        at,
    });

    Ok(Transition {
        order: next,
        compensation,
    })
}
