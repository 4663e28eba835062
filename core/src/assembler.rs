//! Builds an order draft from a cart snapshot.

use crate::cart::CartSnapshot;
use crate::environment::{Clock, IdGenerator};
use crate::error::OrderError;
use crate::types::{CustomerId, Order, OrderId, OrderItem, OrderItemId, ProductId, ShippingAddress};

/// An assembled order that has not been persisted yet.
///
/// Its identifier is fixed, so reconciling the same draft twice always
/// targets the same order row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDraft {
    order: Order,
}

impl OrderDraft {
    /// Identifier the order will be stored under
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order.id()
    }

    /// The order as it will be persisted
    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }

    /// Stock to reserve: one `(product, quantity)` pair per line, in line order
    pub fn reservations(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.order
            .items()
            .iter()
            .map(|item| (item.product_id, item.quantity))
    }

    /// Consumes the draft
    #[must_use]
    pub fn into_order(self) -> Order {
        self.order
    }
}

/// Turns a validated snapshot into an [`OrderDraft`].
///
/// Never touches stock or storage. With a fixed clock and id generator the
/// output is fully determined by the inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderAssembler;

impl OrderAssembler {
    /// Creates a new assembler
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Assemble a draft for `customer_id` from `snapshot`.
    ///
    /// Unit prices and the total come from the snapshot, never from a fresh
    /// catalog read.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when the snapshot belongs to a different customer.
    pub fn assemble<I, C>(
        &self,
        customer_id: CustomerId,
        snapshot: &CartSnapshot,
        shipping_address: ShippingAddress,
        ids: &I,
        clock: &C,
    ) -> Result<OrderDraft, OrderError>
    where
        I: IdGenerator + ?Sized,
        C: Clock + ?Sized,
    {
        if snapshot.customer_id() != customer_id {
            return Err(OrderError::InvalidRequest(format!(
                "cart {} does not belong to customer {customer_id}",
                snapshot.cart_id()
            )));
        }

        let order_id = OrderId::from_uuid(ids.next_id());
        let items: Vec<OrderItem> = snapshot
            .lines()
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::from_uuid(ids.next_id()),
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let order = Order::place(order_id, customer_id, items, shipping_address, clock.now());
        debug_assert_eq!(order.total_amount(), snapshot.total_amount());

        tracing::debug!(
            order_id = %order_id,
            customer_id = %customer_id,
            items = order.items().len(),
            total = %order.total_amount(),
            "Order draft assembled"
        );

        Ok(OrderDraft { order })
    }
}
