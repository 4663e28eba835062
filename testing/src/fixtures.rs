//! Ready-made domain values.

use crate::mocks::test_time;
use order_engine_core::cart::Cart;
use order_engine_core::types::{
    CartId, CustomerId, Money, Order, OrderId, OrderItem, OrderItemId, ProductId, ShippingAddress,
};

/// A complete, valid shipping address.
#[must_use]
pub fn sample_address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Ada Lovelace".to_string(),
        line1: "12 Analytical Row".to_string(),
        line2: None,
        city: "London".to_string(),
        region: "Greater London".to_string(),
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
    }
}

/// A `Pending` order for a fresh customer with one item per
/// `(product, quantity, unit price in cents)`.
#[must_use]
pub fn pending_order(lines: &[(ProductId, u32, i64)]) -> Order {
    pending_order_for(CustomerId::new(), lines)
}

/// Like [`pending_order`], for a given customer.
#[must_use]
pub fn pending_order_for(customer_id: CustomerId, lines: &[(ProductId, u32, i64)]) -> Order {
    let items = lines
        .iter()
        .map(|(product_id, quantity, cents)| OrderItem {
            id: OrderItemId::new(),
            product_id: *product_id,
            quantity: *quantity,
            unit_price: Money::from_cents(*cents),
        })
        .collect();
    Order::place(
        OrderId::new(),
        customer_id,
        items,
        sample_address(),
        test_time(),
    )
}

/// A cart holding one line per `(product, quantity, unit price in cents)`.
///
/// # Panics
///
/// If a line has zero quantity or a non-positive price.
#[must_use]
#[allow(clippy::expect_used)]
pub fn cart_with(customer_id: CustomerId, lines: &[(ProductId, u32, i64)]) -> Cart {
    let mut cart = Cart::new(CartId::new(), customer_id, test_time());
    for (product_id, quantity, cents) in lines {
        cart.add_item(*product_id, *quantity, Money::from_cents(*cents), test_time())
            .expect("fixture cart lines must be valid");
    }
    cart
}
