//! Shopping carts and the snapshot taken of them at checkout.
//!
//! A [`Cart`] is a working document: customers add, change and remove lines
//! at any time, including while an order is being placed from it. Placement
//! therefore never reads the cart directly. It reads a [`CartSnapshot`], a
//! value copy that later cart mutations cannot reach.

use crate::error::{OrderError, Resource};
use crate::store::CartStore;
use crate::types::{CartId, CustomerId, Money, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cart line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product in the line
    pub product_id: ProductId,
    /// Units wanted (never zero while the line exists)
    pub quantity: u32,
    /// Price per unit at the time the line was written
    pub unit_price: Money,
}

impl CartItem {
    /// Quantity × unit price
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A customer's cart.
///
/// Lines are keyed by product, so a product appears at most once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart identifier
    pub id: CartId,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Lines by product
    pub items: BTreeMap<ProductId, CartItem>,
    /// Sum of all line totals
    pub total_amount: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a customer
    #[must_use]
    pub const fn new(id: CartId, customer_id: CustomerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            items: BTreeMap::new(),
            total_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts the line for `product_id`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when `quantity` is zero, `unit_price` is not positive,
    /// or the line or cart total would not fit in a [`Money`].
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidRequest(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if !unit_price.is_positive() {
            return Err(OrderError::InvalidRequest(
                "unit price must be greater than zero".to_string(),
            ));
        }

        let item = CartItem {
            product_id,
            quantity,
            unit_price,
        };
        let total_amount = self.total_with(&item)?;
        self.items.insert(product_id, item);
        self.total_amount = total_amount;
        self.updated_at = now;
        Ok(())
    }

    /// Changes the quantity of an existing line; zero removes it.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when the product is not in the cart or the new total
    /// would not fit in a [`Money`].
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if quantity == 0 {
            if self.items.remove(&product_id).is_none() {
                return Err(item_not_in_cart(product_id));
            }
            self.touch(now);
        } else {
            let mut item = self
                .items
                .get(&product_id)
                .cloned()
                .ok_or_else(|| item_not_in_cart(product_id))?;
            item.quantity = quantity;
            let total_amount = self.total_with(&item)?;
            self.items.insert(product_id, item);
            self.total_amount = total_amount;
            self.updated_at = now;
        }
        Ok(())
    }

    /// Removes a line.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product is not in the cart.
    pub fn remove_item(
        &mut self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.items.remove(&product_id).is_none() {
            return Err(OrderError::not_found(Resource::CartItem, product_id));
        }
        self.touch(now);
        Ok(())
    }

    /// Total the cart would have with `item` in place of its product's line.
    fn total_with(&self, item: &CartItem) -> Result<Money, OrderError> {
        let line_total = item.unit_price.checked_times(item.quantity);
        let others = self
            .items
            .values()
            .filter(|line| line.product_id != item.product_id)
            .map(CartItem::line_total);
        line_total
            .and_then(|line_total| Money::checked_sum(others.chain([line_total])))
            .ok_or_else(|| {
                OrderError::InvalidRequest("cart total exceeds the supported amount".to_string())
            })
    }

    // Removing a line only shrinks a total that already fit.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.total_amount = self.items.values().map(CartItem::line_total).sum();
        self.updated_at = now;
    }
}

fn item_not_in_cart(product_id: ProductId) -> OrderError {
    OrderError::InvalidRequest(format!("product {product_id} is not in the cart"))
}

/// Point-in-time copy of a non-empty cart.
///
/// Lines are ordered by product id. Nothing in a snapshot can be changed
/// after it is taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartSnapshot {
    cart_id: CartId,
    customer_id: CustomerId,
    lines: Vec<CartItem>,
    total_amount: Money,
}

impl CartSnapshot {
    /// Copies the current contents of `cart`.
    ///
    /// # Errors
    ///
    /// `EmptyCart` when the cart has no lines.
    pub fn of(cart: &Cart) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let lines: Vec<CartItem> = cart.items.values().cloned().collect();
        let total_amount = lines.iter().map(CartItem::line_total).sum();
        Ok(Self {
            cart_id: cart.id,
            customer_id: cart.customer_id,
            lines,
            total_amount,
        })
    }

    /// Cart the snapshot was taken from
    #[must_use]
    pub const fn cart_id(&self) -> CartId {
        self.cart_id
    }

    /// Owning customer
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Lines, ordered by product id
    #[must_use]
    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    /// Sum of line totals at snapshot time
    #[must_use]
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }
}

/// Reads a customer's cart as a [`CartSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CartSnapshotReader;

impl CartSnapshotReader {
    /// Creates a new reader
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Snapshot the cart owned by `customer_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the customer has no cart
    /// - `EmptyCart`: the cart has no lines
    /// - `PersistenceFailure`: the cart store failed
    pub async fn read<S>(&self, store: &S, customer_id: CustomerId) -> Result<CartSnapshot, OrderError>
    where
        S: CartStore + ?Sized,
    {
        let cart = store.get_cart_by_customer(customer_id).await?;
        let snapshot = CartSnapshot::of(&cart)?;
        tracing::debug!(
            customer_id = %customer_id,
            cart_id = %snapshot.cart_id(),
            lines = snapshot.lines().len(),
            "Cart snapshot taken"
        );
        Ok(snapshot)
    }
}
