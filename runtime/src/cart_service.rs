//! Cart mutation on behalf of a customer.

use order_engine_core::cart::Cart;
use order_engine_core::environment::{Clock, IdGenerator};
use order_engine_core::error::{OrderError, StoreError};
use order_engine_core::store::CommerceStore;
use order_engine_core::types::{CartId, CustomerId, Money, ProductId};
use std::sync::Arc;

/// Reads and edits customers' carts.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CommerceStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl CartService {
    /// Create a cart service.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, ids, clock }
    }

    /// Return the customer's cart, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` when the store fails.
    pub async fn get_or_create_cart(&self, customer_id: CustomerId) -> Result<Cart, OrderError> {
        match self.store.get_cart_by_customer(customer_id).await {
            Ok(cart) => return Ok(cart),
            Err(StoreError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let cart = Cart::new(
            CartId::from_uuid(self.ids.next_id()),
            customer_id,
            self.clock.now(),
        );
        match self.store.save_cart(cart.clone()).await {
            Ok(()) => {
                tracing::debug!(customer_id = %customer_id, cart_id = %cart.id, "Cart created");
                Ok(cart)
            }
            // Another request created it first
            Err(StoreError::Duplicate { .. }) => {
                Ok(self.store.get_cart_by_customer(customer_id).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Put `quantity` units of a product in the cart, replacing any existing line.
    ///
    /// Without an explicit `unit_price` the current catalog price is used.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the product does not exist
    /// - `InvalidRequest`: zero quantity, non-positive price or an overflowing total
    /// - `PersistenceFailure`: the store failed
    pub async fn add_item(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Option<Money>,
    ) -> Result<Cart, OrderError> {
        let product = self.store.get_product(product_id).await?;
        let mut cart = self.get_or_create_cart(customer_id).await?;
        cart.add_item(
            product_id,
            quantity,
            unit_price.unwrap_or(product.price),
            self.clock.now(),
        )?;
        self.store.save_cart(cart.clone()).await?;
        Ok(cart)
    }

    /// Change a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the customer has no cart
    /// - `InvalidRequest`: the product is not in the cart or the total overflows
    /// - `PersistenceFailure`: the store failed
    pub async fn update_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, OrderError> {
        let mut cart = self.store.get_cart_by_customer(customer_id).await?;
        cart.update_quantity(product_id, quantity, self.clock.now())?;
        self.store.save_cart(cart.clone()).await?;
        Ok(cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no cart, or the product is not in it
    /// - `PersistenceFailure`: the store failed
    pub async fn remove_item(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<Cart, OrderError> {
        let mut cart = self.store.get_cart_by_customer(customer_id).await?;
        cart.remove_item(product_id, self.clock.now())?;
        self.store.save_cart(cart.clone()).await?;
        Ok(cart)
    }
}
