//! Administrative stock edits.
//!
//! Stock is only ever changed through the catalog's two primitives: a
//! conditional decrement that refuses to go below zero and a credit. There
//! is no way to assign a stock level directly, so an administrator
//! withdrawing units competes with order placement on the same terms as
//! another order would.

use crate::metrics::StockMetrics;
use order_engine_core::error::{OrderError, Resource, StoreError};
use order_engine_core::store::CommerceStore;
use order_engine_core::types::{Product, ProductId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A requested change to a product's stock.
///
/// Serialized as `{ "action": "withdraw", "quantity": 3 }`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StockAdjustment {
    /// Remove units, refused when fewer are on hand
    Withdraw {
        /// Units to remove
        quantity: u32,
    },
    /// Add units
    Credit {
        /// Units to add
        quantity: u32,
    },
}

impl StockAdjustment {
    /// Units moved by the adjustment
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        match self {
            Self::Withdraw { quantity } | Self::Credit { quantity } => *quantity,
        }
    }

    /// Metric and log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Withdraw { .. } => "withdraw",
            Self::Credit { .. } => "credit",
        }
    }
}

/// Product lookup and stock administration.
#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn CommerceStore>,
}

impl StockService {
    /// Create a stock service.
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>) -> Self {
        Self { store }
    }

    /// Load a product with its committed stock.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such product
    /// - `PersistenceFailure`: the store failed
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, OrderError> {
        Ok(self.store.get_product(product_id).await?)
    }

    /// Apply an adjustment and return the product afterwards.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: zero quantity, or a credit past [`Product::MAX_STOCK`]
    /// - `NotFound`: no such product
    /// - `InsufficientStock`: a withdrawal larger than the stock on hand
    /// - `PersistenceFailure`: the store failed
    pub async fn adjust(
        &self,
        product_id: ProductId,
        adjustment: StockAdjustment,
    ) -> Result<Product, OrderError> {
        let quantity = adjustment.quantity();
        if quantity == 0 {
            return Err(OrderError::InvalidRequest(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let before = self.store.get_product(product_id).await?;
        match adjustment {
            StockAdjustment::Withdraw { .. } => {
                if !self.store.conditional_decrement_stock(product_id, quantity).await? {
                    // Re-read: the refusal may come from a concurrent withdrawal or order
                    let available = match self.store.get_product(product_id).await {
                        Ok(product) => product.stock_quantity,
                        Err(StoreError::NotFound { .. }) => {
                            return Err(OrderError::not_found(Resource::Product, product_id));
                        }
                        Err(err) => return Err(err.into()),
                    };
                    StockMetrics::record_refused();
                    tracing::info!(
                        product_id = %product_id,
                        requested = quantity,
                        available,
                        "Stock withdrawal refused"
                    );
                    return Err(OrderError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available,
                    });
                }
            }
            StockAdjustment::Credit { .. } => {
                if before
                    .stock_quantity
                    .checked_add(quantity)
                    .is_none_or(|stock| stock > Product::MAX_STOCK)
                {
                    return Err(OrderError::InvalidRequest(format!(
                        "stock of product {product_id} cannot exceed {}",
                        Product::MAX_STOCK
                    )));
                }
                self.store.credit_stock(product_id, quantity).await?;
            }
        }

        StockMetrics::record_adjustment(adjustment.as_str());
        let after = self.store.get_product(product_id).await?;
        tracing::info!(
            product_id = %product_id,
            action = adjustment.as_str(),
            quantity,
            stock = after.stock_quantity,
            "Stock adjusted"
        );
        Ok(after)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use order_engine_core::types::Money;
    use order_engine_testing::InMemoryCommerceStore;

    fn service(store: &Arc<InMemoryCommerceStore>) -> StockService {
        StockService::new(store.clone())
    }

    #[tokio::test]
    async fn withdraw_and_credit_move_stock() {
        let store = Arc::new(InMemoryCommerceStore::new());
        let product = store.add_product("A", Money::from_cents(100), 5);
        let stock = service(&store);

        let after = stock
            .adjust(product, StockAdjustment::Withdraw { quantity: 3 })
            .await
            .unwrap();
        assert_eq!(after.stock_quantity, 2);

        let after = stock
            .adjust(product, StockAdjustment::Credit { quantity: 4 })
            .await
            .unwrap();
        assert_eq!(after.stock_quantity, 6);
    }

    #[tokio::test]
    async fn oversized_withdrawal_is_refused_and_changes_nothing() {
        let store = Arc::new(InMemoryCommerceStore::new());
        let product = store.add_product("A", Money::from_cents(100), 2);
        let stock = service(&store);

        let err = stock
            .adjust(product, StockAdjustment::Withdraw { quantity: 3 })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: product,
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(stock.get_product(product).await.unwrap().stock_quantity, 2);
    }

    #[tokio::test]
    async fn unknown_products_are_not_found() {
        let store = Arc::new(InMemoryCommerceStore::new());
        let stock = service(&store);
        let missing = ProductId::new();

        for adjustment in [
            StockAdjustment::Withdraw { quantity: 1 },
            StockAdjustment::Credit { quantity: 1 },
        ] {
            let err = stock.adjust(missing, adjustment).await.unwrap_err();
            assert!(matches!(err, OrderError::NotFound { resource: Resource::Product, .. }));
        }
        assert!(matches!(
            stock.get_product(missing).await.unwrap_err(),
            OrderError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn zero_and_overflowing_quantities_are_invalid() {
        let store = Arc::new(InMemoryCommerceStore::new());
        let product = store.add_product("A", Money::from_cents(100), 10);
        let stock = service(&store);

        let err = stock
            .adjust(product, StockAdjustment::Withdraw { quantity: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));

        let err = stock
            .adjust(product, StockAdjustment::Credit { quantity: Product::MAX_STOCK })
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));
        assert_eq!(stock.get_product(product).await.unwrap().stock_quantity, 10);
    }

    #[test]
    fn adjustments_use_a_tagged_body() {
        let parsed: StockAdjustment =
            serde_json::from_str(r#"{ "action": "withdraw", "quantity": 3 }"#).unwrap();
        assert_eq!(parsed, StockAdjustment::Withdraw { quantity: 3 });
        assert!(serde_json::from_str::<StockAdjustment>(r#"{ "action": "set", "quantity": 3 }"#).is_err());
    }
}
