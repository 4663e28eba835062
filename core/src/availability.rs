//! Advisory stock check performed before any state is written.
//!
//! The check reads committed stock levels, so it can pass for an order that
//! the reconciler later rejects. It exists to turn obviously doomed orders
//! into a precise `InsufficientStock` before a transaction is opened.

use crate::cart::CartSnapshot;
use crate::error::OrderError;
use crate::store::Catalog;

/// Checks every snapshot line against the catalog, failing on the first short line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityChecker;

impl AvailabilityChecker {
    /// Creates a new checker
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Verify that every line of `snapshot` could be satisfied right now.
    ///
    /// Lines are checked in snapshot order and the first shortfall wins.
    /// A product that is not active counts as having nothing available.
    ///
    /// # Errors
    ///
    /// - `InsufficientStock`: a line asks for more than is available
    /// - `NotFound`: a line references a product that does not exist
    /// - `PersistenceFailure`: the catalog failed
    pub async fn check<C>(&self, catalog: &C, snapshot: &CartSnapshot) -> Result<(), OrderError>
    where
        C: Catalog + ?Sized,
    {
        for line in snapshot.lines() {
            let product = catalog.get_product(line.product_id).await?;
            let available = product.available();
            if available < line.quantity {
                tracing::debug!(
                    product_id = %line.product_id,
                    requested = line.quantity,
                    available,
                    status = product.status.as_str(),
                    "Availability check failed"
                );
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::error::{Resource, StoreError};
    use crate::store::StoreFuture;
    use crate::types::{CartId, CustomerId, Money, Product, ProductId, ProductStatus};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubCatalog {
        products: Mutex<HashMap<ProductId, Product>>,
        lookups: AtomicUsize,
    }

    impl StubCatalog {
        fn with(&self, stock: u32, status: ProductStatus) -> ProductId {
            let id = ProductId::new();
            self.products.lock().unwrap().insert(
                id,
                Product {
                    id,
                    name: "Item".to_string(),
                    sku: format!("SKU-{id}"),
                    price: Money::from_cents(1000),
                    stock_quantity: stock,
                    status,
                },
            );
            id
        }
    }

    impl Catalog for StubCatalog {
        fn get_product(&self, product_id: ProductId) -> StoreFuture<'_, Product> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let product = self.products.lock().unwrap().get(&product_id).cloned();
            Box::pin(async move {
                product.ok_or_else(|| StoreError::not_found(Resource::Product, product_id))
            })
        }

        fn conditional_decrement_stock(&self, _: ProductId, _: u32) -> StoreFuture<'_, bool> {
            Box::pin(async { Ok(false) })
        }

        fn credit_stock(&self, _: ProductId, _: u32) -> StoreFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    fn snapshot(lines: &[(ProductId, u32)]) -> CartSnapshot {
        let mut cart = Cart::new(CartId::new(), CustomerId::new(), Utc::now());
        for (product, qty) in lines {
            cart.add_item(*product, *qty, Money::from_cents(1000), Utc::now())
                .unwrap();
        }
        CartSnapshot::of(&cart).unwrap()
    }

    #[tokio::test]
    async fn passes_when_every_line_fits() {
        let catalog = StubCatalog::default();
        let a = catalog.with(5, ProductStatus::Active);
        let b = catalog.with(1, ProductStatus::Active);

        AvailabilityChecker::new()
            .check(&catalog, &snapshot(&[(a, 5), (b, 1)]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reports_the_short_product_with_counts() {
        let catalog = StubCatalog::default();
        let a = catalog.with(5, ProductStatus::Active);
        let b = catalog.with(0, ProductStatus::Active);

        let err = AvailabilityChecker::new()
            .check(&catalog, &snapshot(&[(a, 3), (b, 1)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: b,
                requested: 1,
                available: 0,
            }
        );
    }

    #[tokio::test]
    async fn stops_at_first_shortfall() {
        let catalog = StubCatalog::default();
        let a = catalog.with(0, ProductStatus::Active);
        let b = catalog.with(0, ProductStatus::Active);
        let snap = snapshot(&[(a, 1), (b, 1)]);

        let err = AvailabilityChecker::new().check(&catalog, &snap).await.unwrap_err();
        let first = snap.lines()[0].product_id;
        assert!(matches!(err, OrderError::InsufficientStock { product_id, .. } if product_id == first));
        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inactive_products_are_unavailable() {
        let catalog = StubCatalog::default();
        let a = catalog.with(50, ProductStatus::Inactive);

        let err = AvailabilityChecker::new()
            .check(&catalog, &snapshot(&[(a, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { available: 0, .. }));
    }

    #[tokio::test]
    async fn unknown_products_are_not_found() {
        let catalog = StubCatalog::default();
        let err = AvailabilityChecker::new()
            .check(&catalog, &snapshot(&[(ProductId::new(), 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound { resource: Resource::Product, .. }));
    }
}
