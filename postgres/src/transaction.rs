//! [`StoreTransaction`] over a `sqlx` Postgres transaction.

use crate::error::map_sqlx;
use crate::queries;
use order_engine_core::store::{LockedOrder, StoreFuture, StoreTransaction};
use order_engine_core::types::{Order, OrderId, ProductId};
use sqlx::{Postgres, Transaction};

/// An open database transaction.
///
/// Dropping it without calling `commit` rolls it back.
pub(crate) struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

impl StoreTransaction for PostgresTransaction {
    fn conditional_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool> {
        Box::pin(queries::conditional_decrement(
            &mut self.tx,
            product_id,
            quantity,
        ))
    }

    fn available_stock(&mut self, product_id: ProductId) -> StoreFuture<'_, u32> {
        Box::pin(queries::stock_level(&mut self.tx, product_id))
    }

    fn credit_stock(&mut self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()> {
        Box::pin(queries::credit(&mut self.tx, product_id, quantity))
    }

    fn insert_order(&mut self, order: Order) -> StoreFuture<'_, ()> {
        Box::pin(async move { queries::insert_order(&mut self.tx, &order).await })
    }

    fn load_order_for_update(&mut self, order_id: OrderId) -> StoreFuture<'_, LockedOrder> {
        Box::pin(async move {
            let (order, version) = queries::fetch_order(&mut self.tx, order_id, true).await?;
            Ok(LockedOrder { order, version })
        })
    }

    fn save_order_status(&mut self, order: Order, expected_version: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            queries::update_order_status(&mut self.tx, &order, expected_version).await
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { tx } = *self;
        Box::pin(async move { tx.commit().await.map_err(map_sqlx) })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { tx } = *self;
        Box::pin(async move { tx.rollback().await.map_err(map_sqlx) })
    }
}
