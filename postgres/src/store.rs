//! [`PostgresCommerceStore`]: every storage trait over one connection pool.

use crate::error::map_sqlx;
use crate::queries;
use crate::transaction::PostgresTransaction;
use order_engine_core::cart::Cart;
use order_engine_core::error::StoreError;
use order_engine_core::store::{
    CartStore, Catalog, OrderReader, StoreFuture, StoreTransaction, UnitOfWork,
};
use order_engine_core::types::{
    CustomerId, Order, OrderId, Page, PageRequest, Product, ProductId,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// `PostgreSQL` implementation of the catalog, cart, order and transaction
/// traits.
///
/// # Example
///
/// ```ignore
/// use order_engine_postgres::PostgresCommerceStore;
///
/// let store = PostgresCommerceStore::connect("postgres://localhost/orders").await?;
/// store.migrate().await?;
/// ```
#[derive(Clone, Debug)]
pub struct PostgresCommerceStore {
    pool: PgPool,
}

impl PostgresCommerceStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::connect_with(PgPoolOptions::new().max_connections(10), database_url).await
    }

    /// Connect with explicit pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect_with(options: PgPoolOptions, database_url: &str) -> Result<Self, StoreError> {
        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Check that the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    /// Insert a product or overwrite every field of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
        queries::upsert_product(&mut conn, product).await
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn list_orders(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer_id.as_uuid())
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx)?;

        let offset = i64::try_from(page.offset())
            .map_err(|_| StoreError::Database("page offset out of range".to_string()))?;
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r"
            SELECT id
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(customer_id.as_uuid())
        .bind(i64::from(page.page_size()))
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx)?;

        let mut items = Vec::with_capacity(ids.len());
        for (id,) in ids {
            let (order, _) = queries::fetch_order(&mut conn, OrderId::from_uuid(id), false).await?;
            items.push(order);
        }

        Ok(Page {
            items,
            page: page.page(),
            page_size: page.page_size(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn save_cart_atomically(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        queries::write_cart(&mut tx, cart).await?;
        tx.commit().await.map_err(map_sqlx)
    }
}

impl Catalog for PostgresCommerceStore {
    fn get_product(&self, product_id: ProductId) -> StoreFuture<'_, Product> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
            queries::fetch_product(&mut conn, product_id).await
        })
    }

    fn conditional_decrement_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
            queries::conditional_decrement(&mut conn, product_id, quantity).await
        })
    }

    fn credit_stock(&self, product_id: ProductId, quantity: u32) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
            queries::credit(&mut conn, product_id, quantity).await
        })
    }
}

impl CartStore for PostgresCommerceStore {
    fn get_cart_by_customer(&self, customer_id: CustomerId) -> StoreFuture<'_, Cart> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
            queries::fetch_cart(&mut conn, customer_id).await
        })
    }

    fn save_cart(&self, cart: Cart) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.save_cart_atomically(&cart).await })
    }
}

impl OrderReader for PostgresCommerceStore {
    fn get_order(&self, order_id: OrderId) -> StoreFuture<'_, Order> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx)?;
            let (order, _) = queries::fetch_order(&mut conn, order_id, false).await?;
            Ok(order)
        })
    }

    fn list_orders_by_customer(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> StoreFuture<'_, Page<Order>> {
        Box::pin(self.list_orders(customer_id, page))
    }
}

impl UnitOfWork for PostgresCommerceStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(map_sqlx)?;
            let tx: Box<dyn StoreTransaction> = Box::new(PostgresTransaction::new(tx));
            Ok(tx)
        })
    }
}
