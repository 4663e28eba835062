//! SQL shared by pooled reads and explicit transactions.
//!
//! Every function takes a `&mut PgConnection`, which is either a pooled
//! connection or the connection inside an open `sqlx::Transaction`.

use crate::error::{is_unique_violation, map_sqlx};
use order_engine_core::cart::{Cart, CartItem};
use order_engine_core::error::{Resource, StoreError};
use order_engine_core::types::{
    CartId, CustomerId, Money, Order, OrderId, OrderItem, OrderItemId, OrderStatusChange,
    ParseStatusError, Product, ProductId, ShippingAddress,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

const SELECT_ORDER: &str = r"
    SELECT id, customer_id, total_cents, status, payment_status,
           shipping_address, version, created_at, updated_at
    FROM orders
    WHERE id = $1
";

const SELECT_ORDER_FOR_UPDATE: &str = r"
    SELECT id, customer_id, total_cents, status, payment_status,
           shipping_address, version, created_at, updated_at
    FROM orders
    WHERE id = $1
    FOR UPDATE
";

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(map_sqlx)
}

fn parse<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = ParseStatusError>,
{
    value
        .parse()
        .map_err(|e: ParseStatusError| StoreError::Database(e.to_string()))
}

/// Quantities are `INTEGER` columns.
pub(crate) fn quantity_to_db(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Database(format!("quantity {quantity} exceeds column range")))
}

fn quantity_from_db(quantity: i32) -> Result<u32, StoreError> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Database(format!("negative quantity {quantity} in database")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let status: String = get(row, "status")?;
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        sku: get(row, "sku")?,
        price: Money::from_cents(get(row, "price_cents")?),
        stock_quantity: quantity_from_db(get(row, "stock_quantity")?)?,
        status: parse(&status)?,
    })
}

pub(crate) async fn fetch_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Product, StoreError> {
    let row = sqlx::query(
        r"
        SELECT id, name, sku, price_cents, stock_quantity, status
        FROM products
        WHERE id = $1
        ",
    )
    .bind(product_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx)?
    .ok_or_else(|| StoreError::not_found(Resource::Product, product_id))?;

    product_from_row(&row)
}

pub(crate) async fn upsert_product(conn: &mut PgConnection, product: &Product) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO products (id, name, sku, price_cents, stock_quantity, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            sku = EXCLUDED.sku,
            price_cents = EXCLUDED.price_cents,
            stock_quantity = EXCLUDED.stock_quantity,
            status = EXCLUDED.status,
            updated_at = now()
        ",
    )
    .bind(product.id.as_uuid())
    .bind(&product.name)
    .bind(&product.sku)
    .bind(product.price.cents())
    .bind(quantity_to_db(product.stock_quantity)?)
    .bind(product.status.as_str())
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

/// The compare-and-subtract primitive: one statement, so the check and
/// the write cannot be separated by another writer.
pub(crate) async fn conditional_decrement(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET stock_quantity = stock_quantity - $2,
            updated_at = now()
        WHERE id = $1 AND stock_quantity >= $2
        ",
    )
    .bind(product_id.as_uuid())
    .bind(quantity_to_db(quantity)?)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn stock_level(conn: &mut PgConnection, product_id: ProductId) -> Result<u32, StoreError> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| StoreError::not_found(Resource::Product, product_id))?;
    quantity_from_db(stock)
}

pub(crate) async fn credit(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET stock_quantity = stock_quantity + $2,
            updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(product_id.as_uuid())
    .bind(quantity_to_db(quantity)?)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found(Resource::Product, product_id));
    }
    Ok(())
}

pub(crate) async fn fetch_cart(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<Cart, StoreError> {
    let row = sqlx::query(
        r"
        SELECT id, customer_id, total_cents, created_at, updated_at
        FROM carts
        WHERE customer_id = $1
        ",
    )
    .bind(customer_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx)?
    .ok_or_else(|| StoreError::not_found(Resource::Cart, customer_id))?;

    let cart_id: Uuid = get(&row, "id")?;
    let lines = sqlx::query(
        r"
        SELECT product_id, quantity, unit_price_cents
        FROM cart_items
        WHERE cart_id = $1
        ",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    let mut items = BTreeMap::new();
    for line in &lines {
        let product_id = ProductId::from_uuid(get(line, "product_id")?);
        items.insert(
            product_id,
            CartItem {
                product_id,
                quantity: quantity_from_db(get(line, "quantity")?)?,
                unit_price: Money::from_cents(get(line, "unit_price_cents")?),
            },
        );
    }

    Ok(Cart {
        id: CartId::from_uuid(cart_id),
        customer_id: CustomerId::from_uuid(get(&row, "customer_id")?),
        items,
        total_amount: Money::from_cents(get(&row, "total_cents")?),
        created_at: get(&row, "created_at")?,
        updated_at: get(&row, "updated_at")?,
    })
}

pub(crate) async fn write_cart(conn: &mut PgConnection, cart: &Cart) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO carts (id, customer_id, total_cents, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
        SET total_cents = EXCLUDED.total_cents,
            updated_at = EXCLUDED.updated_at
        ",
    )
    .bind(cart.id.as_uuid())
    .bind(cart.customer_id.as_uuid())
    .bind(cart.total_amount.cents())
    .bind(cart.created_at)
    .bind(cart.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Duplicate {
                resource: Resource::Cart,
                id: cart.customer_id.to_string(),
            }
        } else {
            map_sqlx(e)
        }
    })?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

    for item in cart.items.values() {
        sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(cart.id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.unit_price.cents())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    }
    Ok(())
}

/// Load an order with its items and history, plus its row version.
///
/// With `for_update` the order row stays locked until the surrounding
/// transaction ends.
pub(crate) async fn fetch_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    for_update: bool,
) -> Result<(Order, i64), StoreError> {
    let sql = if for_update {
        SELECT_ORDER_FOR_UPDATE
    } else {
        SELECT_ORDER
    };
    let row = sqlx::query(sql)
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| StoreError::not_found(Resource::Order, order_id))?;

    let item_rows = sqlx::query(
        r"
        SELECT id, product_id, quantity, unit_price_cents
        FROM order_items
        WHERE order_id = $1
        ORDER BY position
        ",
    )
    .bind(order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    let history_rows = sqlx::query(
        r"
        SELECT from_status, to_status, event, changed_at
        FROM order_status_history
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    let items = item_rows
        .iter()
        .map(|r| -> Result<OrderItem, StoreError> {
            Ok(OrderItem {
                id: OrderItemId::from_uuid(get(r, "id")?),
                product_id: ProductId::from_uuid(get(r, "product_id")?),
                quantity: quantity_from_db(get(r, "quantity")?)?,
                unit_price: Money::from_cents(get(r, "unit_price_cents")?),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let history = history_rows
        .iter()
        .map(|r| -> Result<OrderStatusChange, StoreError> {
            let from: String = get(r, "from_status")?;
            let to: String = get(r, "to_status")?;
            Ok(OrderStatusChange {
                from: parse(&from)?,
                to: parse(&to)?,
                event: get(r, "event")?,
                at: get(r, "changed_at")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let status: String = get(&row, "status")?;
    let payment_status: String = get(&row, "payment_status")?;
    let Json(shipping_address): Json<ShippingAddress> = get(&row, "shipping_address")?;

    let order = Order::from_parts(
        order_id,
        CustomerId::from_uuid(get(&row, "customer_id")?),
        items,
        Money::from_cents(get(&row, "total_cents")?),
        parse(&status)?,
        parse(&payment_status)?,
        shipping_address,
        history,
        get(&row, "created_at")?,
        get(&row, "updated_at")?,
    );
    Ok((order, get(&row, "version")?))
}

pub(crate) async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO orders (
            id, customer_id, total_cents, status, payment_status,
            shipping_address, version, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8)
        ",
    )
    .bind(order.id().as_uuid())
    .bind(order.customer_id().as_uuid())
    .bind(order.total_amount().cents())
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(Json(order.shipping_address()))
    .bind(order.created_at())
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Duplicate {
                resource: Resource::Order,
                id: order.id().to_string(),
            }
        } else {
            map_sqlx(e)
        }
    })?;

    for (position, item) in order.items().iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| StoreError::Database("too many order items".to_string()))?;
        sqlx::query(
            r"
            INSERT INTO order_items (id, order_id, position, product_id, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(item.id.as_uuid())
        .bind(order.id().as_uuid())
        .bind(position)
        .bind(item.product_id.as_uuid())
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.unit_price.cents())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    }

    for change in &order.history {
        insert_history(conn, order.id(), change).await?;
    }
    Ok(())
}

pub(crate) async fn insert_history(
    conn: &mut PgConnection,
    order_id: OrderId,
    change: &OrderStatusChange,
) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO order_status_history (order_id, from_status, to_status, event, changed_at)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(order_id.as_uuid())
    .bind(change.from.as_str())
    .bind(change.to.as_str())
    .bind(&change.event)
    .bind(change.at)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

/// Optimistic status update: fails with `Conflict` if the row moved past
/// `expected_version`.
pub(crate) async fn update_order_status(
    conn: &mut PgConnection,
    order: &Order,
    expected_version: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r"
        UPDATE orders
        SET status = $2,
            payment_status = $3,
            updated_at = $4,
            version = version + 1
        WHERE id = $1 AND version = $5
        ",
    )
    .bind(order.id().as_uuid())
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.updated_at)
    .bind(expected_version)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!(
            "order {} changed since version {expected_version}",
            order.id()
        )));
    }

    if let Some(change) = order.history.last() {
        insert_history(conn, order.id(), change).await?;
    }
    Ok(())
}
