//! HTTP API integration tests.
//!
//! Drives the full router over the in-memory store: routing, extractors,
//! status mapping and JSON shapes.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Integration tests can use expect for setup

use axum::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use order_engine_core::cart::Cart;
use order_engine_core::environment::{RandomIdGenerator, SystemClock};
use order_engine_core::store::{CartStore, Catalog};
use order_engine_core::types::{
    CustomerId, Money, Order, OrderStatus, PaymentStatus, Product, ProductId,
};
use order_engine_runtime::OrderServiceConfig;
use order_engine_testing::fixtures::{cart_with, sample_address};
use order_engine_testing::InMemoryCommerceStore;
use order_engine_web::handlers::orders::OrderListResponse;
use order_engine_web::{build_router, AppState, ReadinessCheck, CORRELATION_ID_HEADER};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

struct Probe(bool);

#[async_trait]
impl ReadinessCheck for Probe {
    async fn check(&self) -> Result<(), String> {
        if self.0 {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

fn server_with(store: &InMemoryCommerceStore, ready: bool) -> TestServer {
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(RandomIdGenerator),
        Arc::new(SystemClock),
        OrderServiceConfig::default(),
        Arc::new(Probe(ready)),
    );
    TestServer::new(build_router(state)).expect("test server")
}

fn server(store: &InMemoryCommerceStore) -> TestServer {
    server_with(store, true)
}

fn customer_header() -> HeaderName {
    HeaderName::from_static("x-customer-id")
}

fn as_header(customer: CustomerId) -> HeaderValue {
    HeaderValue::from_str(&customer.to_string()).unwrap()
}

async fn customer_with_cart(
    store: &InMemoryCommerceStore,
    lines: &[(ProductId, u32, i64)],
) -> CustomerId {
    let customer = CustomerId::new();
    store.save_cart(cart_with(customer, lines)).await.unwrap();
    customer
}

async fn stock(store: &InMemoryCommerceStore, product: ProductId) -> u32 {
    store.get_product(product).await.unwrap().stock_quantity
}

fn order_body() -> Value {
    json!({ "shipping_address": sample_address() })
}

#[tokio::test]
async fn health_is_always_ok() {
    let server = server_with(&InMemoryCommerceStore::new(), false);

    let response = server.get("/health").await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn readiness_follows_the_store_probe() {
    let store = InMemoryCommerceStore::new();

    server(&store).get("/ready").await.assert_status(StatusCode::OK);

    let response = server_with(&store, false).get("/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body = response.json::<Value>();
    assert_eq!(body["ready"], false);
    assert_eq!(body["error"], "connection refused");
}

#[tokio::test]
async fn metrics_without_a_recorder_is_unavailable() {
    let server = server(&InMemoryCommerceStore::new());

    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let server = server(&InMemoryCommerceStore::new());
    let id = Uuid::new_v4();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-correlation-id"),
            HeaderValue::from_str(&id.to_string()).unwrap(),
        )
        .await;

    let echoed = response.headers().get(CORRELATION_ID_HEADER).unwrap();
    assert_eq!(echoed.to_str().unwrap(), id.to_string());
}

#[tokio::test]
async fn placing_an_order_returns_201_and_reserves_stock() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let customer = customer_with_cart(&store, &[(widget, 2, 1000)]).await;
    let server = server(&store);

    let response = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .json(&order_body())
        .await;

    response.assert_status(StatusCode::CREATED);
    let order = response.json::<Order>();
    assert_eq!(order.customer_id(), customer);
    assert_eq!(order.total_amount(), Money::from_cents(2000));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock(&store, widget).await, 3);

    let fetched = server
        .get(&format!("/api/orders/{}", order.id()))
        .add_header(customer_header(), as_header(customer))
        .await;
    fetched.assert_status(StatusCode::OK);
    assert_eq!(fetched.json::<Order>(), order);
}

#[tokio::test]
async fn shortfall_is_a_409_and_leaves_stock_untouched() {
    let store = InMemoryCommerceStore::new();
    let a = store.add_product("Product A", Money::from_cents(1000), 5);
    let b = store.add_product("Product B", Money::from_cents(500), 0);
    let customer = customer_with_cart(&store, &[(a, 3, 1000), (b, 1, 500)]).await;

    let response = server(&store)
        .post("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .json(&order_body())
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert!(body["message"].as_str().unwrap().contains(&b.to_string()));
    assert_eq!(stock(&store, a).await, 5);
    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn empty_and_missing_carts_are_rejected() {
    let store = InMemoryCommerceStore::new();
    let server = server(&store);

    let empty = customer_with_cart(&store, &[]).await;
    let response = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(empty))
        .json(&order_body())
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "EMPTY_CART");

    server
        .post("/api/orders")
        .add_header(customer_header(), as_header(CustomerId::new()))
        .json(&order_body())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_without_a_customer_are_unauthorized() {
    let server = server(&InMemoryCommerceStore::new());

    let response = server.post("/api/orders").json(&order_body()).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");

    server
        .get("/api/cart")
        .add_header(customer_header(), HeaderValue::from_static("not-a-uuid"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_input_is_a_400() {
    let store = InMemoryCommerceStore::new();
    let server = server(&store);
    let customer = CustomerId::new();

    let response = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "shipping_address": { "city": "Nowhere" } }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");

    server
        .get("/api/orders/not-an-id")
        .add_header(customer_header(), as_header(customer))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .put(&format!("/api/orders/{}/status", Uuid::new_v4()))
        .json(&json!({ "event": "Teleported" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_of_other_customers_are_not_found() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let owner = customer_with_cart(&store, &[(widget, 1, 1000)]).await;
    let server = server(&store);

    let order = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(owner))
        .json(&order_body())
        .await
        .json::<Order>();

    server
        .get(&format!("/api/orders/{}", order.id()))
        .add_header(customer_header(), as_header(CustomerId::new()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_is_paged_and_clamped() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(100), 100);
    let customer = customer_with_cart(&store, &[(widget, 1, 100)]).await;
    let server = server(&store);

    for _ in 0..12 {
        server
            .post("/api/orders")
            .add_header(customer_header(), as_header(customer))
            .json(&order_body())
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .get("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .add_query_param("page", 2)
        .add_query_param("page_size", 5)
        .await;
    response.assert_status(StatusCode::OK);
    let page = response.json::<OrderListResponse>();
    assert_eq!(page.total, 12);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 5);
    assert_eq!(page.data.len(), 5);

    let clamped = server
        .get("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .add_query_param("page", 0)
        .add_query_param("page_size", 500)
        .await
        .json::<OrderListResponse>();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.page_size, 10);
    assert_eq!(clamped.data.len(), 10);
    assert!(
        clamped
            .data
            .windows(2)
            .all(|pair| pair[0].created_at() >= pair[1].created_at())
    );
}

#[tokio::test]
async fn lifecycle_over_http() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let customer = customer_with_cart(&store, &[(widget, 2, 1000)]).await;
    let server = server(&store);

    let order = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .json(&order_body())
        .await
        .json::<Order>();
    let status_path = format!("/api/orders/{}/status", order.id());

    let response = server
        .put(&status_path)
        .json(&json!({ "event": "ShipmentDispatched" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "ILLEGAL_TRANSITION");

    let payment = json!({ "order_id": order.id(), "kind": "PaymentConfirmed" });
    let paid = server.post("/api/payments/events").json(&payment).await;
    paid.assert_status(StatusCode::OK);
    assert_eq!(paid.json::<Order>().status, OrderStatus::Confirmed);

    // Redelivery is absorbed
    let again = server.post("/api/payments/events").json(&payment).await;
    again.assert_status(StatusCode::OK);
    assert_eq!(again.json::<Order>().payment_status, PaymentStatus::Paid);

    let shipped = server
        .put(&status_path)
        .json(&json!({ "event": "ShipmentDispatched" }))
        .await;
    shipped.assert_status(StatusCode::OK);
    assert_eq!(shipped.json::<Order>().status, OrderStatus::Shipped);

    let cancel = server
        .put(&status_path)
        .json(&json!({ "event": "AdminCancel" }))
        .await;
    cancel.assert_status(StatusCode::CONFLICT);
    assert_eq!(stock(&store, widget).await, 3);
}

#[tokio::test]
async fn failed_payment_cancels_and_restocks() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let customer = customer_with_cart(&store, &[(widget, 4, 1000)]).await;
    let server = server(&store);

    let order = server
        .post("/api/orders")
        .add_header(customer_header(), as_header(customer))
        .json(&order_body())
        .await
        .json::<Order>();
    assert_eq!(stock(&store, widget).await, 1);

    let response = server
        .post("/api/payments/events")
        .json(&json!({ "order_id": order.id(), "kind": "PaymentFailed" }))
        .await;
    response.assert_status(StatusCode::OK);
    let cancelled = response.json::<Order>();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
    assert_eq!(stock(&store, widget).await, 5);

    server
        .post("/api/payments/events")
        .json(&json!({ "order_id": Uuid::new_v4(), "kind": "PaymentConfirmed" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_endpoints_edit_the_callers_cart() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let gadget = store.add_product("Gadget", Money::from_cents(250), 5);
    let customer = CustomerId::new();
    let server = server(&store);

    let created = server
        .get("/api/cart")
        .add_header(customer_header(), as_header(customer))
        .await;
    created.assert_status(StatusCode::OK);
    assert!(created.json::<Cart>().items.is_empty());

    let cart = server
        .post("/api/cart/items")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "product_id": widget, "quantity": 2 }))
        .await
        .json::<Cart>();
    assert_eq!(cart.total_amount, Money::from_cents(2000));

    let cart = server
        .post("/api/cart/items")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "product_id": gadget, "quantity": 1, "unit_price": 199 }))
        .await
        .json::<Cart>();
    assert_eq!(cart.total_amount, Money::from_cents(2199));

    let cart = server
        .put(&format!("/api/cart/items/{widget}"))
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "quantity": 1 }))
        .await
        .json::<Cart>();
    assert_eq!(cart.total_amount, Money::from_cents(1199));

    let response = server
        .delete(&format!("/api/cart/items/{gadget}"))
        .add_header(customer_header(), as_header(customer))
        .await;
    response.assert_status(StatusCode::OK);
    let cart = response.json::<Cart>();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_amount, Money::from_cents(1000));

    server
        .delete(&format!("/api/cart/items/{gadget}"))
        .add_header(customer_header(), as_header(customer))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/cart/items")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "product_id": ProductId::new(), "quantity": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/cart/items")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "product_id": widget, "quantity": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overflowing_cart_prices_are_a_400() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 5);
    let customer = CustomerId::new();
    let server = server(&store);

    let response = server
        .post("/api/cart/items")
        .add_header(customer_header(), as_header(customer))
        .json(&json!({ "product_id": widget, "quantity": 2, "unit_price": i64::MAX / 2 + 1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_REQUEST");

    let cart = server
        .get("/api/cart")
        .add_header(customer_header(), as_header(customer))
        .await
        .json::<Cart>();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, Money::ZERO);
}

#[tokio::test]
async fn stock_is_adjusted_only_through_withdrawals_and_credits() {
    let store = InMemoryCommerceStore::new();
    let widget = store.add_product("Widget", Money::from_cents(1000), 3);
    let server = server(&store);

    let product = server
        .get(&format!("/api/products/{widget}"))
        .await
        .json::<Product>();
    assert_eq!(product.stock_quantity, 3);

    let product = server
        .post(&format!("/api/products/{widget}/stock"))
        .json(&json!({ "action": "withdraw", "quantity": 2 }))
        .await
        .json::<Product>();
    assert_eq!(product.stock_quantity, 1);

    let response = server
        .post(&format!("/api/products/{widget}/stock"))
        .json(&json!({ "action": "withdraw", "quantity": 2 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_STOCK");
    assert_eq!(stock(&store, widget).await, 1);

    let product = server
        .post(&format!("/api/products/{widget}/stock"))
        .json(&json!({ "action": "credit", "quantity": 4 }))
        .await
        .json::<Product>();
    assert_eq!(product.stock_quantity, 5);

    server
        .post(&format!("/api/products/{widget}/stock"))
        .json(&json!({ "action": "set", "quantity": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(stock(&store, widget).await, 5);
}

#[tokio::test]
async fn unknown_products_are_a_404() {
    let store = InMemoryCommerceStore::new();
    let server = server(&store);
    let missing = ProductId::new();

    server
        .get(&format!("/api/products/{missing}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post(&format!("/api/products/{missing}/stock"))
        .json(&json!({ "action": "withdraw", "quantity": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/products/not-a-uuid")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
