//! Router configuration.

use crate::handlers::{cart, health, orders, payments, products};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

/// Build the complete Axum router.
///
/// ```text
/// GET    /health
/// GET    /ready
/// GET    /metrics
/// POST   /api/orders
/// GET    /api/orders?page=&page_size=
/// GET    /api/orders/:id
/// PUT    /api/orders/:id/status
/// POST   /api/payments/events
/// GET    /api/products/:id
/// POST   /api/products/:id/stock
/// GET    /api/cart
/// POST   /api/cart/items
/// PUT    /api/cart/items/:product_id
/// DELETE /api/cart/items/:product_id
/// ```
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        .route("/payments/events", post(payments::payment_event))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/stock", post(products::adjust_stock))
        .route("/cart", get(cart::get_cart))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/:product_id",
            put(cart::update_item).delete(cart::remove_item),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
