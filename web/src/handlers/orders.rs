//! Order endpoints.
//!
//! - `POST /api/orders`: place an order from the caller's cart
//! - `GET /api/orders`: list the caller's orders, newest first
//! - `GET /api/orders/:id`: fetch one of the caller's orders
//! - `PUT /api/orders/:id/status`: apply a lifecycle event

#![allow(clippy::missing_errors_doc)] // every handler fails with AppError

use crate::error::AppError;
use crate::extractors::{AuthenticatedCustomer, CorrelationId};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use order_engine_core::error::{OrderError, Resource};
use order_engine_core::state_machine::OrderEvent;
use order_engine_core::types::{Order, OrderId, ShippingAddress};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Where to deliver; items come from the cart
    pub shipping_address: ShippingAddress,
}

/// Query of `GET /api/orders`.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Rows per page
    pub page_size: Option<u32>,
}

/// Body of `GET /api/orders`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    /// Orders on this page
    pub data: Vec<Order>,
    /// Orders across all pages
    pub total: u64,
    /// Page returned
    pub page: u32,
    /// Page size used
    pub page_size: u32,
}

/// Body of `PUT /api/orders/:id/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Lifecycle event to apply
    pub event: OrderEvent,
}

/// Place an order from the caller's cart.
pub async fn create_order(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    correlation_id: CorrelationId,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(request) = payload?;

    let order = state
        .orders
        .create_order(customer_id, request.shipping_address)
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        order_id = %order.id(),
        customer_id = %customer_id,
        "Order placed via HTTP"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch one order.
///
/// Orders belonging to another customer are reported as missing.
pub async fn get_order(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    path: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, AppError> {
    let Path(order_id) = path?;

    let order = state.orders.get_order(order_id).await?;
    if order.customer_id() != customer_id {
        return Err(OrderError::not_found(Resource::Order, order_id).into());
    }
    Ok(Json(order))
}

/// List the caller's orders.
pub async fn list_orders(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrderListResponse>, AppError> {
    let Query(query) = query?;

    let page = state
        .orders
        .list_orders(customer_id, query.page, query.page_size)
        .await?;

    Ok(Json(OrderListResponse {
        data: page.items,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Apply a lifecycle event.
///
/// Called by fulfilment and back-office collaborators rather than customers.
pub async fn update_order_status(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    path: Result<Path<OrderId>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let Path(order_id) = path?;
    let Json(request) = payload?;

    let order = state
        .orders
        .update_order_status(order_id, request.event)
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        order_id = %order_id,
        event = %request.event,
        status = %order.status,
        "Order status updated via HTTP"
    );
    Ok(Json(order))
}
