//! Cart endpoints for the authenticated customer.

#![allow(clippy::missing_errors_doc)] // every handler fails with AppError

use crate::error::AppError;
use crate::extractors::AuthenticatedCustomer;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use order_engine_core::cart::Cart;
use order_engine_core::types::{Money, ProductId};
use serde::Deserialize;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Product to add
    pub product_id: ProductId,
    /// Units wanted
    pub quantity: u32,
    /// Unit price in cents; the catalog price when omitted
    #[serde(default)]
    pub unit_price: Option<Money>,
}

/// Body of `PUT /api/cart/items/:product_id`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    /// New quantity; zero removes the line
    pub quantity: u32,
}

/// Return the caller's cart, creating it on first use.
pub async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.carts.get_or_create_cart(customer_id).await?))
}

/// Add a line or replace an existing one.
pub async fn add_item(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let Json(request) = payload?;
    let cart = state
        .carts
        .add_item(
            customer_id,
            request.product_id,
            request.quantity,
            request.unit_price,
        )
        .await?;
    Ok(Json(cart))
}

/// Change a line's quantity.
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    path: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let Path(product_id) = path?;
    let Json(request) = payload?;
    let cart = state
        .carts
        .update_quantity(customer_id, product_id, request.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a line.
pub async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedCustomer(customer_id): AuthenticatedCustomer,
    path: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Cart>, AppError> {
    let Path(product_id) = path?;
    let cart = state.carts.remove_item(customer_id, product_id).await?;
    Ok(Json(cart))
}
