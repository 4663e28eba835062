//! Product lookup and administrative stock edits.
//!
//! `POST /api/products/:id/stock` takes `{ "action": "withdraw" | "credit", "quantity": n }`.
//! A withdrawal larger than the stock on hand is refused with 409 and
//! changes nothing.

#![allow(clippy::missing_errors_doc)] // every handler fails with AppError

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use order_engine_core::types::{Product, ProductId};
use order_engine_runtime::StockAdjustment;

/// Return a product with its committed stock.
pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(product_id) = path?;
    Ok(Json(state.stock.get_product(product_id).await?))
}

/// Withdraw or credit stock; returns the product afterwards.
pub async fn adjust_stock(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    path: Result<Path<ProductId>, PathRejection>,
    payload: Result<Json<StockAdjustment>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(product_id) = path?;
    let Json(adjustment) = payload?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        product_id = %product_id,
        action = adjustment.as_str(),
        quantity = adjustment.quantity(),
        "Stock adjustment requested"
    );

    let product = state.stock.adjust(product_id, adjustment).await?;
    Ok(Json(product))
}
