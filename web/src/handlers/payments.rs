//! Payment outcome intake.
//!
//! `POST /api/payments/events` receives `{ "order_id": ..., "kind": "PaymentConfirmed" }`
//! from the payment collaborator. Redeliveries of an already applied event
//! answer 200 with the current order.

#![allow(clippy::missing_errors_doc)] // every handler fails with AppError

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use order_engine_core::types::Order;
use order_engine_runtime::PaymentEvent;

/// Apply a payment outcome to its order.
pub async fn payment_event(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    payload: Result<Json<PaymentEvent>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let Json(event) = payload?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        order_id = %event.order_id,
        kind = ?event.kind,
        "Payment event received"
    );

    let order = state.payments.handle(event).await?;
    Ok(Json(order))
}
