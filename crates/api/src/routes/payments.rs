//! Inbound payment provider callbacks.

use axum::Json;
use axum::extract::State;
use common::OrderId;
use domain::Order;
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SettledRequest {
    pub order_id: OrderId,
}

/// POST /payments/settled: the provider confirmed payment.
///
/// Idempotent: settling a paid order returns it unchanged.
#[tracing::instrument(skip(state, caller, req), fields(order_id = %req.order_id))]
pub async fn settled(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<SettledRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .settle_payment(caller.restaurant_id(), req.order_id)
        .await?;
    Ok(Json(order))
}
