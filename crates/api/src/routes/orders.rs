//! Order lifecycle endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Checkout, Money, Order, OrderStatus, PaymentMethod};
use engine::{OrderLineSpec, OrderSpec};
use serde::Deserialize;

use super::{parse_index, parse_param};
use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct DiscountRequest {
    /// Discount in cents.
    pub amount: Money,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub method: Option<PaymentMethod>,
}

// -- Handlers --

/// POST /orders: place a new order.
#[tracing::instrument(skip(state, caller, spec), fields(restaurant_id = %caller.restaurant_id()))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(spec): Json<OrderSpec>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.engine.create_order(&caller.0, spec).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: open orders, oldest first.
pub async fn list(State(state): State<AppState>, caller: Caller) -> Json<Vec<Order>> {
    Json(state.engine.list_open_orders(caller.restaurant_id()).await)
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = order_id(&id)?;
    let order = state
        .engine
        .get_order(caller.restaurant_id(), order_id)
        .await?;
    Ok(Json(order))
}

/// PATCH /orders/{id}/status: advance the order one step.
#[tracing::instrument(skip(state, caller, req), fields(to = %req.status))]
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .update_status(caller.restaurant_id(), order_id(&id)?, req.status)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, caller, req))]
pub async fn cancel(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .cancel_order(caller.restaurant_id(), order_id(&id)?, req.reason)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/items: append a line.
pub async fn add_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(line): Json<OrderLineSpec>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .add_item(caller.restaurant_id(), order_id(&id)?, line)
        .await?;
    Ok(Json(order))
}

/// PATCH /orders/{id}/items/{index}: change a line's quantity.
pub async fn update_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, index)): Path<(String, String)>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .update_item_quantity(
            caller.restaurant_id(),
            order_id(&id)?,
            parse_index(&index)?,
            req.quantity,
        )
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}/items/{index}
pub async fn remove_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, index)): Path<(String, String)>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .remove_item(caller.restaurant_id(), order_id(&id)?, parse_index(&index)?)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/discount
pub async fn discount(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<DiscountRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .engine
        .apply_discount(caller.restaurant_id(), order_id(&id)?, req.amount)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/checkout: stage a payment with the gateway.
///
/// Retries and timeouts are handled by the engine; a 502 means every
/// attempt failed and the order is flagged for attention.
#[tracing::instrument(skip(state, caller, req))]
pub async fn checkout(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<Checkout>, ApiError> {
    let checkout = state
        .engine
        .create_checkout(caller.restaurant_id(), order_id(&id)?, req.method)
        .await?;
    Ok(Json(checkout))
}

fn order_id(raw: &str) -> Result<OrderId, ApiError> {
    parse_param(raw, "order id", OrderId::parse)
}
