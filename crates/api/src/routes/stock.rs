//! Stock ledger endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::Sku;
use domain::StockItem;
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NewStockItemRequest {
    pub sku: Sku,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub current_stock: u32,
    #[serde(default)]
    pub minimum_stock: u32,
    #[serde(default)]
    pub reorder_level: u32,
}

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

/// GET /stock
pub async fn list(State(state): State<AppState>, caller: Caller) -> Json<Vec<StockItem>> {
    Json(state.engine.list_stock(caller.restaurant_id()).await)
}

/// POST /stock: register an item in the caller's ledger.
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewStockItemRequest>,
) -> Result<(StatusCode, Json<StockItem>), ApiError> {
    let restaurant_id = caller.restaurant_id();
    let item = StockItem {
        sku: req.sku,
        restaurant_id,
        name: req.name,
        unit: req.unit,
        current_stock: req.current_stock,
        minimum_stock: req.minimum_stock,
        reorder_level: req.reorder_level,
    };
    let item = state.engine.add_stock_item(restaurant_id, item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /stock/{sku}/restock
#[tracing::instrument(skip(state, caller, req), fields(quantity = req.quantity))]
pub async fn restock(
    State(state): State<AppState>,
    caller: Caller,
    Path(sku): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<StockItem>, ApiError> {
    let item = state
        .engine
        .restock(caller.restaurant_id(), &Sku::new(sku), req.quantity)
        .await?;
    Ok(Json(item))
}
