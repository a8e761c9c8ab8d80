//! Table registry endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::TableId;
use domain::{Reservation, Table, TableStatus};
use engine::NewTable;
use serde::Deserialize;

use super::parse_param;
use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TableStatusRequest {
    pub status: TableStatus,
}

/// GET /tables: ordered by table number.
pub async fn list(State(state): State<AppState>, caller: Caller) -> Json<Vec<Table>> {
    Json(state.engine.list_tables(caller.restaurant_id()).await)
}

/// POST /tables
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewTable>,
) -> Result<(StatusCode, Json<Table>), ApiError> {
    let table = state
        .engine
        .create_table(caller.restaurant_id(), new)
        .await?;
    Ok((StatusCode::CREATED, Json(table)))
}

/// PATCH /tables/{id}/status: manual status for cleaning or reservations.
///
/// Occupancy is only ever set by a dine-in order.
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<TableStatusRequest>,
) -> Result<Json<Table>, ApiError> {
    let table = state
        .engine
        .set_table_status(caller.restaurant_id(), table_id(&id)?, req.status)
        .await?;
    Ok(Json(table))
}

/// POST /tables/{id}/reservations
pub async fn add_reservation(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(reservation): Json<Reservation>,
) -> Result<(StatusCode, Json<Table>), ApiError> {
    let table = state
        .engine
        .add_reservation(caller.restaurant_id(), table_id(&id)?, reservation)
        .await?;
    Ok((StatusCode::CREATED, Json(table)))
}

fn table_id(raw: &str) -> Result<TableId, ApiError> {
    parse_param(raw, "table id", TableId::parse)
}
