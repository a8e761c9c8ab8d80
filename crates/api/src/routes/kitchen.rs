//! Kitchen display endpoints.

use axum::Json;
use axum::extract::{Path, State};
use common::KotId;
use domain::{KitchenTicket, LineStatus};
use engine::TicketView;
use serde::Deserialize;

use super::{parse_index, parse_param};
use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LineStatusRequest {
    pub status: LineStatus,
}

/// GET /kot: active tickets in board order.
pub async fn list(State(state): State<AppState>, caller: Caller) -> Json<Vec<TicketView>> {
    Json(state.engine.list_active_tickets(caller.restaurant_id()).await)
}

/// GET /kot/{id}
pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<KitchenTicket>, ApiError> {
    let ticket = state
        .engine
        .get_ticket(caller.restaurant_id(), kot_id(&id)?)
        .await?;
    Ok(Json(ticket))
}

/// PATCH /kot/{id}/items/{index}/status
#[tracing::instrument(skip(state, caller, req), fields(to = %req.status))]
pub async fn update_line_status(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, index)): Path<(String, String)>,
    Json(req): Json<LineStatusRequest>,
) -> Result<Json<KitchenTicket>, ApiError> {
    let ticket = state
        .engine
        .update_line_status(
            caller.restaurant_id(),
            kot_id(&id)?,
            parse_index(&index)?,
            req.status,
        )
        .await?;
    Ok(Json(ticket))
}

/// PATCH /kot/{id}/complete: mark every remaining line ready.
#[tracing::instrument(skip(state, caller))]
pub async fn complete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<KitchenTicket>, ApiError> {
    let ticket = state
        .engine
        .complete_ticket(caller.restaurant_id(), kot_id(&id)?)
        .await?;
    Ok(Json(ticket))
}

fn kot_id(raw: &str) -> Result<KotId, ApiError> {
    parse_param(raw, "ticket id", KotId::parse)
}
