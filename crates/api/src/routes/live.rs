//! Read-only views: dashboard stats, snapshots and the event journal.

use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use common::{OrderId, Role};
use engine::Snapshot;
use event_store::{EventEnvelope, EventQuery, EventStore, Sequence};
use realtime::{LiveStats, Projection, RealtimeError};
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

pub const DEFAULT_EVENT_LIMIT: usize = 100;
pub const MAX_EVENT_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotParams {
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    #[serde(default)]
    pub after: u64,
    pub limit: Option<usize>,
}

/// GET /stats: counters projected from the current snapshot.
pub async fn stats(State(state): State<AppState>, caller: Caller) -> Json<LiveStats> {
    let snapshot = state.engine.snapshot(caller.restaurant_id()).await;
    let escalate_after = state.engine.config().escalate_after();
    Json(LiveStats::from_snapshot(&snapshot, Utc::now(), escalate_after))
}

/// GET /snapshot: restaurant state with its sequence, cut to what the
/// caller's role follows on the websocket.
///
/// Customers must name their order and only see that order.
pub async fn snapshot(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SnapshotParams>,
) -> Result<Json<Snapshot>, ApiError> {
    let order_filter = match (caller.role(), params.order_id) {
        (Role::Customer, None) => return Err(RealtimeError::OrderFilterRequired.into()),
        (_, filter) => filter,
    };
    let snapshot = state.engine.snapshot(caller.restaurant_id()).await;
    Ok(Json(
        Projection::new(caller.role(), order_filter).snapshot(snapshot),
    ))
}

/// GET /events?after=N&limit=M: journal entries after a sequence.
#[tracing::instrument(skip(state, caller), fields(restaurant_id = %caller.restaurant_id()))]
pub async fn events(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<EventsParams>,
) -> Result<Json<Vec<EventEnvelope>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let query = EventQuery::for_restaurant(caller.restaurant_id())
        .after(Sequence::new(params.after))
        .limit(limit);
    let events = state.engine.journal().query(query).await?;
    Ok(Json(events))
}
