//! WebSocket endpoint for live restaurant updates.
//!
//! The first frame is always a snapshot. After that the client receives
//! `event` frames for what its role may see and can send `resync` or `ping`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use realtime::{Inbound, Outbound, SubscriptionHandle};
use tokio::sync::mpsc::UnboundedReceiver;

use super::live::SnapshotParams;
use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

/// GET /ws: upgrade to a realtime subscription.
///
/// The subscription is opened before the upgrade so a rejected caller gets a
/// plain HTTP error. If the upgrade never completes, the dropped receiver is
/// pruned on the next delivery.
pub async fn handle(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SnapshotParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let (handle, receiver) = state.gateway.subscribe(&caller.0, params.order_id)?;
    Ok(ws.on_upgrade(move |socket| run(socket, state, handle, receiver)))
}

async fn run(
    socket: WebSocket,
    state: AppState,
    handle: SubscriptionHandle,
    mut receiver: UnboundedReceiver<Outbound>,
) {
    let (mut sink, mut stream) = socket.split();
    metrics::counter!("ws_connections_total", "role" => handle.identity().role.as_str()).increment(1);
    tracing::info!(subscription = %handle.id(), role = %handle.identity().role, "websocket connected");

    if let Err(e) = state.gateway.resync(&handle, state.engine.as_ref()).await {
        tracing::warn!(subscription = %handle.id(), "initial snapshot failed: {e}");
        state.gateway.unsubscribe(&handle);
        return;
    }

    loop {
        tokio::select! {
            outbound = receiver.recv() => {
                let Some(outbound) = outbound else { break };
                let json = match serde_json::to_string(&outbound) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(subscription = %handle.id(), "failed to encode frame: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_inbound(&state, &handle, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(subscription = %handle.id(), "websocket error: {e}");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.gateway.unsubscribe(&handle);
    tracing::info!(subscription = %handle.id(), "websocket disconnected");
}

/// Returns false when the subscription is gone and the socket should close.
async fn handle_inbound(state: &AppState, handle: &SubscriptionHandle, text: &str) -> bool {
    let inbound = match serde_json::from_str::<Inbound>(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::debug!(subscription = %handle.id(), "ignoring client frame: {e}");
            return true;
        }
    };

    let result = match inbound {
        Inbound::Resync => state
            .gateway
            .resync(handle, state.engine.as_ref())
            .await
            .map(|_| ()),
        Inbound::Ping => state.gateway.pong(handle),
    };
    match result {
        Ok(()) => true,
        Err(realtime::RealtimeError::ResyncInProgress(_)) => true,
        Err(e) => {
            tracing::warn!(subscription = %handle.id(), "closing subscription: {e}");
            false
        }
    }
}
