use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth;
use crate::error::QueueError;
use crate::services::fanout::QueueEvent;

/// Query parameters for the per-user stream. Browsers cannot set an
/// `Authorization` header on a WebSocket handshake, so the token rides in
/// the query string.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub token: String,
}

/// GET /api/v1/salons/:salon_id/stream — live queue board for one salon.
///
/// On connect the full snapshot is sent first, then every event for the
/// salon in the order the queue store produced them. The stream makes no
/// delivery guarantee across a disconnect gap; a lagged subscriber gets a
/// fresh snapshot, and a client text frame `"resync"` requests one at any
/// time.
pub async fn salon_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(salon_id): Path<Uuid>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        run_stream(socket, state, StreamFilter::Salon(salon_id))
    })
}

/// GET /api/v1/me/stream — this user's entries across all salons.
pub async fn user_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<impl IntoResponse, QueueError> {
    let identity = auth::verify_token(&params.token, &state.jwt_decoding)?;
    Ok(ws.on_upgrade(move |socket| {
        run_stream(socket, state, StreamFilter::User(identity.user_id))
    }))
}

enum StreamFilter {
    Salon(Uuid),
    User(String),
}

impl StreamFilter {
    fn matches(&self, event: &QueueEvent) -> bool {
        match self {
            StreamFilter::Salon(salon_id) => event.salon_id == *salon_id,
            StreamFilter::User(user_id) => event.user_id.as_deref() == Some(user_id),
        }
    }
}

async fn snapshot_frame(state: &AppState, filter: &StreamFilter) -> String {
    let data = match filter {
        StreamFilter::Salon(salon_id) => {
            serde_json::to_value(state.store.snapshot(*salon_id).await)
        }
        StreamFilter::User(user_id) => {
            serde_json::to_value(state.store.user_entries(user_id).await)
        }
    }
    .unwrap_or(serde_json::Value::Null);
    serde_json::json!({ "type": "snapshot", "data": data }).to_string()
}

fn event_frame(event: &QueueEvent) -> String {
    serde_json::json!({ "type": "event", "data": event }).to_string()
}

/// Manage one subscriber connection after upgrade.
///
/// Subscribes to the bus *before* taking the snapshot, so no event that
/// postdates the snapshot can be missed; duplicates are fine since events
/// are invalidation signals.
async fn run_stream(socket: WebSocket, state: AppState, filter: StreamFilter) {
    let conn_id = Uuid::new_v4();
    tracing::info!(conn_id = %conn_id, "stream subscriber connected");

    let mut rx = state.bus.subscribe();
    let (mut sink, mut inbound) = socket.split();

    let frame = snapshot_frame(&state, &filter).await;
    if sink.send(Message::Text(frame.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    if sink.send(Message::Text(event_frame(&event).into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // Dropped events; push a fresh snapshot instead.
                    tracing::warn!(conn_id = %conn_id, missed, "subscriber lagged, resyncing");
                    let frame = snapshot_frame(&state, &filter).await;
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Text(text))) if text.as_str() == "resync" => {
                    let frame = snapshot_frame(&state, &filter).await;
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "stream receive error");
                    break;
                }
            },
        }
    }

    tracing::info!(conn_id = %conn_id, "stream subscriber disconnected");
}
