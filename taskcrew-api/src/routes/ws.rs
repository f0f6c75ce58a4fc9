/// WebSocket endpoint for live task events
///
/// A connection authenticates with its bearer token passed as a query
/// parameter (browsers cannot set headers on a WebSocket upgrade), then
/// exchanges JSON frames:
///
/// ```text
/// client -> server: {"event": "join_team",    "teamId": "..."}
///                   {"event": "leave_team",   "teamId": "..."}
///                   {"event": "new_task",     "teamId": "...", "payload": {...}}
///                   {"event": "task_update",  "teamId": "...", "payload": {...}}
///                   {"event": "task_comment", "teamId": "...", "payload": {...}}
/// server -> client: {"event": "task_created", "teamId": "...", "payload": {...}}
///                   {"event": "task_updated", "teamId": "...", "payload": {...}}
///                   {"event": "new_comment",  "teamId": "...", "payload": {...}}
///                   {"event": "error",        "message": "..."}
/// ```
///
/// Joining a team's channel requires membership in that team; a
/// non-member's join is answered with an error frame and no subscription.
/// A connection may hold any number of team subscriptions; all of them are
/// dropped when the socket disconnects. Delivery is best-effort: a
/// subscriber that falls too far behind loses oldest events rather than
/// stalling the channel, and per-recipient send failures never abort
/// delivery to the rest.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use taskcrew_shared::{
    auth::middleware::authenticate,
    models::{membership::Membership, user::User},
    realtime::{EventKind, TeamEvent},
};

use crate::{app::AppState, error::ApiError};

/// Outbound frame buffer per connection
const OUTBOUND_BUFFER: usize = 64;

/// WebSocket query parameters
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer token, normally sent via the Authorization header
    pub token: String,
}

/// Frames a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    JoinTeam { team_id: Uuid },

    #[serde(rename_all = "camelCase")]
    LeaveTeam { team_id: Uuid },

    #[serde(rename_all = "camelCase")]
    NewTask { team_id: Uuid, payload: JsonValue },

    #[serde(rename_all = "camelCase")]
    TaskUpdate { team_id: Uuid, payload: JsonValue },

    #[serde(rename_all = "camelCase")]
    TaskComment { team_id: Uuid, payload: JsonValue },
}

/// WebSocket upgrade handler
///
/// Validates the token before upgrading; an invalid token fails the
/// upgrade with 401 like any other protected route.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let context = authenticate(&query.token, state.jwt_secret())?;

    // The token may outlive its account; resolve the user before upgrading.
    User::find_by_id(&state.db, context.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, context.user_id)))
}

/// Drives one connection until it disconnects
async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    tracing::info!(user_id = %user_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // All outbound traffic (subscription fan-out and error frames) funnels
    // through one writer task.
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    // team_id -> forwarding task for that subscription
    let mut subscriptions: HashMap<Uuid, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, user_id, &text, &tx, &mut subscriptions).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary: ignored
                }
            }
            // The peer is gone when the writer exits; stop reading too.
            _ = &mut writer => break,
        }
    }

    // Disconnected: drop every subscription.
    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
    writer.abort();

    tracing::info!(user_id = %user_id, "WebSocket disconnected");
}

/// Dispatches one parsed client frame
async fn handle_frame(
    state: &AppState,
    user_id: Uuid,
    text: &str,
    tx: &mpsc::Sender<Message>,
    subscriptions: &mut HashMap<Uuid, JoinHandle<()>>,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => {
            send_error(tx, "Unrecognized message").await;
            return;
        }
    };

    match frame {
        ClientFrame::JoinTeam { team_id } => {
            if subscriptions.contains_key(&team_id) {
                return;
            }

            if !is_member(state, team_id, user_id).await {
                send_error(tx, "Not a member of this team").await;
                return;
            }

            let receiver = state.channels.subscribe(team_id).await;
            let handle = tokio::spawn(forward_events(receiver, tx.clone()));
            subscriptions.insert(team_id, handle);
            tracing::debug!(user_id = %user_id, team_id = %team_id, "Joined team channel");
        }

        ClientFrame::LeaveTeam { team_id } => {
            if let Some(handle) = subscriptions.remove(&team_id) {
                handle.abort();
                tracing::debug!(user_id = %user_id, team_id = %team_id, "Left team channel");
            }
        }

        ClientFrame::NewTask { team_id, payload } => {
            relay(state, user_id, team_id, EventKind::TaskCreated, payload, tx).await;
        }
        ClientFrame::TaskUpdate { team_id, payload } => {
            relay(state, user_id, team_id, EventKind::TaskUpdated, payload, tx).await;
        }
        ClientFrame::TaskComment { team_id, payload } => {
            relay(state, user_id, team_id, EventKind::NewComment, payload, tx).await;
        }
    }
}

/// Publishes a client-originated event to the team's channel
///
/// The payload is echoed to every subscriber as-is; only members may
/// publish into a team's channel.
async fn relay(
    state: &AppState,
    user_id: Uuid,
    team_id: Uuid,
    kind: EventKind,
    payload: JsonValue,
    tx: &mpsc::Sender<Message>,
) {
    if !is_member(state, team_id, user_id).await {
        send_error(tx, "Not a member of this team").await;
        return;
    }

    state
        .channels
        .publish(team_id, TeamEvent::new(kind, team_id, payload))
        .await;
}

/// Forwards a team subscription to the connection's writer
///
/// Runs until the channel closes or the connection's writer goes away. A
/// lagged receiver skips the lost events and keeps going; this channel is
/// best-effort, not a replay log.
async fn forward_events(
    mut receiver: broadcast::Receiver<TeamEvent>,
    tx: mpsc::Sender<Message>,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if tx.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "WebSocket subscriber lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Membership check backing join and publish
///
/// A store failure denies rather than erroring the connection.
async fn is_member(state: &AppState, team_id: Uuid, user_id: Uuid) -> bool {
    Membership::find(&state.db, team_id, user_id)
        .await
        .map(|m| m.is_some())
        .unwrap_or(false)
}

/// Sends an error frame, ignoring a closed connection
async fn send_error(tx: &mpsc::Sender<Message>, message: &str) {
    let frame = json!({ "event": "error", "message": message }).to_string();
    let _ = tx.send(Message::Text(frame)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_parsing() {
        let team_id = Uuid::new_v4();

        let frame: ClientFrame =
            serde_json::from_str(&format!(r#"{{"event":"join_team","teamId":"{}"}}"#, team_id))
                .unwrap();
        assert!(matches!(frame, ClientFrame::JoinTeam { team_id: t } if t == team_id));

        let frame: ClientFrame = serde_json::from_str(&format!(
            r#"{{"event":"task_update","teamId":"{}","payload":{{"title":"x"}}}}"#,
            team_id
        ))
        .unwrap();
        assert!(matches!(frame, ClientFrame::TaskUpdate { payload, .. } if payload["title"] == "x"));

        assert!(serde_json::from_str::<ClientFrame>(r#"{"event":"unknown"}"#).is_err());
    }
}
