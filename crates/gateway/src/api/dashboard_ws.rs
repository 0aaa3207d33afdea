//! Dashboard WebSocket endpoint.
//!
//! Flow:
//! 1. Dashboard connects to `/handoff/ws?token=<api-token>`
//! 2. Server sends `queue_sync` with the current queue
//! 3. Server pushes `new_alert` / `alert_update` as the queue changes
//! 4. Client sends `ping` (answered with `pong`) and
//!    `accept {alert_id, agent_id}` (drives assignment, answered with
//!    `assignment_confirmed` carrying the brief, or `error`)
//!
//! Dead sockets are pruned on the next failed send.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use saarthi_handoff::{AlertEvent, AlertSink, SinkClosed};

use crate::api::auth::token_matches;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// API token; required when the server runs with auth enabled.
    pub token: Option<String>,
}

/// Client → server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
    Accept {
        alert_id: String,
        agent_id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /handoff/ws — upgrade to WebSocket.
pub async fn dashboard_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if let Some(expected) = &state.api_token_hash {
        let provided = query.token.as_deref().unwrap_or("");
        if !token_matches(provided, expected) {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                "invalid or missing API token",
            )
                .into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Subscriber bridging the notifier onto this socket's outbound channel.
struct WsAlertSink {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl AlertSink for WsAlertSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkClosed> {
        let frame = match event {
            AlertEvent::NewAlert { alert } => serde_json::json!({
                "type": "new_alert",
                "data": alert,
                "timestamp": Utc::now().to_rfc3339(),
            }),
            AlertEvent::Update { event, alert } => serde_json::json!({
                "type": "alert_update",
                "event": event,
                "data": alert,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        };
        self.tx
            .send(frame.to_string())
            .await
            .map_err(|_| SinkClosed)
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // 1. Initial queue snapshot.
    let sync = serde_json::json!({
        "type": "queue_sync",
        "data": state.manager.list_queue(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    if ws_sink.send(Message::Text(sync.to_string())).await.is_err() {
        return;
    }

    // 2. Single outbound channel: notifier pushes and command replies share
    //    it, so per-socket ordering matches emission order.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let subscriber_id = state
        .manager
        .notifier()
        .subscribe(Arc::new(WsAlertSink { tx: tx.clone() }));

    // Writer task: forwards outbound channel messages to the socket.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Reader loop.
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&state, &tx, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.manager.notifier().unsubscribe(subscriber_id);
    writer.abort();
    tracing::debug!("dashboard socket closed");
}

async fn handle_client_message(state: &AppState, tx: &mpsc::Sender<String>, text: &str) {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => serde_json::json!({
            "type": "pong",
            "timestamp": Utc::now().to_rfc3339(),
        }),
        Ok(ClientMessage::Accept { alert_id, agent_id }) => {
            accept_alert(state, &alert_id, &agent_id).await
        }
        Err(_) => serde_json::json!({
            "type": "error",
            "message": "unrecognized message",
        }),
    };
    let _ = tx.send(reply.to_string()).await;
}

async fn accept_alert(state: &AppState, alert_id: &str, agent_id: &str) -> serde_json::Value {
    let Ok(id) = Uuid::parse_str(alert_id) else {
        return serde_json::json!({
            "type": "error",
            "message": format!("malformed alert id: {alert_id}"),
        });
    };

    match state.manager.assign_agent(id, agent_id).await {
        Ok(alert) => {
            let brief = state.manager.agent_brief(id);
            serde_json::json!({
                "type": "assignment_confirmed",
                "alert_id": alert.id,
                "agent_id": agent_id,
                "call_id": alert.call_id,
                "data": brief,
                "timestamp": Utc::now().to_rfc3339(),
            })
        }
        Err(e) => serde_json::json!({
            "type": "error",
            "message": e.to_string(),
        }),
    }
}
