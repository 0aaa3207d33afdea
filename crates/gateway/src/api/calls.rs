//! Call supervision endpoints.
//!
//! The telephony layer calls these when a voice session starts and ends, and
//! streams typed pipeline events into `/call/:call_id/events` while the call
//! is live.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use saarthi_domain::model::DriverInfo;
use saarthi_domain::Error;

use crate::calls::PipelineEvent;
use crate::state::AppState;

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /call/join
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub call_id: String,
    pub room_name: String,
    #[serde(default)]
    pub driver_info: Option<DriverInfo>,
}

pub async fn join(
    State(state): State<AppState>,
    Json(body): Json<JoinBody>,
) -> impl IntoResponse {
    let status = state
        .calls
        .join(&body.call_id, &body.room_name, body.driver_info);
    Json(serde_json::json!({
        "success": true,
        "message": "call joined",
        "call_id": status.call_id,
        "room_name": status.room_name,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /call/leave
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LeaveBody {
    pub call_id: String,
}

pub async fn leave(
    State(state): State<AppState>,
    Json(body): Json<LeaveBody>,
) -> Response {
    match state.calls.leave(&body.call_id).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "message": "call left",
            "call_id": body.call_id,
        }))
        .into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /call/:call_id/events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn ingest_event(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(event): Json<PipelineEvent>,
) -> Response {
    match state.calls.ingest(&call_id, event).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(Error::NotFound(msg)) => api_error(StatusCode::NOT_FOUND, msg),
        Err(e) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /call/status/:call_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.calls.status(&call_id) {
        Some(status) => Json(status).into_response(),
        None => Json(serde_json::json!({
            "call_id": call_id,
            "is_active": false,
            "state": "not_found",
        }))
        .into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /call/list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_calls(State(state): State<AppState>) -> impl IntoResponse {
    let calls = state.calls.list();
    Json(serde_json::json!({
        "count": calls.len(),
        "calls": calls,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /call/:call_id/escalation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn escalation_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.tracker.get(&call_id) {
        Some(conversation) => Json(serde_json::json!({
            "active": true,
            "confidence": conversation.escalation_confidence,
            "factors": conversation.escalation_factors,
            "triggered": conversation.escalation_triggered,
            "sentiment": conversation.current_sentiment,
            "repeat_count": conversation.repeat_count,
            "turn_count": conversation.turn_count,
        }))
        .into_response(),
        None => Json(serde_json::json!({ "active": false })).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /call/:call_id/summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn summary(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.tracker.summary(&call_id) {
        Some(summary) => Json(summary).into_response(),
        None => api_error(
            StatusCode::NOT_FOUND,
            format!("no conversation for call {call_id}"),
        ),
    }
}
