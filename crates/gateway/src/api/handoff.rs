//! Handoff API endpoints consumed by operator dashboards.
//!
//! JSON keys are lowercase snake_case; timestamps are RFC-3339 UTC. Unknown
//! alert ids map to 404, malformed ids and invalid lifecycle transitions to
//! 400, token-minting failures to 502.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use saarthi_domain::model::HandoffAlert;
use saarthi_domain::Error;

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a domain error onto the HTTP contract.
fn domain_error(e: Error) -> Response {
    let status = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) | Error::MalformedInput(_) => StatusCode::BAD_REQUEST,
        Error::Token(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

fn parse_alert_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("malformed alert id: {raw}")))
}

/// Queue-listing projection of one alert.
fn alert_summary(alert: &HandoffAlert) -> serde_json::Value {
    serde_json::json!({
        "id": alert.id,
        "conversation_id": alert.conversation_id,
        "call_id": alert.call_id,
        "trigger": alert.trigger,
        "priority": alert.priority,
        "status": alert.status,
        "driver_phone_last_4": alert.driver_info.phone_last_4(),
        "driver_city": alert.driver_info.city,
        "driver_language": alert.driver_info.preferred_language,
        "issue_summary": alert.issue_summary,
        "queue_position": alert.queue_position,
        "estimated_wait_seconds": alert.estimated_wait_seconds,
        "assigned_agent_id": alert.assigned_agent_id,
        "created_at": alert.created_at.to_rfc3339(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /handoff/queue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_queue(State(state): State<AppState>) -> impl IntoResponse {
    let summaries: Vec<serde_json::Value> = state
        .manager
        .list_queue()
        .iter()
        .map(alert_summary)
        .collect();
    Json(summaries)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /handoff/queue/stats
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn queue_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.queue_stats())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /handoff/alert/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.manager.get_alert(alert_id) {
        Some(alert) => Json(alert).into_response(),
        None => api_error(StatusCode::NOT_FOUND, format!("alert {alert_id} not found")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /handoff/alert/:id/brief
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_brief(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.manager.agent_brief(alert_id) {
        Some(brief) => Json(brief).into_response(),
        None => api_error(StatusCode::NOT_FOUND, format!("alert {alert_id} not found")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /handoff/assign
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub alert_id: String,
    pub agent_id: String,
}

pub async fn assign(
    State(state): State<AppState>,
    Json(body): Json<AssignBody>,
) -> Response {
    let alert_id = match parse_alert_id(&body.alert_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.manager.assign_agent(alert_id, &body.agent_id).await {
        Ok(alert) => Json(serde_json::json!({
            "status": "assigned",
            "alert_id": alert.id,
            "agent_id": body.agent_id,
            "call_id": alert.call_id,
        }))
        .into_response(),
        Err(e) => domain_error(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /handoff/start/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let alert_id = match parse_alert_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.manager.start_handoff_call(alert_id).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => domain_error(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /handoff/complete
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub alert_id: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn complete(
    State(state): State<AppState>,
    Json(body): Json<CompleteBody>,
) -> Response {
    let alert_id = match parse_alert_id(&body.alert_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Some(notes) = &body.notes {
        tracing::debug!(alert_id = %alert_id, notes = %notes, "completion notes");
    }
    // Unknown alerts are a logged no-op by contract.
    let _ = state.manager.complete_handoff(alert_id, body.resolution).await;
    Json(serde_json::json!({
        "status": "completed",
        "alert_id": alert_id,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /handoff/cancel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub alert_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<AppState>,
    Json(body): Json<CancelBody>,
) -> Response {
    let alert_id = match parse_alert_id(&body.alert_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.manager.cancel_handoff(alert_id, body.reason).await {
        Ok(alert) => Json(serde_json::json!({
            "status": "cancelled",
            "alert_id": alert.id,
        }))
        .into_response(),
        Err(e) => domain_error(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /handoff/status/:call_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.manager.status(&call_id) {
        Some(view) => {
            let mut value = serde_json::to_value(&view).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("in_handoff".into(), serde_json::json!(true));
            }
            Json(value).into_response()
        }
        None => Json(serde_json::json!({ "in_handoff": false })).into_response(),
    }
}
