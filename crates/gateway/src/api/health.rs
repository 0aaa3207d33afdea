//! Health probes.

use axum::extract::State;
use axum::response::Json;

use crate::state::AppState;

/// GET / — liveness plus the active call count.
pub async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "saarthi",
        "active_calls": state.calls.active_count(),
    }))
}

/// GET /health — readiness detail.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "config": {
            "voice_configured": !state.config.voice.url.is_empty(),
            "backend_events_enabled": state.config.backend.enabled,
            "auth_enabled": state.api_token_hash.is_some(),
        },
    }))
}
