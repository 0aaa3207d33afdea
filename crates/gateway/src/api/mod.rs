pub mod auth;
pub mod calls;
pub mod dashboard_ws;
pub mod handoff;
pub mod health;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Health probes and the dashboard WebSocket are public (the WS carries its
/// own `?token=` check since browsers cannot set headers on the handshake);
/// everything else sits behind the bearer-token middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .route("/handoff/ws", get(dashboard_ws::dashboard_ws));

    let protected = Router::new()
        // Handoff queue & lifecycle
        .route("/handoff/queue", get(handoff::list_queue))
        .route("/handoff/queue/stats", get(handoff::queue_stats))
        .route("/handoff/alert/:id", get(handoff::get_alert))
        .route("/handoff/alert/:id/brief", get(handoff::get_brief))
        .route("/handoff/assign", post(handoff::assign))
        .route("/handoff/start/:id", post(handoff::start))
        .route("/handoff/complete", post(handoff::complete))
        .route("/handoff/cancel", post(handoff::cancel))
        .route("/handoff/status/:call_id", get(handoff::status))
        // Call supervision & pipeline ingestion
        .route("/call/join", post(calls::join))
        .route("/call/leave", post(calls::leave))
        .route("/call/list", get(calls::list_calls))
        .route("/call/status/:call_id", get(calls::call_status))
        .route("/call/:call_id/events", post(calls::ingest_event))
        .route("/call/:call_id/escalation", get(calls::escalation_status))
        .route("/call/:call_id/summary", get(calls::summary))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
