use std::sync::Arc;

use saarthi_conversations::{ConversationTracker, EscalationEngine};
use saarthi_domain::config::Config;
use saarthi_handoff::HandoffManager;

use crate::calls::CallSupervisor;

/// Shared application state passed to all API handlers.
///
/// Every core component is an explicit object constructed at startup and
/// threaded through here — there are no process-wide singletons, and tests
/// build their own instances.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Core components ───────────────────────────────────────────────
    pub tracker: Arc<ConversationTracker>,
    pub engine: Arc<EscalationEngine>,
    pub manager: Arc<HandoffManager>,

    // ── Call supervision ──────────────────────────────────────────────
    pub calls: Arc<CallSupervisor>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}
