use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend event callback
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where to POST call events (transcripts, handoff requests, errors).
/// Delivery is best-effort; failures are logged and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "d_url")]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: d_url(),
            enabled: false,
        }
    }
}

fn d_url() -> String {
    "http://localhost:3000".into()
}
