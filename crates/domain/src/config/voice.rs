use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Voice room provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the external voice-room provider. The core never
/// joins rooms itself; it only mints operator join tokens against these
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// WebSocket URL of the room provider (handed to operators as join_url).
    #[serde(default)]
    pub url: String,
    /// Environment variable holding the room API key (token `iss` claim).
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Environment variable holding the room API secret (HS256 signing key).
    #[serde(default = "d_api_secret_env")]
    pub api_secret_env: String,
    /// Operator join-token lifetime.
    #[serde(default = "d_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key_env: d_api_key_env(),
            api_secret_env: d_api_secret_env(),
            token_ttl_seconds: d_token_ttl(),
        }
    }
}

fn d_api_key_env() -> String {
    "SAARTHI_ROOM_API_KEY".into()
}
fn d_api_secret_env() -> String {
    "SAARTHI_ROOM_API_SECRET".into()
}
fn d_token_ttl() -> u64 {
    3600
}
