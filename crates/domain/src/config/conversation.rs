use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// BCP-47 language tag assumed for drivers with no stated preference.
    #[serde(default = "d_language")]
    pub default_language: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_language: d_language(),
        }
    }
}

fn d_language() -> String {
    "hi-IN".into()
}
