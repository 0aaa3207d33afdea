mod backend;
mod conversation;
mod server;
mod voice;

pub use backend::*;
pub use conversation::*;
pub use server::*;
pub use voice::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the resolved configuration. Returns all issues found;
    /// an empty vec means the config is usable as-is.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be non-zero".into(),
            });
        }

        if self.voice.url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "voice.url".into(),
                message: "no room provider URL configured; operator join URLs will be empty"
                    .into(),
            });
        }

        if std::env::var(&self.voice.api_secret_env)
            .map(|v| v.is_empty())
            .unwrap_or(true)
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "voice.api_secret_env".into(),
                message: format!(
                    "env var {} is unset; operator token minting will fail",
                    self.voice.api_secret_env
                ),
            });
        }

        if self.backend.enabled && self.backend.url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "backend.url".into(),
                message: "backend events are enabled but no URL is configured".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.conversation.default_language, "hi-IN");
        assert!(!config.backend.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9001

            [voice]
            url = "wss://rooms.example.in"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.voice.url, "wss://rooms.example.in");
        assert_eq!(config.voice.token_ttl_seconds, 3600);
    }

    #[test]
    fn zero_port_is_an_error() {
        let config: Config = toml::from_str("[server]\nport = 0\n").unwrap();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "server.port"));
    }

    #[test]
    fn backend_enabled_without_url_is_an_error() {
        let config: Config =
            toml::from_str("[backend]\nenabled = true\nurl = \"\"\n").unwrap();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "backend.url"));
    }
}
