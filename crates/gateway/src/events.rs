//! Backend event callback.
//!
//! Best-effort POSTs to the platform backend so its dashboards and call logs
//! stay current: transcript lines, handoff requests, and errors. Delivery
//! failures are logged and dropped — the core never blocks on the backend.

use std::time::Duration;

use saarthi_domain::config::BackendConfig;

pub struct EventCallback {
    client: reqwest::Client,
    base_url: String,
    enabled: bool,
}

impl EventCallback {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            enabled: config.enabled && !config.url.is_empty(),
        }
    }

    /// Disabled sink for tests and dev setups without a backend.
    pub fn disabled() -> Self {
        Self::new(&BackendConfig {
            url: String::new(),
            enabled: false,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn emit_transcript(&self, call_id: &str, speaker: &str, text: &str) {
        self.emit(
            call_id,
            "transcript",
            serde_json::json!({ "speaker": speaker, "text": text }),
        )
        .await;
    }

    pub async fn emit_handoff_request(&self, call_id: &str, reason: &str) {
        self.emit(call_id, "handoff_request", serde_json::json!({ "reason": reason }))
            .await;
    }

    pub async fn emit_error(&self, call_id: &str, error: &str) {
        self.emit(call_id, "error", serde_json::json!({ "error": error }))
            .await;
    }

    async fn emit(&self, call_id: &str, event_type: &str, data: serde_json::Value) {
        if !self.enabled {
            return;
        }

        let url = format!("{}/api/voice/events", self.base_url);
        let mut payload = serde_json::json!({
            "event": event_type,
            "call_id": call_id,
        });
        if let (Some(obj), Some(extra)) = (payload.as_object_mut(), data.as_object()) {
            for (key, value) in extra {
                obj.insert(key.clone(), value.clone());
            }
        }

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    status = %response.status(),
                    event = %event_type,
                    "event callback rejected"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, event = %event_type, "event callback failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_url_empty_or_flag_off() {
        assert!(!EventCallback::disabled().is_enabled());
        let off = EventCallback::new(&BackendConfig {
            url: "http://localhost:3000".into(),
            enabled: false,
        });
        assert!(!off.is_enabled());
        let on = EventCallback::new(&BackendConfig {
            url: "http://localhost:3000".into(),
            enabled: true,
        });
        assert!(on.is_enabled());
    }

    #[tokio::test]
    async fn disabled_emit_is_a_noop() {
        // Must not attempt any network call; nothing to assert beyond
        // returning promptly.
        EventCallback::disabled()
            .emit_transcript("call-1", "user", "hello")
            .await;
    }
}
