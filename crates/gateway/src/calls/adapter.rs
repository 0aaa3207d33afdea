//! Tracking adapter — pipeline events in, tracker/engine/manager calls out.
//!
//! Consumes one call's event stream: user transcriptions and failed tool
//! results trigger an escalation check; assistant fragments accumulate until
//! the response ends; end-of-call tears the conversation down. The adapter is
//! the single writer for its call's state.

use std::sync::Arc;

use async_trait::async_trait;

use saarthi_conversations::{ConversationTracker, EscalationEngine};
use saarthi_domain::model::{DriverInfo, HandoffAlert, HandoffTrigger};
use saarthi_handoff::HandoffManager;
use saarthi_nlu::ResponseSanitizer;

use crate::calls::pipeline::PipelineEvent;
use crate::events::EventCallback;

/// Invoked exactly once per conversation when escalation fires. Errors are
/// caught and logged; they never affect the handoff itself.
#[async_trait]
pub trait HandoffHook: Send + Sync {
    async fn on_handoff_triggered(&self, alert: &HandoffAlert) -> saarthi_domain::Result<()>;
}

pub struct TrackingAdapter {
    call_id: String,
    tracker: Arc<ConversationTracker>,
    engine: Arc<EscalationEngine>,
    manager: Arc<HandoffManager>,
    events: Arc<EventCallback>,
    sanitizer: Arc<ResponseSanitizer>,
    hook: Option<Arc<dyn HandoffHook>>,

    response_buffer: String,
    in_response: bool,
    current_tool: Option<String>,
    handoff_triggered: bool,
}

impl TrackingAdapter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        call_id: &str,
        room_name: &str,
        driver_info: Option<DriverInfo>,
        tracker: Arc<ConversationTracker>,
        engine: Arc<EscalationEngine>,
        manager: Arc<HandoffManager>,
        events: Arc<EventCallback>,
        sanitizer: Arc<ResponseSanitizer>,
        hook: Option<Arc<dyn HandoffHook>>,
    ) -> Self {
        tracker.create(call_id, room_name, driver_info);
        Self {
            call_id: call_id.to_owned(),
            tracker,
            engine,
            manager,
            events,
            sanitizer,
            hook,
            response_buffer: String::new(),
            in_response: false,
            current_tool: None,
            handoff_triggered: false,
        }
    }

    /// Process one pipeline event. Returns `false` once the call has ended
    /// and the consumer loop should stop.
    pub async fn handle(&mut self, event: PipelineEvent) -> bool {
        match event {
            PipelineEvent::Transcription { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return true;
                }
                let _ = self.tracker.add_user_turn(&self.call_id, text, true);
                self.events
                    .emit_transcript(&self.call_id, "user", text)
                    .await;
                self.check_escalation().await;
            }
            PipelineEvent::ResponseStart => {
                self.in_response = true;
                self.response_buffer.clear();
            }
            PipelineEvent::TextFragment { text } => {
                if self.in_response {
                    self.response_buffer.push_str(&text);
                }
            }
            PipelineEvent::ResponseEnd => {
                self.in_response = false;
                if !self.response_buffer.is_empty() {
                    let clean = self.sanitizer.sanitize(&self.response_buffer);
                    if !clean.is_empty() {
                        let _ = self.tracker.add_assistant_turn(&self.call_id, &clean, None);
                        self.events
                            .emit_transcript(&self.call_id, "assistant", &clean)
                            .await;
                    }
                    self.response_buffer.clear();
                }
            }
            PipelineEvent::ToolStart { name } => {
                self.current_tool = Some(name);
            }
            PipelineEvent::ToolResult { name, result } => {
                let tool = name.or_else(|| self.current_tool.take());
                let Some(tool) = tool else {
                    tracing::debug!(call_id = %self.call_id, "tool result with no known tool");
                    return true;
                };
                self.current_tool = None;

                let success = result
                    .as_ref()
                    .map(|v| !value_text(v).to_lowercase().contains("error"))
                    .unwrap_or(false);
                self.tracker
                    .record_tool_call(&self.call_id, &tool, success, result);

                if !success {
                    self.check_escalation().await;
                }
            }
            PipelineEvent::End => {
                tracing::info!(call_id = %self.call_id, "call ended, cleaning up");
                let _ = self.tracker.remove(&self.call_id);
                let _ = self.manager.abandon_for_call(&self.call_id).await;
                return false;
            }
        }
        true
    }

    async fn check_escalation(&mut self) {
        if self.handoff_triggered {
            return;
        }

        let engine = self.engine.clone();
        let Some(outcome) = self
            .tracker
            .update(&self.call_id, |state| engine.compute(state))
        else {
            return;
        };
        let Some(state) = self.tracker.get(&self.call_id) else {
            return;
        };

        match outcome.trigger {
            Some(trigger) if self.engine.should_escalate(&state) => {
                self.trigger_handoff(trigger).await;
            }
            _ => {
                if self.engine.should_warn(&state) {
                    tracing::warn!(
                        call_id = %self.call_id,
                        confidence = format!("{:.2}", outcome.confidence),
                        "escalation confidence approaching threshold"
                    );
                }
            }
        }
    }

    async fn trigger_handoff(&mut self, trigger: HandoffTrigger) {
        if self.handoff_triggered {
            return;
        }
        self.handoff_triggered = true;

        // Flip the write-once flag under the tracker's lock; a second pass
        // (or a racing path) gets None and backs off.
        let snapshot = self
            .tracker
            .update(&self.call_id, |state| {
                if state.escalation_triggered {
                    None
                } else {
                    state.escalation_triggered = true;
                    state.escalation_trigger = Some(trigger);
                    Some(state.clone())
                }
            })
            .flatten();
        let Some(snapshot) = snapshot else {
            return;
        };

        let priority = self.engine.priority(&snapshot, trigger);
        tracing::warn!(
            call_id = %self.call_id,
            trigger = ?trigger,
            priority = ?priority,
            "handoff triggered"
        );

        match self
            .manager
            .trigger_handoff(&snapshot, trigger, priority)
            .await
        {
            Ok(alert) => {
                self.events
                    .emit_handoff_request(&self.call_id, &alert.trigger_description)
                    .await;
                if let Some(hook) = &self.hook {
                    if let Err(e) = hook.on_handoff_triggered(&alert).await {
                        tracing::error!(call_id = %self.call_id, error = %e, "handoff hook failed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(call_id = %self.call_id, error = %e, "failed to queue handoff");
            }
        }
    }
}

/// Plain text for a tool result: strings verbatim, everything else as JSON.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
