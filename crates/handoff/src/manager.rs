//! Handoff manager — alert construction, queue, and lifecycle.
//!
//! One exclusive lock spans every queue mutation (re-sort, position re-index,
//! index updates); notifier fan-out happens after the lock is released. The
//! caller flips `escalation_triggered` on the live state through the tracker
//! (single writer per call); the manager independently refuses a second alert
//! for the same call_id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use saarthi_domain::model::{
    ActionPriority, ConversationState, ConversationSummary, HandoffAlert, HandoffPriority,
    HandoffStatus, HandoffTrigger, IntentCategory, SentimentLabel, SentimentTrend, SuggestedAction,
};
use saarthi_domain::{Error, Result};

use crate::notifier::AlertNotifier;
use crate::queue::HandoffQueue;
use crate::token::TokenMinter;

/// Advisory wait estimate per queue position, in seconds.
const WAIT_TIME_PER_POSITION: u64 = 60;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Read models
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection info returned when an operator starts the transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferInfo {
    pub status: &'static str,
    pub alert_id: Uuid,
    pub call_id: String,
    pub room_name: String,
    pub agent_id: String,
    pub join_url: String,
    pub join_token: String,
}

/// Handoff status for a call, as seen from the queue or the active set.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HandoffStatusView {
    Queued {
        status: HandoffStatus,
        queue_position: usize,
        estimated_wait: u64,
    },
    Active {
        status: HandoffStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PriorityCounts {
    pub urgent: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_priority: PriorityCounts,
    pub avg_wait_seconds: f64,
}

/// Quick-glance view shown to an operator before accepting.
#[derive(Debug, Clone, Serialize)]
pub struct AgentBrief {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    pub driver_phone_last_4: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_city: Option<String>,
    pub language: String,
    pub top_entities: HashMap<String, serde_json::Value>,
    pub summary: String,
    pub escalation_reason: String,
    pub escalation_description: String,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    pub suggested_actions: Vec<SuggestedAction>,
    pub confidence_trend: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ManagerInner {
    queue: HandoffQueue,
    /// call_id → alert, for handoffs past the QUEUED stage.
    active: HashMap<String, HandoffAlert>,
    completed: Vec<HandoffAlert>,
}

pub struct HandoffManager {
    inner: Mutex<ManagerInner>,
    notifier: AlertNotifier,
    minter: std::sync::Arc<dyn TokenMinter>,
}

impl HandoffManager {
    pub fn new(minter: std::sync::Arc<dyn TokenMinter>) -> Self {
        Self {
            inner: Mutex::new(ManagerInner {
                queue: HandoffQueue::new(),
                active: HashMap::new(),
                completed: Vec::new(),
            }),
            notifier: AlertNotifier::new(),
            minter,
        }
    }

    pub fn notifier(&self) -> &AlertNotifier {
        &self.notifier
    }

    /// Build and enqueue a handoff alert from a conversation snapshot.
    ///
    /// At most one alert may exist per conversation; a second call for the
    /// same call_id is rejected.
    pub async fn trigger_handoff(
        &self,
        state: &ConversationState,
        trigger: HandoffTrigger,
        priority: HandoffPriority,
    ) -> Result<HandoffAlert> {
        let summary = generate_summary(state, trigger);
        let suggestions = generate_suggestions(state, trigger);

        let mut alert = HandoffAlert {
            id: Uuid::new_v4(),
            conversation_id: state.id,
            call_id: state.call_id.clone(),
            room_name: state.room_name.clone(),
            trigger,
            trigger_description: trigger_description(state, trigger),
            priority,
            status: HandoffStatus::Queued,
            driver_info: state.driver_info.clone(),
            intent_history: state.intent_history.clone(),
            current_intent: state.current_intent,
            sentiment: state.current_sentiment,
            sentiment_score: state.sentiment_score,
            issue_summary: summary.one_line_summary.clone(),
            detailed_summary: summary,
            conversation_turns: state.turns.clone(),
            actions_taken_by_bot: state.actions_taken.clone(),
            next_steps_for_agent: suggestions,
            queue_position: 0,
            estimated_wait_seconds: 0,
            assigned_agent_id: None,
            resolution: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
        };

        let queued = {
            let mut inner = self.inner.lock();
            if inner.queue.get_by_call_id(&state.call_id).is_some()
                || inner.active.contains_key(&state.call_id)
            {
                return Err(Error::InvalidState(format!(
                    "handoff already triggered for call {}",
                    state.call_id
                )));
            }

            let position = inner.queue.add(alert.clone());
            let wait = position as u64 * WAIT_TIME_PER_POSITION;
            if let Some(queued) = inner.queue.get_mut(&alert.id) {
                queued.estimated_wait_seconds = wait;
            }
            alert.queue_position = position;
            alert.estimated_wait_seconds = wait;
            inner.queue.get(&alert.id).cloned().unwrap_or(alert)
        };

        self.notifier.notify_new_alert(&queued).await;

        tracing::info!(
            call_id = %queued.call_id,
            trigger = ?trigger,
            priority = ?priority,
            position = queued.queue_position,
            "handoff triggered"
        );

        Ok(queued)
    }

    /// Assign an operator: dequeue, transition QUEUED → ASSIGNED, move into
    /// the active set.
    pub async fn assign_agent(&self, alert_id: Uuid, agent_id: &str) -> Result<HandoffAlert> {
        let alert = {
            let mut inner = self.inner.lock();
            let mut alert = match inner.queue.remove(&alert_id) {
                Some(alert) => alert,
                None => {
                    if inner.active.values().any(|a| a.id == alert_id) {
                        return Err(Error::InvalidState(format!(
                            "alert {alert_id} is not in queued state"
                        )));
                    }
                    return Err(Error::NotFound(format!("alert {alert_id}")));
                }
            };

            alert.status = HandoffStatus::Assigned;
            alert.assigned_agent_id = Some(agent_id.to_owned());
            alert.assigned_at = Some(Utc::now());
            inner.active.insert(alert.call_id.clone(), alert.clone());
            alert
        };

        self.notifier.notify_update(&alert, "assigned").await;
        tracing::info!(alert_id = %alert_id, agent_id = %agent_id, "agent assigned");
        Ok(alert)
    }

    /// Start the transfer: mint an operator join token and transition
    /// ASSIGNED → IN_PROGRESS. A minting failure leaves the alert ASSIGNED.
    pub async fn start_handoff_call(&self, alert_id: Uuid) -> Result<TransferInfo> {
        let (alert, info) = {
            let mut inner = self.inner.lock();
            if inner.queue.get(&alert_id).is_some() {
                return Err(Error::InvalidState(format!(
                    "handoff {alert_id} is not in assigned state"
                )));
            }
            let alert = inner
                .active
                .values_mut()
                .find(|a| a.id == alert_id)
                .ok_or_else(|| Error::NotFound(format!("alert {alert_id}")))?;

            if alert.status != HandoffStatus::Assigned {
                return Err(Error::InvalidState(format!(
                    "handoff {alert_id} is not in assigned state"
                )));
            }

            let agent_id = alert
                .assigned_agent_id
                .clone()
                .ok_or_else(|| Error::InvalidState("assigned alert has no agent".into()))?;

            // Mint before transitioning so a failure leaves no partial state.
            let join_token = self.minter.mint_operator_token(
                &alert.room_name,
                &agent_id,
                "Support Agent",
                self.minter.default_ttl_seconds(),
            )?;

            alert.status = HandoffStatus::InProgress;
            alert.started_at = Some(Utc::now());

            let info = TransferInfo {
                status: "started",
                alert_id,
                call_id: alert.call_id.clone(),
                room_name: alert.room_name.clone(),
                agent_id,
                join_url: self.minter.join_url().to_owned(),
                join_token,
            };
            (alert.clone(), info)
        };

        self.notifier.notify_update(&alert, "started").await;
        tracing::info!(alert_id = %alert_id, "handoff call started");
        Ok(info)
    }

    /// Complete a handoff from any non-terminal state. Unknown alerts log
    /// and no-op.
    pub async fn complete_handoff(
        &self,
        alert_id: Uuid,
        resolution: Option<String>,
    ) -> Option<HandoffAlert> {
        let alert = {
            let mut inner = self.inner.lock();
            let mut alert = inner.queue.remove(&alert_id).or_else(|| {
                let call_id = inner
                    .active
                    .iter()
                    .find(|(_, a)| a.id == alert_id)
                    .map(|(call_id, _)| call_id.clone())?;
                inner.active.remove(&call_id)
            });

            let alert = match alert.as_mut() {
                Some(alert) => alert,
                None => {
                    tracing::warn!(alert_id = %alert_id, "handoff not found for completion");
                    return None;
                }
            };

            alert.status = HandoffStatus::Completed;
            alert.completed_at = Some(Utc::now());
            alert.resolution = resolution;
            let snapshot = alert.clone();
            inner.completed.push(snapshot.clone());
            snapshot
        };

        self.notifier.notify_update(&alert, "completed").await;
        tracing::info!(alert_id = %alert_id, "handoff completed");
        Some(alert)
    }

    /// Cancel an alert from any non-terminal state.
    pub async fn cancel_handoff(
        &self,
        alert_id: Uuid,
        reason: Option<String>,
    ) -> Result<HandoffAlert> {
        let alert = {
            let mut inner = self.inner.lock();
            let mut alert = inner
                .queue
                .remove(&alert_id)
                .or_else(|| {
                    let call_id = inner
                        .active
                        .iter()
                        .find(|(_, a)| a.id == alert_id)
                        .map(|(call_id, _)| call_id.clone())?;
                    inner.active.remove(&call_id)
                })
                .ok_or_else(|| Error::NotFound(format!("alert {alert_id}")))?;

            alert.status = HandoffStatus::Cancelled;
            alert.completed_at = Some(Utc::now());
            alert.resolution = reason;
            inner.completed.push(alert.clone());
            alert
        };

        self.notifier.notify_update(&alert, "cancelled").await;
        tracing::info!(alert_id = %alert_id, "handoff cancelled");
        Ok(alert)
    }

    /// Abandon a still-queued alert whose call ended. No-op when the call
    /// has no queued alert.
    pub async fn abandon_for_call(&self, call_id: &str) -> Option<HandoffAlert> {
        let alert = {
            let mut inner = self.inner.lock();
            let id = inner.queue.get_by_call_id(call_id)?.id;
            let mut alert = inner.queue.remove(&id)?;
            alert.status = HandoffStatus::Abandoned;
            alert.completed_at = Some(Utc::now());
            inner.completed.push(alert.clone());
            alert
        };

        self.notifier.notify_update(&alert, "abandoned").await;
        tracing::info!(call_id = %call_id, "queued handoff abandoned, call ended");
        Some(alert)
    }

    /// Queued alerts in queue order.
    pub fn list_queue(&self) -> Vec<HandoffAlert> {
        self.inner.lock().queue.all()
    }

    /// Find an alert anywhere: queue, active set, or completed log.
    pub fn get_alert(&self, alert_id: Uuid) -> Option<HandoffAlert> {
        let inner = self.inner.lock();
        inner
            .queue
            .get(&alert_id)
            .cloned()
            .or_else(|| inner.active.values().find(|a| a.id == alert_id).cloned())
            .or_else(|| {
                inner
                    .completed
                    .iter()
                    .rev()
                    .find(|a| a.id == alert_id)
                    .cloned()
            })
    }

    /// Non-terminal alert for a call, if any.
    pub fn get_by_call_id(&self, call_id: &str) -> Option<HandoffAlert> {
        let inner = self.inner.lock();
        inner
            .queue
            .get_by_call_id(call_id)
            .cloned()
            .or_else(|| inner.active.get(call_id).cloned())
    }

    /// Handoff status for a call: queued, active, or none.
    pub fn status(&self, call_id: &str) -> Option<HandoffStatusView> {
        let inner = self.inner.lock();
        if let Some(alert) = inner.queue.get_by_call_id(call_id) {
            return Some(HandoffStatusView::Queued {
                status: alert.status,
                queue_position: alert.queue_position,
                estimated_wait: alert.estimated_wait_seconds,
            });
        }
        inner.active.get(call_id).map(|alert| HandoffStatusView::Active {
            status: alert.status,
            agent_id: alert.assigned_agent_id.clone(),
            started_at: alert.started_at,
        })
    }

    pub fn queue_stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        let alerts = inner.queue.all();

        let mut by_priority = PriorityCounts::default();
        for alert in &alerts {
            match alert.priority {
                HandoffPriority::Urgent => by_priority.urgent += 1,
                HandoffPriority::High => by_priority.high += 1,
                HandoffPriority::Medium => by_priority.medium += 1,
                HandoffPriority::Low => by_priority.low += 1,
            }
        }

        let now = Utc::now();
        let waits: Vec<f64> = alerts
            .iter()
            .filter(|a| a.status == HandoffStatus::Queued)
            .map(|a| (now - a.created_at).num_milliseconds().max(0) as f64 / 1000.0)
            .collect();
        let avg_wait_seconds = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<f64>() / waits.len() as f64
        };

        QueueStats {
            total: alerts.len(),
            by_priority,
            avg_wait_seconds,
        }
    }

    /// Quick-glance brief for an operator. Looks in the queue first, then
    /// the active set.
    pub fn agent_brief(&self, alert_id: Uuid) -> Option<AgentBrief> {
        let inner = self.inner.lock();
        let alert = inner
            .queue
            .get(&alert_id)
            .or_else(|| inner.active.values().find(|a| a.id == alert_id))?;

        // The detailed summary mentions "declining" iff the sentiment trend
        // was declining at trigger time.
        let confidence_trend = if alert
            .detailed_summary
            .detailed_summary
            .to_lowercase()
            .contains("declining")
        {
            "declining"
        } else {
            "stable"
        };

        let mut top_entities = HashMap::new();
        for turn in alert.conversation_turns.iter().rev().take(5) {
            if let Some(nlu) = &turn.nlu_result {
                for (key, value) in &nlu.entities {
                    top_entities.entry(key.clone()).or_insert(value.clone());
                }
            }
        }

        Some(AgentBrief {
            driver_name: alert.driver_info.name.clone(),
            driver_phone_last_4: alert.driver_info.phone_last_4(),
            driver_city: alert.driver_info.city.clone(),
            language: alert.driver_info.preferred_language.clone(),
            top_entities,
            summary: alert.issue_summary.clone(),
            escalation_reason: alert.trigger.title(),
            escalation_description: alert.trigger_description.clone(),
            sentiment: alert.sentiment,
            sentiment_score: alert.sentiment_score,
            suggested_actions: alert.next_steps_for_agent.clone(),
            confidence_trend: confidence_trend.to_owned(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary & suggestion generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn generate_summary(state: &ConversationState, trigger: HandoffTrigger) -> ConversationSummary {
    let primary_issue = identify_primary_issue(state, trigger);
    let one_line = format!("{}: {}", trigger.title(), primary_issue);

    let mut parts = Vec::new();
    if let Some(first) = state.user_turns().next() {
        let content = &first.content;
        if content.chars().count() > 100 {
            parts.push(format!(
                "User started with: \"{}...\"",
                truncate_chars(content, 100)
            ));
        } else {
            parts.push(format!("User started with: \"{content}\""));
        }
    }
    if state.repeat_count > 0 {
        parts.push(format!(
            "User repeated similar queries {} times.",
            state.repeat_count
        ));
    }
    if state.sentiment_trend == SentimentTrend::Declining {
        parts.push("User sentiment has been declining throughout the conversation.".into());
    }
    if state.tool_failure_count > 0 {
        parts.push(format!(
            "Bot encountered {} tool failures.",
            state.tool_failure_count
        ));
    }

    let stuck_on = match trigger {
        HandoffTrigger::RepeatedQueries => state.last_repeated_query.clone(),
        HandoffTrigger::BotStuck => {
            Some("Unable to resolve user's request after multiple attempts".into())
        }
        _ => None,
    };

    ConversationSummary {
        one_line_summary: one_line,
        detailed_summary: parts.join(" "),
        primary_issue,
        secondary_issues: Vec::new(),
        stuck_on,
        topics_discussed: extract_topics(state),
        resolution_attempted: state.tool_success_count > 0,
    }
}

fn identify_primary_issue(state: &ConversationState, trigger: HandoffTrigger) -> String {
    if state
        .intent_history
        .contains(&IntentCategory::PaymentIssue)
    {
        return "Payment or refund issue".into();
    }
    if state
        .intent_history
        .contains(&IntentCategory::AccountIssue)
    {
        return "Account related problem".into();
    }

    match trigger {
        HandoffTrigger::ExplicitRequest => "User requested human agent",
        HandoffTrigger::HighFrustration => "User is frustrated with bot responses",
        HandoffTrigger::RepeatedQueries => "Bot unable to answer user's question",
        HandoffTrigger::FraudDetection => "Potential fraud reported",
        HandoffTrigger::SafetyEmergency => "Safety or emergency situation",
        HandoffTrigger::HarassmentReport => "Harassment incident reported",
        HandoffTrigger::ToolFailures => "Technical issues with service",
        HandoffTrigger::LongConversation => "Extended unresolved conversation",
        _ => "Unresolved query",
    }
    .into()
}

/// Set image of the intent history under a fixed intent → topic map,
/// deduplicated in first-seen order.
fn extract_topics(state: &ConversationState) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for intent in &state.intent_history {
        let topic = match intent {
            IntentCategory::TripInquiry => "Trip Status",
            IntentCategory::FaqQuery => "FAQs",
            IntentCategory::PaymentIssue => "Payment",
            IntentCategory::Complaint => "Complaint",
            IntentCategory::SafetyConcern => "Safety",
            IntentCategory::AccountIssue => "Account",
            _ => continue,
        };
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_owned());
        }
    }
    topics
}

fn generate_suggestions(
    state: &ConversationState,
    trigger: HandoffTrigger,
) -> Vec<SuggestedAction> {
    let mut suggestions = Vec::new();

    match trigger {
        HandoffTrigger::FraudDetection => {
            suggestions.push(action(
                "verify_identity",
                "Verify caller's identity with security questions",
                ActionPriority::High,
            ));
            suggestions.push(action(
                "escalate_fraud_team",
                "Escalate to fraud investigation team if confirmed",
                ActionPriority::High,
            ));
        }
        HandoffTrigger::SafetyEmergency => {
            suggestions.push(action(
                "check_safety",
                "Immediately confirm caller's safety status",
                ActionPriority::Urgent,
            ));
            suggestions.push(action(
                "emergency_services",
                "Offer to contact emergency services if needed",
                ActionPriority::Urgent,
            ));
        }
        HandoffTrigger::HarassmentReport => {
            suggestions.push(action(
                "document_incident",
                "Document harassment details for investigation",
                ActionPriority::High,
            ));
            suggestions.push(action(
                "safety_measures",
                "Explain safety measures and block options",
                ActionPriority::High,
            ));
        }
        HandoffTrigger::HighFrustration => {
            suggestions.push(action(
                "empathize",
                "Start with empathy and acknowledge frustration",
                ActionPriority::High,
            ));
            suggestions.push(action(
                "resolve_quickly",
                "Focus on quick resolution to rebuild trust",
                ActionPriority::Medium,
            ));
        }
        _ => {}
    }

    if state
        .intent_history
        .contains(&IntentCategory::PaymentIssue)
    {
        suggestions.push(SuggestedAction {
            action: "check_payment".into(),
            description: "Review payment history and pending issues".into(),
            priority: ActionPriority::High,
            data: Some(serde_json::json!({"check": "payment_history"})),
        });
    }

    if let Some(query) = &state.last_repeated_query {
        suggestions.push(action(
            "address_query",
            format!(
                "Address repeated question: '{}...'",
                truncate_chars(query, 50)
            ),
            ActionPriority::High,
        ));
    }

    suggestions
}

fn trigger_description(state: &ConversationState, trigger: HandoffTrigger) -> String {
    match trigger {
        HandoffTrigger::ExplicitRequest => {
            "User explicitly requested to speak with a human agent".into()
        }
        HandoffTrigger::HighFrustration => format!(
            "User sentiment dropped to {}",
            state.current_sentiment.as_str()
        ),
        HandoffTrigger::RepeatedQueries => format!(
            "User repeated similar query {} times",
            state.repeat_count
        ),
        HandoffTrigger::FraudDetection => {
            "Potential fraud activity detected in conversation".into()
        }
        HandoffTrigger::SafetyEmergency => "Safety or emergency concern raised by user".into(),
        HandoffTrigger::HarassmentReport => "User reported harassment incident".into(),
        HandoffTrigger::ToolFailures => format!(
            "Bot encountered {} failures",
            state.tool_failure_count
        ),
        HandoffTrigger::ConfidenceThreshold => format!(
            "Escalation confidence reached {:.0}%",
            state.escalation_confidence * 100.0
        ),
        HandoffTrigger::BotStuck => "Bot unable to progress conversation".into(),
        HandoffTrigger::LongConversation => format!(
            "Conversation reached {} turns without resolution",
            state.turn_count
        ),
    }
}

fn action(
    name: &str,
    description: impl Into<String>,
    priority: ActionPriority,
) -> SuggestedAction {
    SuggestedAction {
        action: name.into(),
        description: description.into(),
        priority,
        data: None,
    }
}

/// First `max` characters, multi-byte safe.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
