use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    ActionTaken, ConversationTurn, DriverInfo, HandoffTrigger, IntentCategory, NluResult, Role,
    SentimentLabel,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sentiment trend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Escalation factors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-signal escalation factor breakdown, each in [0, 1].
///
/// Field declaration order is the engine's tie-break order; `values()`
/// iterates in that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EscalationFactors {
    pub repetition: f64,
    pub sentiment: f64,
    pub high_risk_intent: f64,
    pub tool_failures: f64,
    pub turn_count: f64,
    pub explicit_request: f64,
}

impl EscalationFactors {
    /// All factors pinned to 1.0 (immediate-escalation override).
    pub fn saturated() -> Self {
        Self {
            repetition: 1.0,
            sentiment: 1.0,
            high_risk_intent: 1.0,
            tool_failures: 1.0,
            turn_count: 1.0,
            explicit_request: 1.0,
        }
    }

    /// Factors in declaration order, paired with their names.
    pub fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("repetition", self.repetition),
            ("sentiment", self.sentiment),
            ("high_risk_intent", self.high_risk_intent),
            ("tool_failures", self.tool_failures),
            ("turn_count", self.turn_count),
            ("explicit_request", self.explicit_request),
        ]
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Live per-call state. Owned by the tracker; mutated only through it
/// (single writer per call_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: Uuid,
    pub call_id: String,
    pub room_name: String,
    pub driver_info: DriverInfo,

    pub turns: Vec<ConversationTurn>,
    /// Invariant: always equals `turns.len()`.
    pub turn_count: usize,

    pub current_sentiment: SentimentLabel,
    pub sentiment_score: f64,
    /// One score per analyzed user turn, in turn order.
    pub sentiment_history: Vec<f64>,
    pub sentiment_trend: SentimentTrend,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_intent: Option<IntentCategory>,
    pub intent_history: Vec<IntentCategory>,
    /// May contain repeats; ordered by detection.
    pub high_risk_intents_detected: Vec<IntentCategory>,

    /// Normalized last-10 user queries, oldest first.
    pub query_history: Vec<String>,
    pub repeat_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_repeated_query: Option<String>,

    pub tool_success_count: u32,
    pub tool_failure_count: u32,
    pub actions_taken: Vec<ActionTaken>,

    pub escalation_confidence: f64,
    pub escalation_factors: EscalationFactors,
    /// Write-once: flips false → true exactly once and pins the trigger.
    pub escalation_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_trigger: Option<HandoffTrigger>,

    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(call_id: impl Into<String>, room_name: impl Into<String>, driver_info: DriverInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            call_id: call_id.into(),
            room_name: room_name.into(),
            driver_info,
            turns: Vec::new(),
            turn_count: 0,
            current_sentiment: SentimentLabel::Neutral,
            sentiment_score: 0.0,
            sentiment_history: Vec::new(),
            sentiment_trend: SentimentTrend::Stable,
            current_intent: None,
            intent_history: Vec::new(),
            high_risk_intents_detected: Vec::new(),
            query_history: Vec::new(),
            repeat_count: 0,
            last_repeated_query: None,
            tool_success_count: 0,
            tool_failure_count: 0,
            actions_taken: Vec::new(),
            escalation_confidence: 0.0,
            escalation_factors: EscalationFactors::default(),
            escalation_triggered: false,
            escalation_trigger: None,
            started_at: now,
            last_activity_at: now,
        }
    }

    /// Append a turn and keep `turn_count` in sync. Returns the turn id.
    pub fn push_turn(&mut self, role: Role, content: &str, nlu: Option<NluResult>) -> Uuid {
        let mut turn = ConversationTurn::new(role, content);
        turn.nlu_result = nlu;
        let id = turn.id;
        self.turns.push(turn);
        self.turn_count = self.turns.len();
        self.touch();
        id
    }

    /// Record a tool outcome: bump the matching counter and log the action.
    pub fn record_tool_call(&mut self, tool_name: &str, success: bool) {
        if success {
            self.tool_success_count += 1;
        } else {
            self.tool_failure_count += 1;
        }
        self.actions_taken.push(ActionTaken {
            action: format!("tool_call:{tool_name}"),
            success,
            timestamp: Utc::now(),
        });
        self.touch();
    }

    /// Advance `last_activity_at`, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.role == Role::User)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}
