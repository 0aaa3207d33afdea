use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionTaken, ConversationTurn, DriverInfo, IntentCategory, SentimentLabel};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trigger / priority / status enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What caused a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffTrigger {
    ExplicitRequest,
    HighFrustration,
    RepeatedQueries,
    FraudDetection,
    SafetyEmergency,
    HarassmentReport,
    ToolFailures,
    ConfidenceThreshold,
    BotStuck,
    LongConversation,
}

impl HandoffTrigger {
    fn as_snake(self) -> &'static str {
        match self {
            Self::ExplicitRequest => "explicit_request",
            Self::HighFrustration => "high_frustration",
            Self::RepeatedQueries => "repeated_queries",
            Self::FraudDetection => "fraud_detection",
            Self::SafetyEmergency => "safety_emergency",
            Self::HarassmentReport => "harassment_report",
            Self::ToolFailures => "tool_failures",
            Self::ConfidenceThreshold => "confidence_threshold",
            Self::BotStuck => "bot_stuck",
            Self::LongConversation => "long_conversation",
        }
    }

    /// Title-case rendering for summaries: `explicit_request` → `Explicit Request`.
    pub fn title(self) -> String {
        self.as_snake()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl HandoffPriority {
    /// Sort rank: lower sorts earlier in the queue.
    pub fn rank(self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Queued,
    Assigned,
    InProgress,
    Completed,
    Abandoned,
    Cancelled,
}

impl HandoffStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned | Self::Cancelled)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary & suggested actions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Urgent,
    High,
    Medium,
}

/// One next step suggested to the accepting operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: String,
    pub description: String,
    pub priority: ActionPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Narrative summary prepared for the operator at trigger time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub one_line_summary: String,
    pub detailed_summary: String,
    pub primary_issue: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stuck_on: Option<String>,
    pub topics_discussed: Vec<String>,
    pub resolution_attempted: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handoff alert
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fully prepared handoff snapshot. Built once at trigger time; owns copies
/// of everything it references so the live conversation can keep moving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffAlert {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub call_id: String,
    pub room_name: String,

    pub trigger: HandoffTrigger,
    pub trigger_description: String,
    pub priority: HandoffPriority,
    pub status: HandoffStatus,

    pub driver_info: DriverInfo,
    pub intent_history: Vec<IntentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_intent: Option<IntentCategory>,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,

    pub issue_summary: String,
    pub detailed_summary: ConversationSummary,
    pub conversation_turns: Vec<ConversationTurn>,
    pub actions_taken_by_bot: Vec<ActionTaken>,
    pub next_steps_for_agent: Vec<SuggestedAction>,

    /// 1-based while QUEUED; stale afterwards.
    pub queue_position: usize,
    /// One-shot estimate computed at enqueue; never refreshed.
    pub estimated_wait_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
