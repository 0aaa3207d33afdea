use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent & sentiment enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Closed set of user intents the keyword classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Greeting,
    TripInquiry,
    FaqQuery,
    Complaint,
    PaymentIssue,
    SafetyConcern,
    FraudReport,
    Harassment,
    AccountIssue,
    EscalationRequest,
    Confusion,
    RepeatQuery,
    Appreciation,
    Farewell,
    Other,
}

impl IntentCategory {
    /// Intents that land in `high_risk_intents_detected` when seen.
    pub fn is_high_risk(self) -> bool {
        matches!(
            self,
            Self::FraudReport | Self::Harassment | Self::SafetyConcern | Self::EscalationRequest
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Frustrated,
    Angry,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Frustrated => "frustrated",
            Self::Angry => "angry",
        }
    }

    /// Map a score in [-1, 1] onto the fixed label bands.
    pub fn from_score(score: f64) -> Self {
        if score <= -0.6 {
            Self::Angry
        } else if score <= -0.3 {
            Self::Frustrated
        } else if score < -0.1 {
            Self::Negative
        } else if score <= 0.3 {
            Self::Neutral
        } else {
            Self::Positive
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NLU result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-turn analysis produced by the keyword NLU for user turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluResult {
    pub intent: IntentCategory,
    pub intent_confidence: f64,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,
    pub is_repeat_query: bool,
    pub similarity_to_previous: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turns & bot actions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One user or assistant utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Present for analyzed user turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlu_result: Option<NluResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tool_results: HashMap<String, serde_json::Value>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            nlu_result: None,
            tool_calls: Vec::new(),
            tool_results: HashMap::new(),
        }
    }
}

/// Log entry for something the bot did on the driver's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTaken {
    pub action: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_label_bands() {
        assert_eq!(SentimentLabel::from_score(-1.0), SentimentLabel::Angry);
        assert_eq!(SentimentLabel::from_score(-0.6), SentimentLabel::Angry);
        assert_eq!(SentimentLabel::from_score(-0.5), SentimentLabel::Frustrated);
        assert_eq!(SentimentLabel::from_score(-0.3), SentimentLabel::Frustrated);
        assert_eq!(SentimentLabel::from_score(-0.2), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(-0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.3), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.4), SentimentLabel::Positive);
    }

    #[test]
    fn high_risk_intents() {
        assert!(IntentCategory::FraudReport.is_high_risk());
        assert!(IntentCategory::Harassment.is_high_risk());
        assert!(IntentCategory::SafetyConcern.is_high_risk());
        assert!(IntentCategory::EscalationRequest.is_high_risk());
        assert!(!IntentCategory::Complaint.is_high_risk());
        assert!(!IntentCategory::PaymentIssue.is_high_risk());
    }

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&IntentCategory::EscalationRequest).unwrap();
        assert_eq!(json, "\"escalation_request\"");
    }
}
