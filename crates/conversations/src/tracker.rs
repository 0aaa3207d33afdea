//! Conversation tracker — owns all live per-call states.
//!
//! Each call_id maps to one [`ConversationState`] that accumulates turns,
//! sentiment history, intent history, repetition signals, and tool outcomes.
//! Unknown call_ids fail open: the operation logs a warning and changes
//! nothing.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use saarthi_domain::model::{
    ConversationState, ConversationTurn, DriverInfo, IntentCategory, Role, SentimentTrend,
};
use saarthi_nlu::{normalize_query, Analyzer};

/// Queries kept for repetition comparison.
const QUERY_HISTORY_LIMIT: usize = 10;

/// Sentiment-trend window: first-vs-last over the most recent scores.
const TREND_WINDOW: usize = 3;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary projection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ToolCallStats {
    pub count: u32,
    pub success: u32,
}

/// Read-only projection of one conversation, for dashboards and handoff prep.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSummary {
    pub call_id: String,
    pub turn_count: usize,
    pub sentiment: saarthi_domain::model::SentimentLabel,
    pub sentiment_score: f64,
    pub sentiment_trend: SentimentTrend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_intent: Option<IntentCategory>,
    pub high_risk_intents: Vec<IntentCategory>,
    pub repeat_count: u32,
    pub tool_calls: HashMap<String, ToolCallStats>,
    pub last_queries: Vec<String>,
    pub escalation_confidence: f64,
    pub duration_seconds: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tracker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ConversationTracker {
    conversations: RwLock<HashMap<String, ConversationState>>,
    analyzer: Analyzer,
}

impl ConversationTracker {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            analyzer: Analyzer::new(),
        }
    }

    /// Create a conversation for a call. Idempotent: a duplicate call_id
    /// returns the existing state untouched.
    pub fn create(
        &self,
        call_id: &str,
        room_name: &str,
        driver_info: Option<DriverInfo>,
    ) -> ConversationState {
        // Fast path: conversation already exists.
        {
            let conversations = self.conversations.read();
            if let Some(existing) = conversations.get(call_id) {
                tracing::warn!(call_id = %call_id, "conversation already exists, not overwriting");
                return existing.clone();
            }
        }

        let state = ConversationState::new(
            call_id,
            room_name,
            driver_info.unwrap_or_else(DriverInfo::unknown),
        );
        let mut conversations = self.conversations.write();
        let entry = conversations.entry(call_id.to_owned()).or_insert(state);
        tracing::info!(call_id = %call_id, room_name = %room_name, "conversation created");
        entry.clone()
    }

    /// Snapshot of a conversation state.
    pub fn get(&self, call_id: &str) -> Option<ConversationState> {
        self.conversations.read().get(call_id).cloned()
    }

    /// Mutate a conversation in place. Returns `None` for unknown call_ids.
    pub fn update<R>(
        &self,
        call_id: &str,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> Option<R> {
        let mut conversations = self.conversations.write();
        match conversations.get_mut(call_id) {
            Some(state) => Some(f(state)),
            None => {
                tracing::warn!(call_id = %call_id, "no conversation for call_id");
                None
            }
        }
    }

    /// Add a user turn, running NLU analysis unless disabled.
    pub fn add_user_turn(
        &self,
        call_id: &str,
        content: &str,
        analyze: bool,
    ) -> Option<ConversationTurn> {
        let mut conversations = self.conversations.write();
        let state = match conversations.get_mut(call_id) {
            Some(state) => state,
            None => {
                tracing::warn!(call_id = %call_id, "no conversation for call_id");
                return None;
            }
        };

        let nlu = analyze.then(|| self.analyzer.analyze(state, content));

        if let Some(nlu) = &nlu {
            state.current_sentiment = nlu.sentiment;
            state.sentiment_score = nlu.sentiment_score;
            state.sentiment_history.push(nlu.sentiment_score);
            state.sentiment_trend = sentiment_trend(&state.sentiment_history);

            state.current_intent = Some(nlu.intent);
            state.intent_history.push(nlu.intent);
            if nlu.intent.is_high_risk() {
                state.high_risk_intents_detected.push(nlu.intent);
            }

            if nlu.is_repeat_query {
                state.repeat_count += 1;
                state.last_repeated_query = Some(content.to_owned());
            }

            tracing::debug!(
                call_id = %call_id,
                intent = ?nlu.intent,
                sentiment = ?nlu.sentiment,
                repeat = nlu.is_repeat_query,
                "user turn analyzed"
            );
        }

        // Repetition compares against history *before* this query lands.
        state.query_history.push(normalize_query(content));
        if state.query_history.len() > QUERY_HISTORY_LIMIT {
            let excess = state.query_history.len() - QUERY_HISTORY_LIMIT;
            state.query_history.drain(..excess);
        }

        let id = state.push_turn(Role::User, content, nlu);
        state.turns.iter().find(|t| t.id == id).cloned()
    }

    /// Add an assistant turn. No NLU runs on assistant text.
    pub fn add_assistant_turn(
        &self,
        call_id: &str,
        content: &str,
        tool_calls: Option<Vec<String>>,
    ) -> Option<ConversationTurn> {
        self.update(call_id, |state| {
            let id = state.push_turn(Role::Assistant, content, None);
            if let Some(tools) = tool_calls {
                if let Some(turn) = state.turns.iter_mut().find(|t| t.id == id) {
                    turn.tool_calls = tools;
                }
            }
            state.turns.iter().find(|t| t.id == id).cloned()
        })
        .flatten()
    }

    /// Record a tool outcome for the conversation.
    pub fn record_tool_call(
        &self,
        call_id: &str,
        tool_name: &str,
        success: bool,
        result: Option<serde_json::Value>,
    ) {
        let _ = self.update(call_id, |state| {
            state.record_tool_call(tool_name, success);
            if let Some(result) = result {
                // Attach the result to the turn that invoked the tool, if any.
                if let Some(turn) = state
                    .turns
                    .iter_mut()
                    .rev()
                    .find(|t| t.tool_calls.iter().any(|n| n == tool_name))
                {
                    turn.tool_results.insert(tool_name.to_owned(), result);
                }
            }
            tracing::debug!(call_id = %call_id, tool = %tool_name, success, "tool call recorded");
        });
    }

    /// Summary projection for handoff prep and dashboards.
    pub fn summary(&self, call_id: &str) -> Option<TrackerSummary> {
        let conversations = self.conversations.read();
        let state = conversations.get(call_id)?;

        let mut tool_calls: HashMap<String, ToolCallStats> = HashMap::new();
        for action in &state.actions_taken {
            if let Some(tool) = action.action.strip_prefix("tool_call:") {
                let stats = tool_calls.entry(tool.to_owned()).or_default();
                stats.count += 1;
                if action.success {
                    stats.success += 1;
                }
            }
        }

        let last_queries: Vec<String> = {
            let user_contents: Vec<&str> =
                state.user_turns().map(|t| t.content.as_str()).collect();
            user_contents
                .iter()
                .rev()
                .take(5)
                .rev()
                .map(|s| (*s).to_owned())
                .collect()
        };

        Some(TrackerSummary {
            call_id: state.call_id.clone(),
            turn_count: state.turn_count,
            sentiment: state.current_sentiment,
            sentiment_score: state.sentiment_score,
            sentiment_trend: state.sentiment_trend,
            current_intent: state.current_intent,
            high_risk_intents: state.high_risk_intents_detected.clone(),
            repeat_count: state.repeat_count,
            tool_calls,
            last_queries,
            escalation_confidence: state.escalation_confidence,
            duration_seconds: state.elapsed_seconds(),
        })
    }

    /// Remove and return a conversation (call ended).
    pub fn remove(&self, call_id: &str) -> Option<ConversationState> {
        let removed = self.conversations.write().remove(call_id);
        if removed.is_some() {
            tracing::info!(call_id = %call_id, "conversation removed");
        }
        removed
    }

    pub fn active_call_ids(&self) -> Vec<String> {
        self.conversations.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

impl Default for ConversationTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// First-vs-last comparison over the most recent scores; the middle score
/// is ignored. Fewer than two scores → stable.
fn sentiment_trend(history: &[f64]) -> SentimentTrend {
    let window = &history[history.len().saturating_sub(TREND_WINDOW)..];
    if window.len() < 2 {
        return SentimentTrend::Stable;
    }
    let first = window[0];
    let last = window[window.len() - 1];
    if last < first - 0.2 {
        SentimentTrend::Declining
    } else if last > first + 0.2 {
        SentimentTrend::Improving
    } else {
        SentimentTrend::Stable
    }
}
