//! Per-turn analysis: intent, sentiment, repetition.

use std::collections::HashMap;

use saarthi_domain::model::{ConversationState, IntentCategory, NluResult, SentimentLabel};

use crate::keywords::{INTENT_KEYWORDS, NEGATIVE_KEYWORDS, POSITIVE_KEYWORDS};
use crate::similarity::{normalize_query, similarity_ratio, SIMILARITY_THRESHOLD};

/// Keyword-driven analyzer. Stateless; the tracker passes the live state in
/// for contextual signals (sentiment history, recent queries) and applies
/// the result itself.
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze one user utterance against the current conversation state.
    pub fn analyze(&self, state: &ConversationState, content: &str) -> NluResult {
        let content_lower = content.to_lowercase();

        // Intent: first category with any matching phrase wins.
        let mut intent = IntentCategory::Other;
        let mut intent_confidence = 0.5;
        'scan: for (category, phrases) in INTENT_KEYWORDS {
            for phrase in *phrases {
                if content_lower.contains(phrase) {
                    intent = *category;
                    intent_confidence = 0.8;
                    break 'scan;
                }
            }
        }

        let (sentiment, sentiment_score) = self.score_sentiment(content, &content_lower, state);

        let (is_repeat, similarity) = self.check_repetition(state, &content_lower);

        // A repeat with no recognizable intent usually means the driver is
        // re-asking something the bot failed to answer.
        if is_repeat && intent == IntentCategory::Other {
            intent = IntentCategory::RepeatQuery;
        }

        NluResult {
            intent,
            intent_confidence,
            sentiment,
            sentiment_score,
            entities: HashMap::new(),
            is_repeat_query: is_repeat,
            similarity_to_previous: similarity,
        }
    }

    /// Sentiment score in [-1, 1] plus its label.
    ///
    /// Keyword counts drive the base score; exclamations, shouting, and a
    /// consistently negative history push it further down.
    fn score_sentiment(
        &self,
        content: &str,
        content_lower: &str,
        state: &ConversationState,
    ) -> (SentimentLabel, f64) {
        let negative_count = NEGATIVE_KEYWORDS
            .iter()
            .filter(|kw| content_lower.contains(*kw))
            .count();
        let positive_count = POSITIVE_KEYWORDS
            .iter()
            .filter(|kw| content_lower.contains(*kw))
            .count();

        let mut score = if negative_count > positive_count {
            -0.3 * negative_count as f64
        } else if positive_count > negative_count {
            0.3 * positive_count as f64
        } else {
            0.0
        };

        let exclamation_count = content.matches('!').count();
        if exclamation_count >= 2 {
            score -= 0.2;
        }

        let total_chars = content.chars().count();
        if total_chars > 0 {
            let upper = content.chars().filter(|c| c.is_uppercase()).count();
            if upper as f64 / total_chars as f64 > 0.5 {
                score -= 0.3;
            }
        }

        if !state.sentiment_history.is_empty() {
            let window: Vec<f64> = state
                .sentiment_history
                .iter()
                .rev()
                .take(5)
                .copied()
                .collect();
            let avg = window.iter().sum::<f64>() / window.len() as f64;
            if avg < -0.3 {
                score -= 0.1;
            }
        }

        let score = score.clamp(-1.0, 1.0);
        (SentimentLabel::from_score(score), score)
    }

    /// Compare against the last up-to-10 prior normalized queries.
    fn check_repetition(&self, state: &ConversationState, content_lower: &str) -> (bool, f64) {
        if state.query_history.is_empty() {
            return (false, 0.0);
        }

        let normalized = normalize_query(content_lower);
        let mut max_similarity: f64 = 0.0;
        for prev in state.query_history.iter().rev().take(10) {
            max_similarity = max_similarity.max(similarity_ratio(&normalized, prev));
        }

        (max_similarity >= SIMILARITY_THRESHOLD, max_similarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saarthi_domain::model::DriverInfo;

    fn fresh_state() -> ConversationState {
        ConversationState::new("call-1", "room-1", DriverInfo::unknown())
    }

    #[test]
    fn greeting_classifies() {
        let result = Analyzer::new().analyze(&fresh_state(), "hello");
        assert_eq!(result.intent, IntentCategory::Greeting);
        assert_eq!(result.intent_confidence, 0.8);
        assert_eq!(result.sentiment, SentimentLabel::Neutral);
    }

    #[test]
    fn escalation_request_classifies() {
        let result = Analyzer::new()
            .analyze(&fresh_state(), "can you connect me to a human agent please");
        assert_eq!(result.intent, IntentCategory::EscalationRequest);
    }

    #[test]
    fn safety_concern_classifies() {
        let result = Analyzer::new()
            .analyze(&fresh_state(), "there has been an accident I need police");
        assert_eq!(result.intent, IntentCategory::SafetyConcern);
    }

    #[test]
    fn hindi_fraud_keyword_classifies() {
        let result = Analyzer::new().analyze(&fresh_state(), "मेरे साथ धोखा हुआ है");
        assert_eq!(result.intent, IntentCategory::FraudReport);
    }

    #[test]
    fn unmatched_content_falls_back_to_other() {
        let result = Analyzer::new().analyze(&fresh_state(), "umm okay then");
        assert_eq!(result.intent, IntentCategory::Other);
        assert_eq!(result.intent_confidence, 0.5);
    }

    #[test]
    fn angry_wording_scores_angry() {
        // Two negative keywords (-0.6) plus repeated exclamations (-0.2).
        let result = Analyzer::new()
            .analyze(&fresh_state(), "you are TERRIBLE!! this is WORST service!!!");
        assert!(result.sentiment_score <= -0.6);
        assert_eq!(result.sentiment, SentimentLabel::Angry);
    }

    #[test]
    fn all_caps_shouting_is_penalized() {
        let calm = Analyzer::new().analyze(&fresh_state(), "refund not received");
        let shouting = Analyzer::new().analyze(&fresh_state(), "REFUND NOT RECEIVED");
        assert!(shouting.sentiment_score < calm.sentiment_score);
    }

    #[test]
    fn negative_history_amplifies() {
        let mut state = fresh_state();
        state.sentiment_history = vec![-0.5, -0.4, -0.6];
        let with_history = Analyzer::new().analyze(&state, "still not working, useless");
        let without_history = Analyzer::new().analyze(&fresh_state(), "still not working, useless");
        assert!(with_history.sentiment_score < without_history.sentiment_score);
    }

    #[test]
    fn score_stays_bounded() {
        let text = "terrible worst hate pathetic useless stupid waste bad!!!";
        let result = Analyzer::new().analyze(&fresh_state(), text);
        assert!(result.sentiment_score >= -1.0);
        assert_eq!(result.sentiment, SentimentLabel::Angry);
    }

    #[test]
    fn repeat_detection_against_history() {
        let mut state = fresh_state();
        state.query_history.push(normalize_query("where is my order"));

        let repeat = Analyzer::new().analyze(&state, "where is my order");
        assert!(repeat.is_repeat_query);
        assert_eq!(repeat.similarity_to_previous, 1.0);
        assert_eq!(repeat.intent, IntentCategory::RepeatQuery);

        let fresh = Analyzer::new().analyze(&state, "nearest battery station kahan hai");
        assert!(!fresh.is_repeat_query);
    }

    #[test]
    fn repeat_does_not_override_matched_intent() {
        let mut state = fresh_state();
        state.query_history.push(normalize_query("refund my payment"));
        let result = Analyzer::new().analyze(&state, "refund my payment");
        assert!(result.is_repeat_query);
        assert_eq!(result.intent, IntentCategory::PaymentIssue);
    }

    #[test]
    fn first_query_is_never_a_repeat() {
        let result = Analyzer::new().analyze(&fresh_state(), "where is my order");
        assert!(!result.is_repeat_query);
        assert_eq!(result.similarity_to_previous, 0.0);
    }
}
