//! Escalation confidence engine.
//!
//! Six weighted signals are fused into a confidence score in [0, 1]:
//! repetition, sentiment, high-risk intent, tool failures, conversation
//! length, and explicit operator requests. Safety, harassment, and fraud
//! intents bypass the weighting entirely and escalate at confidence 1.0.

use saarthi_domain::model::{
    ConversationState, EscalationFactors, HandoffPriority, HandoffTrigger, IntentCategory,
    SentimentLabel, SentimentTrend,
};

/// Confidence at which a handoff fires automatically.
pub const AUTO_ESCALATE_THRESHOLD: f64 = 0.75;
/// Confidence at which the adapter starts logging warnings.
pub const PREPARE_HANDOFF_THRESHOLD: f64 = 0.55;

/// Factor weights in declaration order; must sum to exactly 1.00.
pub const WEIGHTS: [f64; 6] = [0.20, 0.20, 0.25, 0.10, 0.10, 0.15];

const MAX_TURNS_BEFORE_PENALTY: usize = 10;
const MAX_TOOL_FAILURES_BEFORE_PENALTY: u32 = 2;

/// Intents that raise the intent factor without forcing escalation.
const ELEVATED_INTENTS: [IntentCategory; 4] = [
    IntentCategory::Complaint,
    IntentCategory::PaymentIssue,
    IntentCategory::AccountIssue,
    IntentCategory::EscalationRequest,
];

/// Result of one confidence pass.
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub confidence: f64,
    pub factors: EscalationFactors,
    pub trigger: Option<HandoffTrigger>,
}

#[derive(Debug, Default)]
pub struct EscalationEngine;

impl EscalationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the escalation confidence for a conversation, storing the
    /// score and factor breakdown back onto the state.
    pub fn compute(&self, state: &mut ConversationState) -> EscalationOutcome {
        // Safety, harassment, and fraud short-circuit everything.
        if let Some(trigger) = immediate_trigger(state) {
            let factors = EscalationFactors::saturated();
            state.escalation_confidence = 1.0;
            state.escalation_factors = factors;
            return EscalationOutcome {
                confidence: 1.0,
                factors,
                trigger: Some(trigger),
            };
        }

        let factors = EscalationFactors {
            repetition: repetition_factor(state),
            sentiment: sentiment_factor(state),
            high_risk_intent: intent_factor(state),
            tool_failures: tool_failure_factor(state),
            turn_count: turn_count_factor(state),
            explicit_request: explicit_request_factor(state),
        };

        let confidence: f64 = factors
            .values()
            .iter()
            .zip(WEIGHTS.iter())
            .map(|((_, factor), weight)| factor * weight)
            .sum();

        let trigger = (confidence >= AUTO_ESCALATE_THRESHOLD).then(|| select_trigger(&factors));

        state.escalation_confidence = confidence;
        state.escalation_factors = factors;

        tracing::debug!(
            call_id = %state.call_id,
            confidence = format!("{confidence:.2}"),
            ?trigger,
            "escalation confidence computed"
        );

        EscalationOutcome {
            confidence,
            factors,
            trigger,
        }
    }

    /// True once the latest computed confidence warrants preparing a handoff.
    pub fn should_warn(&self, state: &ConversationState) -> bool {
        state.escalation_confidence >= PREPARE_HANDOFF_THRESHOLD
    }

    /// True once the latest computed confidence warrants escalating.
    pub fn should_escalate(&self, state: &ConversationState) -> bool {
        state.escalation_confidence >= AUTO_ESCALATE_THRESHOLD
    }

    /// Handoff priority for a trigger. Pure in (trigger, current sentiment).
    pub fn priority(&self, state: &ConversationState, trigger: HandoffTrigger) -> HandoffPriority {
        match trigger {
            HandoffTrigger::SafetyEmergency
            | HandoffTrigger::HarassmentReport
            | HandoffTrigger::FraudDetection => HandoffPriority::Urgent,
            HandoffTrigger::ExplicitRequest => HandoffPriority::High,
            HandoffTrigger::HighFrustration => {
                if state.current_sentiment == SentimentLabel::Angry {
                    HandoffPriority::High
                } else {
                    HandoffPriority::Medium
                }
            }
            HandoffTrigger::RepeatedQueries | HandoffTrigger::ToolFailures => {
                HandoffPriority::Medium
            }
            _ => HandoffPriority::Low,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Factor derivations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// First immediate-escalation intent in detection order wins.
fn immediate_trigger(state: &ConversationState) -> Option<HandoffTrigger> {
    for intent in &state.high_risk_intents_detected {
        match intent {
            IntentCategory::SafetyConcern => return Some(HandoffTrigger::SafetyEmergency),
            IntentCategory::Harassment => return Some(HandoffTrigger::HarassmentReport),
            IntentCategory::FraudReport => return Some(HandoffTrigger::FraudDetection),
            _ => {}
        }
    }
    None
}

fn repetition_factor(state: &ConversationState) -> f64 {
    match state.repeat_count {
        0 => 0.0,
        1 => 0.3,
        2 => 0.6,
        _ => 1.0,
    }
}

fn sentiment_factor(state: &ConversationState) -> f64 {
    let mut factor: f64 = match state.current_sentiment {
        SentimentLabel::Angry => 0.8,
        SentimentLabel::Frustrated => 0.6,
        SentimentLabel::Negative => 0.3,
        SentimentLabel::Neutral | SentimentLabel::Positive => 0.0,
    };

    match state.sentiment_trend {
        SentimentTrend::Declining => factor = (factor + 0.2).min(1.0),
        SentimentTrend::Improving => factor = (factor - 0.1).max(0.0),
        SentimentTrend::Stable => {}
    }

    if state.sentiment_history.len() >= 3 {
        let negative = state
            .sentiment_history
            .iter()
            .filter(|s| **s < -0.2)
            .count();
        if negative as f64 / state.sentiment_history.len() as f64 > 0.5 {
            factor = (factor + 0.2).min(1.0);
        }
    }

    factor
}

fn intent_factor(state: &ConversationState) -> f64 {
    if state.high_risk_intents_detected.is_empty() {
        let elevated = state
            .current_intent
            .map(|i| ELEVATED_INTENTS.contains(&i))
            .unwrap_or(false);
        return if elevated { 0.4 } else { 0.0 };
    }
    if state.high_risk_intents_detected.len() >= 2 {
        1.0
    } else {
        0.7
    }
}

fn tool_failure_factor(state: &ConversationState) -> f64 {
    if state.tool_failure_count == 0 {
        return 0.0;
    }
    let total = state.tool_success_count + state.tool_failure_count;
    let failure_rate = state.tool_failure_count as f64 / total as f64;
    if state.tool_failure_count >= MAX_TOOL_FAILURES_BEFORE_PENALTY {
        (failure_rate + 0.3).min(1.0)
    } else {
        failure_rate
    }
}

fn turn_count_factor(state: &ConversationState) -> f64 {
    if state.turn_count <= 6 {
        0.0
    } else if state.turn_count <= MAX_TURNS_BEFORE_PENALTY {
        (state.turn_count - 6) as f64 / (MAX_TURNS_BEFORE_PENALTY - 6) as f64 * 0.5
    } else {
        1.0
    }
}

fn explicit_request_factor(state: &ConversationState) -> f64 {
    if state
        .intent_history
        .contains(&IntentCategory::EscalationRequest)
    {
        1.0
    } else {
        0.0
    }
}

/// Highest factor wins; ties break toward declaration order.
fn select_trigger(factors: &EscalationFactors) -> HandoffTrigger {
    let pairs = [
        (factors.repetition, HandoffTrigger::RepeatedQueries),
        (factors.sentiment, HandoffTrigger::HighFrustration),
        (factors.high_risk_intent, HandoffTrigger::ConfidenceThreshold),
        (factors.tool_failures, HandoffTrigger::ToolFailures),
        (factors.turn_count, HandoffTrigger::LongConversation),
        (factors.explicit_request, HandoffTrigger::ExplicitRequest),
    ];
    let mut best = pairs[0];
    for pair in &pairs[1..] {
        if pair.0 > best.0 {
            best = *pair;
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use saarthi_domain::model::{DriverInfo, Role};

    fn state() -> ConversationState {
        ConversationState::new("call-1", "room-1", DriverInfo::unknown())
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_state_scores_zero() {
        let engine = EscalationEngine::new();
        let mut s = state();
        let outcome = engine.compute(&mut s);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.trigger.is_none());
        assert!(!engine.should_warn(&s));
        assert!(!engine.should_escalate(&s));
    }

    #[test]
    fn repetition_factor_ladder() {
        let mut s = state();
        for (repeats, expected) in [(0u32, 0.0), (1, 0.3), (2, 0.6), (3, 1.0), (7, 1.0)] {
            s.repeat_count = repeats;
            assert_eq!(repetition_factor(&s), expected, "repeats = {repeats}");
        }
    }

    #[test]
    fn sentiment_factor_combines_label_trend_and_history() {
        let mut s = state();
        s.current_sentiment = SentimentLabel::Angry;
        assert_eq!(sentiment_factor(&s), 0.8);

        s.sentiment_trend = SentimentTrend::Declining;
        assert_eq!(sentiment_factor(&s), 1.0);

        s.current_sentiment = SentimentLabel::Frustrated;
        s.sentiment_trend = SentimentTrend::Improving;
        assert!((sentiment_factor(&s) - 0.5).abs() < 1e-9);

        // Majority-negative history adds 0.2.
        s.sentiment_trend = SentimentTrend::Stable;
        s.sentiment_history = vec![-0.5, -0.4, 0.1];
        assert!((sentiment_factor(&s) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn intent_factor_ladder() {
        let mut s = state();
        assert_eq!(intent_factor(&s), 0.0);

        s.current_intent = Some(IntentCategory::PaymentIssue);
        assert_eq!(intent_factor(&s), 0.4);

        s.high_risk_intents_detected = vec![IntentCategory::EscalationRequest];
        assert_eq!(intent_factor(&s), 0.7);

        s.high_risk_intents_detected = vec![
            IntentCategory::EscalationRequest,
            IntentCategory::EscalationRequest,
        ];
        assert_eq!(intent_factor(&s), 1.0);
    }

    #[test]
    fn tool_failure_factor_adds_penalty_at_two_failures() {
        let mut s = state();
        assert_eq!(tool_failure_factor(&s), 0.0);

        s.tool_success_count = 1;
        s.tool_failure_count = 1;
        assert!((tool_failure_factor(&s) - 0.5).abs() < 1e-9);

        s.tool_failure_count = 2;
        // failure_rate 2/3 + 0.3 penalty
        assert!((tool_failure_factor(&s) - (2.0 / 3.0 + 0.3)).abs() < 1e-9);

        s.tool_success_count = 0;
        assert_eq!(tool_failure_factor(&s), 1.0);
    }

    #[test]
    fn turn_count_factor_ramps_after_six() {
        let mut s = state();
        for (turns, expected) in [
            (0usize, 0.0),
            (6, 0.0),
            (7, 0.125),
            (8, 0.25),
            (10, 0.5),
            (11, 1.0),
        ] {
            s.turn_count = turns;
            assert!((turn_count_factor(&s) - expected).abs() < 1e-9, "turns = {turns}");
        }
    }

    #[test]
    fn safety_concern_forces_full_confidence() {
        let engine = EscalationEngine::new();
        let mut s = state();
        s.high_risk_intents_detected = vec![IntentCategory::SafetyConcern];

        let outcome = engine.compute(&mut s);
        assert_eq!(outcome.confidence, 1.0);
        assert_eq!(outcome.trigger, Some(HandoffTrigger::SafetyEmergency));
        assert_eq!(outcome.factors, EscalationFactors::saturated());
        assert!(engine.should_escalate(&s));
    }

    #[test]
    fn harassment_and_fraud_map_to_their_triggers() {
        let engine = EscalationEngine::new();

        let mut s = state();
        s.high_risk_intents_detected = vec![IntentCategory::Harassment];
        assert_eq!(
            engine.compute(&mut s).trigger,
            Some(HandoffTrigger::HarassmentReport)
        );

        let mut s = state();
        s.high_risk_intents_detected = vec![IntentCategory::FraudReport];
        assert_eq!(
            engine.compute(&mut s).trigger,
            Some(HandoffTrigger::FraudDetection)
        );
    }

    #[test]
    fn first_immediate_intent_in_detection_order_wins() {
        let mut s = state();
        s.high_risk_intents_detected =
            vec![IntentCategory::Harassment, IntentCategory::SafetyConcern];
        assert_eq!(
            immediate_trigger(&s),
            Some(HandoffTrigger::HarassmentReport)
        );
    }

    #[test]
    fn factors_and_confidence_stay_bounded() {
        let engine = EscalationEngine::new();
        let mut s = state();
        s.repeat_count = 50;
        s.current_sentiment = SentimentLabel::Angry;
        s.sentiment_trend = SentimentTrend::Declining;
        s.sentiment_history = vec![-0.9; 10];
        s.high_risk_intents_detected = vec![
            IntentCategory::EscalationRequest,
            IntentCategory::EscalationRequest,
        ];
        s.intent_history = vec![IntentCategory::EscalationRequest];
        s.tool_failure_count = 9;
        s.turn_count = 40;

        let outcome = engine.compute(&mut s);
        assert!(outcome.confidence <= 1.0);
        for (_, factor) in outcome.factors.values() {
            assert!((0.0..=1.0).contains(&factor));
        }
    }

    #[test]
    fn stacked_signals_cross_the_threshold_and_tie_break_by_declaration_order() {
        let engine = EscalationEngine::new();
        let mut s = state();
        // A driver repeating an angry explicit request: repetition, sentiment,
        // intent, and explicit_request all saturate.
        s.repeat_count = 3;
        s.current_sentiment = SentimentLabel::Angry;
        s.sentiment_trend = SentimentTrend::Declining;
        s.high_risk_intents_detected = vec![
            IntentCategory::EscalationRequest,
            IntentCategory::EscalationRequest,
        ];
        s.intent_history = vec![
            IntentCategory::EscalationRequest,
            IntentCategory::EscalationRequest,
        ];

        let outcome = engine.compute(&mut s);
        // 0.2 + 0.2 + 0.25 + 0.15 = 0.80
        assert!(outcome.confidence >= AUTO_ESCALATE_THRESHOLD);
        // Four factors tie at 1.0; repetition is declared first.
        assert_eq!(outcome.trigger, Some(HandoffTrigger::RepeatedQueries));
    }

    #[test]
    fn select_trigger_prefers_strict_maximum() {
        let factors = EscalationFactors {
            repetition: 0.6,
            sentiment: 0.8,
            high_risk_intent: 0.7,
            tool_failures: 0.0,
            turn_count: 0.0,
            explicit_request: 1.0,
        };
        assert_eq!(select_trigger(&factors), HandoffTrigger::ExplicitRequest);
    }

    #[test]
    fn priority_is_pure_in_trigger_and_sentiment() {
        let engine = EscalationEngine::new();
        let mut s = state();

        for trigger in [
            HandoffTrigger::SafetyEmergency,
            HandoffTrigger::HarassmentReport,
            HandoffTrigger::FraudDetection,
        ] {
            assert_eq!(engine.priority(&s, trigger), HandoffPriority::Urgent);
        }
        assert_eq!(
            engine.priority(&s, HandoffTrigger::ExplicitRequest),
            HandoffPriority::High
        );
        assert_eq!(
            engine.priority(&s, HandoffTrigger::HighFrustration),
            HandoffPriority::Medium
        );
        s.current_sentiment = SentimentLabel::Angry;
        assert_eq!(
            engine.priority(&s, HandoffTrigger::HighFrustration),
            HandoffPriority::High
        );
        assert_eq!(
            engine.priority(&s, HandoffTrigger::RepeatedQueries),
            HandoffPriority::Medium
        );
        assert_eq!(
            engine.priority(&s, HandoffTrigger::ToolFailures),
            HandoffPriority::Medium
        );
        assert_eq!(
            engine.priority(&s, HandoffTrigger::LongConversation),
            HandoffPriority::Low
        );

        // Deeper state changes do not affect priority.
        s.repeat_count = 9;
        s.turn_count = 30;
        assert_eq!(
            engine.priority(&s, HandoffTrigger::LongConversation),
            HandoffPriority::Low
        );
    }

    #[test]
    fn warn_threshold_sits_below_escalate_threshold() {
        let engine = EscalationEngine::new();
        let mut s = state();
        s.escalation_confidence = 0.6;
        assert!(engine.should_warn(&s));
        assert!(!engine.should_escalate(&s));
    }

    #[test]
    fn immediate_override_applies_on_next_compute_after_detection() {
        // Property: once a safety/harassment/fraud intent lands in
        // high_risk_intents_detected, the next compute returns 1.0.
        let engine = EscalationEngine::new();
        let mut s = state();
        s.push_turn(Role::User, "there has been an accident", None);
        s.high_risk_intents_detected.push(IntentCategory::SafetyConcern);

        let outcome = engine.compute(&mut s);
        assert_eq!(outcome.confidence, 1.0);
        assert_eq!(outcome.trigger, Some(HandoffTrigger::SafetyEmergency));
    }
}
