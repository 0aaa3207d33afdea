//! End-to-end escalation flows through the call supervisor: pipeline events
//! in, queued alerts and operator lifecycle out.

use std::sync::Arc;
use std::time::Duration;

use saarthi_conversations::{ConversationTracker, EscalationEngine};
use saarthi_domain::model::{
    HandoffPriority, HandoffStatus, HandoffTrigger, SentimentLabel, SentimentTrend,
};
use saarthi_domain::Result;
use saarthi_gateway::calls::{CallSupervisor, PipelineEvent};
use saarthi_gateway::events::EventCallback;
use saarthi_handoff::{HandoffManager, TokenMinter};

struct StaticMinter;

impl TokenMinter for StaticMinter {
    fn mint_operator_token(
        &self,
        _room_name: &str,
        _agent_id: &str,
        _display_name: &str,
        _ttl_seconds: u64,
    ) -> Result<String> {
        Ok("test-token".into())
    }

    fn join_url(&self) -> &str {
        "wss://rooms.test"
    }
}

struct Harness {
    supervisor: CallSupervisor,
    tracker: Arc<ConversationTracker>,
    manager: Arc<HandoffManager>,
}

fn harness() -> Harness {
    let tracker = Arc::new(ConversationTracker::new());
    let manager = Arc::new(HandoffManager::new(Arc::new(StaticMinter)));
    let supervisor = CallSupervisor::new(
        tracker.clone(),
        Arc::new(EscalationEngine::new()),
        manager.clone(),
        Arc::new(EventCallback::disabled()),
        None,
    );
    Harness {
        supervisor,
        tracker,
        manager,
    }
}

async fn say(h: &Harness, call_id: &str, text: &str) {
    h.supervisor
        .ingest(
            call_id,
            PipelineEvent::Transcription { text: text.into() },
        )
        .await
        .unwrap();
}

/// Events are queued; wait until the per-call consumer has drained them.
async fn settle(h: &Harness, call_id: &str, check: impl Fn(&Harness) -> bool) {
    for _ in 0..100 {
        if check(h) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached for {call_id}");
}

#[tokio::test]
async fn safety_emergency_runs_the_full_operator_lifecycle() {
    let h = harness();
    h.supervisor.join("call-1", "room-1", None);

    say(&h, "call-1", "there has been an accident I need police").await;
    settle(&h, "call-1", |h| !h.manager.list_queue().is_empty()).await;

    let queue = h.manager.list_queue();
    assert_eq!(queue.len(), 1);
    let alert = &queue[0];
    assert_eq!(alert.trigger, HandoffTrigger::SafetyEmergency);
    assert_eq!(alert.priority, HandoffPriority::Urgent);
    assert_eq!(alert.queue_position, 1);
    assert_eq!(alert.estimated_wait_seconds, 60);

    // The live state carries the pinned trigger and full confidence.
    let state = h.tracker.get("call-1").unwrap();
    assert!(state.escalation_triggered);
    assert_eq!(state.escalation_confidence, 1.0);

    // Operator accepts, starts, completes.
    let assigned = h.manager.assign_agent(alert.id, "agent-1").await.unwrap();
    assert_eq!(assigned.status, HandoffStatus::Assigned);

    let transfer = h.manager.start_handoff_call(alert.id).await.unwrap();
    assert_eq!(transfer.status, "started");
    assert_eq!(transfer.join_token, "test-token");
    assert_eq!(transfer.room_name, "room-1");

    let completed = h
        .manager
        .complete_handoff(alert.id, Some("police informed".into()))
        .await
        .unwrap();
    assert_eq!(completed.status, HandoffStatus::Completed);

    h.supervisor.leave("call-1").await.unwrap();
}

#[tokio::test]
async fn declining_sentiment_builds_factor_pressure_without_false_triggers() {
    let h = harness();
    h.supervisor.join("call-1", "room-1", None);

    let utterances = [
        "my swap invoice looks wrong",
        "this is a problem, the charge is wrong",
        "this is really bad service",
        "I am angry and frustrated with this useless bot",
        "you are TERRIBLE!! this is WORST service!!!",
    ];
    for text in utterances {
        say(&h, "call-1", text).await;
    }
    settle(&h, "call-1", |h| {
        h.tracker
            .get("call-1")
            .map(|s| s.sentiment_history.len() == 5)
            .unwrap_or(false)
    })
    .await;

    let state = h.tracker.get("call-1").unwrap();
    assert_eq!(state.current_sentiment, SentimentLabel::Angry);
    assert!(state.sentiment_score <= -0.6);
    assert!(state.escalation_factors.sentiment >= 0.8);
    // Complaint wording keeps the intent factor elevated but non-critical.
    assert!(state.escalation_factors.high_risk_intent >= 0.4);
    assert!(state.escalation_confidence <= 1.0);
    // Pressure alone stays under the auto-escalate threshold.
    assert!(!state.escalation_triggered);
    assert!(h.manager.list_queue().is_empty());

    h.supervisor.leave("call-1").await.unwrap();
}

#[tokio::test]
async fn tool_failure_cascade_raises_the_failure_factor() {
    let h = harness();
    h.supervisor.join("call-1", "room-1", None);

    for _ in 0..2 {
        say(&h, "call-1", "please check my swap invoice problem").await;
        h.supervisor
            .ingest(
                "call-1",
                PipelineEvent::ToolStart {
                    name: "get_swap_history".into(),
                },
            )
            .await
            .unwrap();
        h.supervisor
            .ingest(
                "call-1",
                PipelineEvent::ToolResult {
                    name: None,
                    result: Some(serde_json::json!("error: upstream timeout")),
                },
            )
            .await
            .unwrap();
    }
    settle(&h, "call-1", |h| {
        h.tracker
            .get("call-1")
            .map(|s| s.tool_failure_count == 2)
            .unwrap_or(false)
    })
    .await;

    let state = h.tracker.get("call-1").unwrap();
    // Two failures, zero successes: failure_rate 1.0 (+0.3 penalty, capped).
    assert_eq!(state.escalation_factors.tool_failures, 1.0);
    assert!(state.escalation_confidence < 1.0);

    h.supervisor.leave("call-1").await.unwrap();
}

#[tokio::test]
async fn queue_orders_across_concurrent_calls() {
    let h = harness();

    // Three calls escalate with different priorities via direct manager
    // invocation (the operator-facing path is identical).
    for (call_id, trigger, priority) in [
        (
            "call-medium",
            HandoffTrigger::RepeatedQueries,
            HandoffPriority::Medium,
        ),
        (
            "call-urgent",
            HandoffTrigger::SafetyEmergency,
            HandoffPriority::Urgent,
        ),
        (
            "call-high",
            HandoffTrigger::ExplicitRequest,
            HandoffPriority::High,
        ),
    ] {
        let state = h.tracker.create(call_id, &format!("room-{call_id}"), None);
        h.manager
            .trigger_handoff(&state, trigger, priority)
            .await
            .unwrap();
    }

    let order: Vec<(String, usize)> = h
        .manager
        .list_queue()
        .iter()
        .map(|a| (a.call_id.clone(), a.queue_position))
        .collect();
    assert_eq!(
        order,
        vec![
            ("call-urgent".into(), 1),
            ("call-high".into(), 2),
            ("call-medium".into(), 3),
        ]
    );

    // Round-trip lookups hold until a terminal transition.
    for (call_id, position) in [("call-urgent", 1), ("call-high", 2), ("call-medium", 3)] {
        let alert = h.manager.get_by_call_id(call_id).unwrap();
        assert_eq!(alert.queue_position, position);
        assert_eq!(h.manager.get_alert(alert.id).unwrap().id, alert.id);
    }

    let stats = h.manager.queue_stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_priority.urgent, 1);
    assert_eq!(stats.by_priority.high, 1);
    assert_eq!(stats.by_priority.medium, 1);
}

#[tokio::test]
async fn call_end_abandons_queued_alert_and_frees_the_call_id() {
    let h = harness();
    h.supervisor.join("call-1", "room-1", None);

    say(&h, "call-1", "someone hacked my account, this is fraud").await;
    settle(&h, "call-1", |h| !h.manager.list_queue().is_empty()).await;
    let alert_id = h.manager.list_queue()[0].id;

    h.supervisor
        .ingest("call-1", PipelineEvent::End)
        .await
        .unwrap();
    settle(&h, "call-1", |h| h.supervisor.active_count() == 0).await;

    assert!(h.tracker.get("call-1").is_none());
    assert!(h.manager.list_queue().is_empty());
    assert_eq!(
        h.manager.get_alert(alert_id).unwrap().status,
        HandoffStatus::Abandoned
    );
    assert!(h.manager.status("call-1").is_none());
}

#[tokio::test]
async fn brief_reflects_declining_trend_from_the_summary_text() {
    let h = harness();
    let mut state = h.tracker.create("call-1", "room-1", None);
    state.sentiment_trend = SentimentTrend::Declining;
    state.current_sentiment = SentimentLabel::Frustrated;
    state.repeat_count = 2;
    state.last_repeated_query = Some("refund kab aayega".into());

    let alert = h
        .manager
        .trigger_handoff(&state, HandoffTrigger::HighFrustration, HandoffPriority::Medium)
        .await
        .unwrap();

    let brief = h.manager.agent_brief(alert.id).unwrap();
    assert_eq!(brief.confidence_trend, "declining");
    assert_eq!(brief.escalation_reason, "High Frustration");
    assert!(brief
        .suggested_actions
        .iter()
        .any(|a| a.action == "address_query"));
}
