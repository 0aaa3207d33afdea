//! Fan-out of alert events to registered dashboard channels.
//!
//! Subscribers are asynchronous sinks (in practice: per-socket mpsc senders).
//! The subscriber list is snapshotted before fan-out so registration during
//! delivery is safe; a failing sink is logged, skipped, and pruned in a
//! tombstone pass after delivery. Per-subscriber delivery order matches
//! emission order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use saarthi_domain::model::HandoffAlert;

/// Returned by a sink whose transport is gone; the notifier prunes it.
#[derive(Debug)]
pub struct SinkClosed;

/// One alert event as delivered to a subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertEvent {
    NewAlert { alert: HandoffAlert },
    Update { event: String, alert: HandoffAlert },
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkClosed>;
}

#[derive(Default)]
pub struct AlertNotifier {
    subscribers: RwLock<Vec<(u64, Arc<dyn AlertSink>)>>,
    next_id: AtomicU64,
}

impl AlertNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; the returned id can be used to unsubscribe.
    pub fn subscribe(&self, sink: Arc<dyn AlertSink>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, sink));
        tracing::debug!(subscriber = id, "alert subscriber registered");
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.write().retain(|(sid, _)| *sid != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub async fn notify_new_alert(&self, alert: &HandoffAlert) {
        self.fan_out(AlertEvent::NewAlert {
            alert: alert.clone(),
        })
        .await;
    }

    pub async fn notify_update(&self, alert: &HandoffAlert, event: &str) {
        self.fan_out(AlertEvent::Update {
            event: event.to_owned(),
            alert: alert.clone(),
        })
        .await;
    }

    async fn fan_out(&self, event: AlertEvent) {
        // Snapshot so sinks registered mid-delivery are unaffected.
        let snapshot: Vec<(u64, Arc<dyn AlertSink>)> = self.subscribers.read().clone();
        let mut dead = Vec::new();

        for (id, sink) in &snapshot {
            if sink.deliver(&event).await.is_err() {
                tracing::warn!(subscriber = id, "alert sink closed, pruning");
                dead.push(*id);
            }
        }

        if !dead.is_empty() {
            self.subscribers
                .write()
                .retain(|(id, _)| !dead.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkClosed> {
            if self.fail {
                return Err(SinkClosed);
            }
            let label = match event {
                AlertEvent::NewAlert { .. } => "new".to_string(),
                AlertEvent::Update { event, .. } => event.clone(),
            };
            self.events.lock().push(label);
            Ok(())
        }
    }

    fn sample_alert() -> HandoffAlert {
        use chrono::Utc;
        use saarthi_domain::model::*;
        use uuid::Uuid;
        HandoffAlert {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            call_id: "call-1".into(),
            room_name: "room-1".into(),
            trigger: HandoffTrigger::ExplicitRequest,
            trigger_description: String::new(),
            priority: HandoffPriority::High,
            status: HandoffStatus::Queued,
            driver_info: DriverInfo::unknown(),
            intent_history: Vec::new(),
            current_intent: None,
            sentiment: SentimentLabel::Neutral,
            sentiment_score: 0.0,
            issue_summary: String::new(),
            detailed_summary: ConversationSummary {
                one_line_summary: String::new(),
                detailed_summary: String::new(),
                primary_issue: String::new(),
                secondary_issues: Vec::new(),
                stuck_on: None,
                topics_discussed: Vec::new(),
                resolution_attempted: false,
            },
            conversation_turns: Vec::new(),
            actions_taken_by_bot: Vec::new(),
            next_steps_for_agent: Vec::new(),
            queue_position: 1,
            estimated_wait_seconds: 60,
            assigned_agent_id: None,
            resolution: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn delivers_in_emission_order() {
        let notifier = AlertNotifier::new();
        let sink = RecordingSink::new(false);
        notifier.subscribe(sink.clone());

        let alert = sample_alert();
        notifier.notify_new_alert(&alert).await;
        notifier.notify_update(&alert, "assigned").await;
        notifier.notify_update(&alert, "started").await;

        assert_eq!(*sink.events.lock(), vec!["new", "assigned", "started"]);
    }

    #[tokio::test]
    async fn failing_sink_does_not_affect_others_and_is_pruned() {
        let notifier = AlertNotifier::new();
        let dead = RecordingSink::new(true);
        let live = RecordingSink::new(false);
        notifier.subscribe(dead);
        notifier.subscribe(live.clone());

        let alert = sample_alert();
        notifier.notify_new_alert(&alert).await;
        assert_eq!(*live.events.lock(), vec!["new"]);
        assert_eq!(notifier.subscriber_count(), 1);

        // Subsequent events go only to the survivor.
        notifier.notify_update(&alert, "assigned").await;
        assert_eq!(*live.events.lock(), vec!["new", "assigned"]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let notifier = AlertNotifier::new();
        let sink = RecordingSink::new(false);
        let id = notifier.subscribe(sink.clone());
        notifier.unsubscribe(id);

        notifier.notify_new_alert(&sample_alert()).await;
        assert!(sink.events.lock().is_empty());
    }
}
