//! Priority queue for handoff alerts.
//!
//! Stable ordering by (priority rank, created_at): urgent first, FIFO within
//! a priority. Every mutation re-indexes 1-based queue positions over the
//! current ordering. Lookups by alert id and call_id are O(1).

use std::collections::HashMap;

use uuid::Uuid;

use saarthi_domain::model::HandoffAlert;

#[derive(Default)]
pub struct HandoffQueue {
    /// Alert ids in queue order (position = index + 1).
    order: Vec<Uuid>,
    alerts: HashMap<Uuid, HandoffAlert>,
    by_call_id: HashMap<String, Uuid>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alert, re-sort, re-index, and return its 1-based position.
    pub fn add(&mut self, alert: HandoffAlert) -> usize {
        let id = alert.id;
        self.by_call_id.insert(alert.call_id.clone(), id);
        self.alerts.insert(id, alert);
        self.order.push(id);
        self.resort();
        let position = self
            .order
            .iter()
            .position(|queued| *queued == id)
            .expect("just inserted")
            + 1;
        tracing::info!(alert_id = %id, position, "alert queued");
        position
    }

    /// Remove an alert and re-index the remainder.
    pub fn remove(&mut self, alert_id: &Uuid) -> Option<HandoffAlert> {
        let alert = self.alerts.remove(alert_id)?;
        self.order.retain(|id| id != alert_id);
        self.by_call_id.remove(&alert.call_id);
        self.reindex();
        tracing::info!(alert_id = %alert_id, "alert removed from queue");
        Some(alert)
    }

    pub fn get(&self, alert_id: &Uuid) -> Option<&HandoffAlert> {
        self.alerts.get(alert_id)
    }

    pub fn get_mut(&mut self, alert_id: &Uuid) -> Option<&mut HandoffAlert> {
        self.alerts.get_mut(alert_id)
    }

    pub fn get_by_call_id(&self, call_id: &str) -> Option<&HandoffAlert> {
        self.by_call_id
            .get(call_id)
            .and_then(|id| self.alerts.get(id))
    }

    /// Next alert an operator should take: front of the queue.
    pub fn next(&self) -> Option<&HandoffAlert> {
        self.order.first().and_then(|id| self.alerts.get(id))
    }

    /// All queued alerts in queue order.
    pub fn all(&self) -> Vec<HandoffAlert> {
        self.order
            .iter()
            .filter_map(|id| self.alerts.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Stable sort by (priority rank, created_at), then re-index positions.
    fn resort(&mut self) {
        let alerts = &self.alerts;
        self.order.sort_by_key(|id| {
            let alert = &alerts[id];
            (alert.priority.rank(), alert.created_at)
        });
        self.reindex();
    }

    fn reindex(&mut self) {
        for (i, id) in self.order.iter().enumerate() {
            if let Some(alert) = self.alerts.get_mut(id) {
                alert.queue_position = i + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use saarthi_domain::model::{
        ConversationSummary, DriverInfo, HandoffPriority, HandoffStatus, HandoffTrigger,
        SentimentLabel,
    };

    fn alert(call_id: &str, priority: HandoffPriority) -> HandoffAlert {
        HandoffAlert {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            call_id: call_id.into(),
            room_name: format!("room-{call_id}"),
            trigger: HandoffTrigger::ConfidenceThreshold,
            trigger_description: "Escalation triggered".into(),
            priority,
            status: HandoffStatus::Queued,
            driver_info: DriverInfo::unknown(),
            intent_history: Vec::new(),
            current_intent: None,
            sentiment: SentimentLabel::Neutral,
            sentiment_score: 0.0,
            issue_summary: "Unresolved query".into(),
            detailed_summary: ConversationSummary {
                one_line_summary: "Unresolved query".into(),
                detailed_summary: String::new(),
                primary_issue: "Unresolved query".into(),
                secondary_issues: Vec::new(),
                stuck_on: None,
                topics_discussed: Vec::new(),
                resolution_attempted: false,
            },
            conversation_turns: Vec::new(),
            actions_taken_by_bot: Vec::new(),
            next_steps_for_agent: Vec::new(),
            queue_position: 0,
            estimated_wait_seconds: 0,
            assigned_agent_id: None,
            resolution: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn orders_by_priority_then_arrival() {
        let mut queue = HandoffQueue::new();
        let a = alert("a", HandoffPriority::Medium);
        let b = alert("b", HandoffPriority::Urgent);
        let c = alert("c", HandoffPriority::High);
        let d = alert("d", HandoffPriority::Medium);

        queue.add(a.clone());
        queue.add(b.clone());
        queue.add(c.clone());
        queue.add(d.clone());

        let order: Vec<String> = queue.all().iter().map(|x| x.call_id.clone()).collect();
        assert_eq!(order, vec!["b", "c", "a", "d"]);

        let positions: Vec<usize> = queue.all().iter().map(|x| x.queue_position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn removal_reindexes_positions() {
        let mut queue = HandoffQueue::new();
        let a = alert("a", HandoffPriority::Medium);
        let b = alert("b", HandoffPriority::Urgent);
        let c = alert("c", HandoffPriority::High);
        let d = alert("d", HandoffPriority::Medium);
        let b_id = b.id;

        queue.add(a);
        queue.add(b);
        queue.add(c);
        queue.add(d);

        queue.remove(&b_id).unwrap();

        let snapshot = queue.all();
        let view: Vec<(String, usize)> = snapshot
            .iter()
            .map(|x| (x.call_id.clone(), x.queue_position))
            .collect();
        assert_eq!(
            view,
            vec![("c".into(), 1), ("a".into(), 2), ("d".into(), 3)]
        );
    }

    #[test]
    fn positions_are_a_permutation_after_arbitrary_mutations() {
        let mut queue = HandoffQueue::new();
        let mut ids = Vec::new();
        for (i, priority) in [
            HandoffPriority::Low,
            HandoffPriority::Urgent,
            HandoffPriority::Medium,
            HandoffPriority::High,
            HandoffPriority::Medium,
            HandoffPriority::Urgent,
        ]
        .iter()
        .enumerate()
        {
            let a = alert(&format!("call-{i}"), *priority);
            ids.push(a.id);
            queue.add(a);
        }
        queue.remove(&ids[1]).unwrap();
        queue.remove(&ids[4]).unwrap();

        let mut positions: Vec<usize> =
            queue.all().iter().map(|a| a.queue_position).collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=queue.len()).collect::<Vec<_>>());

        // And the ordering respects (rank, created_at).
        let snapshot = queue.all();
        for pair in snapshot.windows(2) {
            let key0 = (pair[0].priority.rank(), pair[0].created_at);
            let key1 = (pair[1].priority.rank(), pair[1].created_at);
            assert!(key0 <= key1);
        }
    }

    #[test]
    fn equal_priority_keeps_enqueue_order() {
        let mut queue = HandoffQueue::new();
        for i in 0..4 {
            queue.add(alert(&format!("m{i}"), HandoffPriority::Medium));
        }
        let order: Vec<String> = queue.all().iter().map(|x| x.call_id.clone()).collect();
        assert_eq!(order, vec!["m0", "m1", "m2", "m3"]);
    }

    #[test]
    fn lookup_by_id_and_call_id() {
        let mut queue = HandoffQueue::new();
        let a = alert("call-x", HandoffPriority::High);
        let id = a.id;
        queue.add(a);

        assert_eq!(queue.get(&id).unwrap().call_id, "call-x");
        assert_eq!(queue.get_by_call_id("call-x").unwrap().id, id);
        assert!(queue.get_by_call_id("nope").is_none());
    }

    #[test]
    fn next_is_the_front_of_the_queue() {
        let mut queue = HandoffQueue::new();
        assert!(queue.next().is_none());
        queue.add(alert("low", HandoffPriority::Low));
        queue.add(alert("urgent", HandoffPriority::Urgent));
        assert_eq!(queue.next().unwrap().call_id, "urgent");
    }
}
