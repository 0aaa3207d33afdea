//! Call supervisor — one consumer task per live call.
//!
//! `join` registers a call and spawns its event consumer; `ingest` feeds
//! pipeline events into the per-call queue; `leave` performs a bounded stop
//! (5 s grace, then force-cancel). Each consumer removes its own entry when
//! the call ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use saarthi_conversations::{ConversationTracker, EscalationEngine};
use saarthi_domain::model::DriverInfo;
use saarthi_domain::{Error, Result};
use saarthi_handoff::HandoffManager;
use saarthi_nlu::ResponseSanitizer;

use crate::calls::adapter::{HandoffHook, TrackingAdapter};
use crate::calls::pipeline::PipelineEvent;
use crate::events::EventCallback;

/// Grace period for a consumer to drain after an End event before the task
/// is force-cancelled.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Event queue depth per call.
const EVENT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    pub call_id: String,
    pub room_name: String,
    pub is_active: bool,
    pub state: String,
    pub joined_at: DateTime<Utc>,
}

struct CallHandle {
    room_name: String,
    joined_at: DateTime<Utc>,
    tx: mpsc::Sender<PipelineEvent>,
    task: tokio::task::JoinHandle<()>,
}

impl CallHandle {
    fn status(&self, call_id: &str) -> CallStatus {
        CallStatus {
            call_id: call_id.to_owned(),
            room_name: self.room_name.clone(),
            is_active: true,
            state: "active".into(),
            joined_at: self.joined_at,
        }
    }
}

pub struct CallSupervisor {
    calls: Arc<Mutex<HashMap<String, CallHandle>>>,
    tracker: Arc<ConversationTracker>,
    engine: Arc<EscalationEngine>,
    manager: Arc<HandoffManager>,
    events: Arc<EventCallback>,
    sanitizer: Arc<ResponseSanitizer>,
    hook: Option<Arc<dyn HandoffHook>>,
}

impl CallSupervisor {
    pub fn new(
        tracker: Arc<ConversationTracker>,
        engine: Arc<EscalationEngine>,
        manager: Arc<HandoffManager>,
        events: Arc<EventCallback>,
        hook: Option<Arc<dyn HandoffHook>>,
    ) -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            tracker,
            engine,
            manager,
            events,
            sanitizer: Arc::new(ResponseSanitizer::new()),
            hook,
        }
    }

    /// Register a call and spawn its consumer. Idempotent: joining a live
    /// call_id again returns the existing status with a warning.
    pub fn join(
        &self,
        call_id: &str,
        room_name: &str,
        driver_info: Option<DriverInfo>,
    ) -> CallStatus {
        {
            let calls = self.calls.lock();
            if let Some(existing) = calls.get(call_id) {
                tracing::warn!(call_id = %call_id, "call already active, not rejoining");
                return existing.status(call_id);
            }
        }

        let (tx, mut rx) = mpsc::channel::<PipelineEvent>(EVENT_QUEUE_DEPTH);
        let mut adapter = TrackingAdapter::new(
            call_id,
            room_name,
            driver_info,
            self.tracker.clone(),
            self.engine.clone(),
            self.manager.clone(),
            self.events.clone(),
            self.sanitizer.clone(),
            self.hook.clone(),
        );

        let calls = self.calls.clone();
        let task_call_id = call_id.to_owned();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !adapter.handle(event).await {
                    break;
                }
            }
            calls.lock().remove(&task_call_id);
            tracing::info!(call_id = %task_call_id, "call consumer stopped");
        });

        let handle = CallHandle {
            room_name: room_name.to_owned(),
            joined_at: Utc::now(),
            tx,
            task,
        };
        let status = handle.status(call_id);
        self.calls.lock().insert(call_id.to_owned(), handle);
        tracing::info!(call_id = %call_id, room_name = %room_name, "call joined");
        status
    }

    /// Feed one pipeline event into the call's queue.
    pub async fn ingest(&self, call_id: &str, event: PipelineEvent) -> Result<()> {
        let tx = self
            .calls
            .lock()
            .get(call_id)
            .map(|handle| handle.tx.clone())
            .ok_or_else(|| Error::NotFound(format!("call {call_id}")))?;

        tx.send(event)
            .await
            .map_err(|_| Error::InvalidState(format!("consumer for call {call_id} has stopped")))
    }

    /// Stop a call: queue an End event, wait up to 5 s for the consumer to
    /// drain, then force-cancel. Unknown call_ids are a logged no-op.
    pub async fn leave(&self, call_id: &str) -> Result<()> {
        let handle = self.calls.lock().remove(call_id);
        let Some(handle) = handle else {
            tracing::warn!(call_id = %call_id, "no active call to leave");
            return Ok(());
        };

        let _ = handle.tx.send(PipelineEvent::End).await;

        let abort = handle.task.abort_handle();
        if tokio::time::timeout(STOP_TIMEOUT, handle.task).await.is_err() {
            tracing::warn!(call_id = %call_id, "consumer stop timed out, force-cancelling");
            abort.abort();
            // The consumer never ran its cleanup; do it here.
            let _ = self.tracker.remove(call_id);
            let _ = self.manager.abandon_for_call(call_id).await;
        }

        tracing::info!(call_id = %call_id, "call left");
        Ok(())
    }

    pub fn status(&self, call_id: &str) -> Option<CallStatus> {
        self.calls
            .lock()
            .get(call_id)
            .map(|handle| handle.status(call_id))
    }

    pub fn list(&self) -> Vec<CallStatus> {
        self.calls
            .lock()
            .iter()
            .map(|(call_id, handle)| handle.status(call_id))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Stop every call (server shutdown).
    pub async fn shutdown(&self) {
        let call_ids: Vec<String> = self.calls.lock().keys().cloned().collect();
        tracing::info!(count = call_ids.len(), "stopping all active calls");
        for call_id in call_ids {
            let _ = self.leave(&call_id).await;
        }
    }
}
