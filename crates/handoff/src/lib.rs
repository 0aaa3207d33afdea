//! Handoff queue, lifecycle, fan-out, and operator token minting.
//!
//! When the escalation engine fires, the [`HandoffManager`] snapshots the
//! conversation into a [`HandoffAlert`](saarthi_domain::model::HandoffAlert),
//! queues it by priority, and drives it through the assignment lifecycle
//! while the [`AlertNotifier`] keeps operator dashboards in sync.

pub mod manager;
pub mod notifier;
pub mod queue;
pub mod token;

pub use manager::{AgentBrief, HandoffManager, HandoffStatusView, QueueStats, TransferInfo};
pub use notifier::{AlertEvent, AlertNotifier, AlertSink, SinkClosed};
pub use queue::HandoffQueue;
pub use token::{RoomTokenMinter, TokenMinter, UnconfiguredMinter};
