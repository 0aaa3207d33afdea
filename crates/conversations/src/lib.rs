//! Live conversation tracking and escalation scoring.
//!
//! The [`ConversationTracker`] owns every active call's state and is the only
//! writer; the [`EscalationEngine`] is a pure scorer over that state. Both
//! are plain objects constructed by the caller — tests build fresh instances,
//! the gateway builds one of each at startup.

pub mod engine;
pub mod tracker;

pub use engine::{EscalationEngine, EscalationOutcome};
pub use tracker::{ConversationTracker, ToolCallStats, TrackerSummary};
