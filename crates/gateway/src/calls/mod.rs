//! Per-call pipeline plumbing.
//!
//! Each live call gets a single-consumer event queue and a dedicated task:
//! pipeline events for a call_id are serialized through that task, so only
//! one writer ever touches the call's conversation state.

pub mod adapter;
pub mod pipeline;
pub mod supervisor;

pub use adapter::{HandoffHook, TrackingAdapter};
pub use pipeline::PipelineEvent;
pub use supervisor::{CallStatus, CallSupervisor};
