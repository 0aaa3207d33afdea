//! Inbound pipeline event contract.

use serde::{Deserialize, Serialize};

/// One typed event from the voice pipeline, keyed externally by call_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Final user transcription for one utterance.
    Transcription { text: String },
    /// The assistant started streaming a response.
    ResponseStart,
    /// One streamed fragment of the assistant response.
    TextFragment { text: String },
    /// The assistant response finished.
    ResponseEnd,
    /// A tool invocation began.
    ToolStart { name: String },
    /// A tool invocation finished. `result` of `null` counts as a failure.
    ToolResult {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        result: Option<serde_json::Value>,
    },
    /// The call ended.
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_wire_contract() {
        let event: PipelineEvent =
            serde_json::from_str(r#"{"type":"transcription","text":"hello"}"#).unwrap();
        assert!(matches!(event, PipelineEvent::Transcription { ref text } if text == "hello"));

        let event: PipelineEvent = serde_json::from_str(r#"{"type":"response_start"}"#).unwrap();
        assert!(matches!(event, PipelineEvent::ResponseStart));

        let event: PipelineEvent = serde_json::from_str(
            r#"{"type":"tool_result","name":"get_swap_history","result":{"ok":true}}"#,
        )
        .unwrap();
        match event {
            PipelineEvent::ToolResult { name, result } => {
                assert_eq!(name.as_deref(), Some("get_swap_history"));
                assert!(result.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Null results deserialize to None.
        let event: PipelineEvent =
            serde_json::from_str(r#"{"type":"tool_result","name":"x","result":null}"#).unwrap();
        match event {
            PipelineEvent::ToolResult { result, .. } => assert!(result.is_none()),
            other => panic!("unexpected event {other:?}"),
        }

        let event: PipelineEvent = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert!(matches!(event, PipelineEvent::End));
    }
}
