use crate::types::{ContentBlock, Message};

/// What a conversational caller needs from the stream, decoded once.
///
/// The wire protocol has many record kinds; a turn only ever needs text to
/// show, tool invocations to track, and the marker that the turn is over.
/// Everything else is dropped here.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Text(String),
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    TurnResult {
        is_error: bool,
        errors: Vec<String>,
    },
}

impl AgentEvent {
    /// Decode one wire message into zero or more events, in content order.
    pub fn decode(msg: Message) -> Vec<AgentEvent> {
        match msg {
            Message::Assistant(a) => a
                .message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } if !text.is_empty() => Some(AgentEvent::Text(text)),
                    ContentBlock::ToolUse { name, input, .. } => {
                        Some(AgentEvent::ToolUse { name, input })
                    }
                    _ => None,
                })
                .collect(),
            Message::Result(r) => vec![AgentEvent::TurnResult {
                is_error: r.is_error(),
                errors: r.errors,
            }],
            Message::System(_) | Message::User(_) | Message::Other => Vec::new(),
        }
    }

    pub fn is_turn_result(&self) -> bool {
        matches!(self, AgentEvent::TurnResult { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Message {
        serde_json::from_str(json).expect("failed to parse message")
    }

    #[test]
    fn assistant_blocks_decode_in_order() {
        let msg = parse(
            r##"{
            "type": "assistant",
            "session_id": "s1",
            "parent_tool_use_id": null,
            "message": {
                "id": "m1", "role": "assistant", "model": "x",
                "content": [
                    {"type": "text", "text": "Saving the summary."},
                    {"type": "tool_use", "id": "tu_1", "name": "Write",
                     "input": {"file_path": "/p/features/cart.md", "content": "# Cart"}},
                    {"type": "thinking", "thinking": "hmm"}
                ]
            }
        }"##,
        );
        let events = AgentEvent::decode(msg);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], AgentEvent::Text("Saving the summary.".into()));
        let AgentEvent::ToolUse { name, input } = &events[1] else {
            panic!("expected ToolUse, got {:?}", events[1]);
        };
        assert_eq!(name, "Write");
        assert_eq!(input["file_path"], "/p/features/cart.md");
    }

    #[test]
    fn result_decodes_to_turn_result() {
        let msg = parse(
            r#"{"type":"result","subtype":"error_max_turns","session_id":"s1",
                "is_error":true,"num_turns":10,"errors":["Reached maximum turn limit"]}"#,
        );
        let events = AgentEvent::decode(msg);
        assert_eq!(
            events,
            vec![AgentEvent::TurnResult {
                is_error: true,
                errors: vec!["Reached maximum turn limit".into()],
            }]
        );
        assert!(events[0].is_turn_result());
    }

    #[test]
    fn unknown_types_decode_to_nothing() {
        for json in [
            r#"{"type":"rate_limit_event","session_id":"s1"}"#,
            r#"{"type":"system","subtype":"some_future_subtype","session_id":"s1"}"#,
            r#"{"type":"user","session_id":"s1","message":{"role":"user","content":[]}}"#,
        ] {
            assert!(AgentEvent::decode(parse(json)).is_empty(), "{json}");
        }
    }

    #[test]
    fn unknown_content_blocks_are_skipped() {
        let msg = parse(
            r#"{"type":"assistant","session_id":"s1","message":{"content":[
                {"type":"server_tool_use","id":"x"},
                {"type":"text","text":"ok"}
            ]}}"#,
        );
        assert_eq!(AgentEvent::decode(msg), vec![AgentEvent::Text("ok".into())]);
    }
}
