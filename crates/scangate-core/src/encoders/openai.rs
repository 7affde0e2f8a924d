//! OpenAI SSE Stream Encoder
//!
//! Renders text in the OpenAI chat completions streaming format:
//! ```text
//! data: {"id":"chatcmpl-xxx","object":"chat.completion.chunk","created":1234567890,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":"token"},"finish_reason":null}]}
//!
//! data: [DONE]
//! ```

use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use super::with_separator;
use crate::stream_encoder::{sse_event, StreamEncoder, DONE_MARKER};

/// OpenAI SSE stream encoder
///
/// Each instance carries one completion id, shared by every event of the
/// stream it renders.
#[derive(Debug, Clone)]
pub struct OpenAiEncoder {
    id: String,
    model: String,
}

impl OpenAiEncoder {
    /// Create an encoder with a fresh completion id
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            model: model.into(),
        }
    }

    /// Completion id used by every event of this stream
    pub fn id(&self) -> &str {
        &self.id
    }

    fn event(&self, delta: Value, finish_reason: Option<&str>) -> String {
        let chunk = json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": unix_now(),
            "model": self.model,
            "choices": [{
                "index": 0,
                "delta": delta,
                "finish_reason": finish_reason,
            }],
        });
        sse_event(&chunk.to_string())
    }
}

impl StreamEncoder for OpenAiEncoder {
    fn name(&self) -> &str {
        "openai"
    }

    fn frame(&self, fragment: &str, is_last: bool) -> String {
        self.event(json!({ "content": with_separator(fragment, is_last) }), None)
    }

    fn postamble(&self) -> Vec<String> {
        vec![self.event(json!({}), Some("stop")), DONE_MARKER.to_string()]
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
