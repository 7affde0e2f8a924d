//! Text-delta SSE Stream Encoder
//!
//! ```text
//! data: {"type":"start"}
//! data: {"type":"start-step"}
//! data: {"type":"text-start","id":"0"}
//! data: {"type":"text-delta","id":"0","delta":"token "}
//! data: {"type":"text-end","id":"0"}
//! data: {"type":"finish-step"}
//! data: {"type":"finish"}
//! data: [DONE]
//! ```

use serde_json::json;

use crate::stream_encoder::{sse_event, StreamEncoder, DONE_MARKER};

/// Id of the single text part emitted by this encoder
const TEXT_PART_ID: &str = "0";

/// Text-delta step event encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeltaEncoder;

impl StreamEncoder for TextDeltaEncoder {
    fn name(&self) -> &str {
        "textdelta"
    }

    fn preamble(&self) -> Vec<String> {
        vec![
            sse_event(r#"{"type":"start"}"#),
            sse_event(r#"{"type":"start-step"}"#),
            sse_event(r#"{"type":"text-start","id":"0"}"#),
        ]
    }

    // Every delta carries a trailing space, including the last one.
    fn frame(&self, fragment: &str, _is_last: bool) -> String {
        let event = json!({
            "type": "text-delta",
            "id": TEXT_PART_ID,
            "delta": format!("{} ", fragment),
        });
        sse_event(&event.to_string())
    }

    fn postamble(&self) -> Vec<String> {
        vec![
            sse_event(r#"{"type":"text-end","id":"0"}"#),
            sse_event(r#"{"type":"finish-step"}"#),
            sse_event(r#"{"type":"finish"}"#),
            DONE_MARKER.to_string(),
        ]
    }
}
