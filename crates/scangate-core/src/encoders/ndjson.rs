//! NDJSON Stream Encoder
//!
//! One JSON object per line, no SSE framing:
//! ```text
//! {"type":"text-delta","id":"0","delta":"token "}
//! {"type":"done"}
//! ```

use serde_json::json;

use super::with_separator;
use crate::stream_encoder::{StreamEncoder, NDJSON};

/// Newline-delimited JSON encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonEncoder;

impl StreamEncoder for NdjsonEncoder {
    fn name(&self) -> &str {
        "ndjson"
    }

    fn content_type(&self) -> &str {
        NDJSON
    }

    fn frame(&self, fragment: &str, is_last: bool) -> String {
        let line = json!({
            "type": "text-delta",
            "id": "0",
            "delta": with_separator(fragment, is_last),
        });
        format!("{}\n", line)
    }

    fn postamble(&self) -> Vec<String> {
        vec![format!("{}\n", json!({ "type": "done" }))]
    }
}
