//! Simple JSON Stream Encoder
//!
//! The whole text in a single SSE envelope. Used for the `simple` selector
//! and for any selector that is not recognized.
//! ```text
//! data: {"output":"full text"}
//!
//! data: [DONE]
//! ```

use serde_json::json;

use crate::stream_encoder::{sse_event, StreamEncoder, DONE_MARKER};

/// Single-envelope encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEncoder;

impl StreamEncoder for SimpleEncoder {
    fn name(&self) -> &str {
        "simple"
    }

    fn fragments(&self, text: &str, _chunk_words_per_frame: usize) -> Vec<String> {
        vec![text.to_string()]
    }

    fn frame(&self, fragment: &str, _is_last: bool) -> String {
        sse_event(&json!({ "output": fragment }).to_string())
    }

    fn postamble(&self) -> Vec<String> {
        vec![DONE_MARKER.to_string()]
    }

    fn is_paced(&self) -> bool {
        false
    }
}
