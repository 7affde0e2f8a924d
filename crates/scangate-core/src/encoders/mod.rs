//! Built-in stream encoders
//!
//! Provides encoders for the supported streaming formats:
//! - OpenAI (`chat.completion.chunk` deltas over SSE)
//! - Text-delta (start/step/text events over SSE)
//! - NDJSON (one JSON object per line)
//! - Simple (whole text in one envelope)

mod ndjson;
mod openai;
mod simple;
mod text_delta;

pub use ndjson::NdjsonEncoder;
pub use openai::OpenAiEncoder;
pub use simple::SimpleEncoder;
pub use text_delta::TextDeltaEncoder;

/// Append the inter-chunk separator unless this is the final fragment
pub(crate) fn with_separator(fragment: &str, is_last: bool) -> String {
    if is_last {
        fragment.to_string()
    } else {
        format!("{} ", fragment)
    }
}
