//! Stream Encoder System
//!
//! Provides a pluggable system for rendering a completed text into the
//! different incremental wire formats (OpenAI SSE, text-delta events,
//! NDJSON, simple envelope).

use std::fmt::{self, Debug};

use crate::encoders::{NdjsonEncoder, OpenAiEncoder, SimpleEncoder, TextDeltaEncoder};
use crate::stream::chunk_words;

/// SSE end-of-stream marker shared by the event-stream formats
pub const DONE_MARKER: &str = "data: [DONE]\n\n";

/// Content type for server-sent events
pub const EVENT_STREAM: &str = "text/event-stream";

/// Content type for newline-delimited JSON
pub const NDJSON: &str = "application/x-ndjson";

/// Frame a payload as a single SSE `data:` event
pub fn sse_event(data: &str) -> String {
    format!("data: {}\n\n", data)
}

/// Trait for rendering text into a streaming wire format
///
/// An encoder only knows how to frame things. Splitting, sequencing and
/// pacing are driven by [`crate::stream::FrameSequence`] and
/// [`crate::stream::paced`].
pub trait StreamEncoder: Send + Sync + Debug {
    /// Name of this encoder (for logging/debugging)
    fn name(&self) -> &str;

    /// Content type of the response body
    fn content_type(&self) -> &str {
        EVENT_STREAM
    }

    /// Split the text into content fragments
    fn fragments(&self, text: &str, chunk_words_per_frame: usize) -> Vec<String> {
        chunk_words(text, chunk_words_per_frame)
    }

    /// Frames emitted before any content
    fn preamble(&self) -> Vec<String> {
        Vec::new()
    }

    /// Frame a single content fragment
    fn frame(&self, fragment: &str, is_last: bool) -> String;

    /// Frames emitted after all content; the last one ends the stream
    fn postamble(&self) -> Vec<String>;

    /// Whether emission is delayed after each content frame
    fn is_paced(&self) -> bool {
        true
    }
}

/// Streaming wire formats accepted through the `format` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFormat {
    /// OpenAI `chat.completion.chunk` deltas over SSE
    #[default]
    OpenAi,
    /// Text-delta step events over SSE
    TextDelta,
    /// Newline-delimited JSON objects
    Ndjson,
    /// Whole text in one SSE envelope
    Simple,
}

impl StreamFormat {
    /// All formats, in the order they are advertised
    pub const ALL: [StreamFormat; 4] = [
        StreamFormat::OpenAi,
        StreamFormat::TextDelta,
        StreamFormat::Ndjson,
        StreamFormat::Simple,
    ];

    /// Resolve a caller-supplied selector. Matching is exact; anything
    /// unrecognized falls back to [`StreamFormat::Simple`].
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "openai" => Self::OpenAi,
            "textdelta" => Self::TextDelta,
            "ndjson" => Self::Ndjson,
            _ => Self::Simple,
        }
    }

    /// Selector string for this format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::TextDelta => "textdelta",
            Self::Ndjson => "ndjson",
            Self::Simple => "simple",
        }
    }

    /// Build a fresh encoder for one stream
    pub fn encoder(&self, model: &str) -> Box<dyn StreamEncoder> {
        match self {
            Self::OpenAi => Box::new(OpenAiEncoder::new(model)),
            Self::TextDelta => Box::new(TextDeltaEncoder),
            Self::Ndjson => Box::new(NdjsonEncoder),
            Self::Simple => Box::new(SimpleEncoder),
        }
    }

    /// Comma-separated list of every selector
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
