//! Core types for ScanGate

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Whether this message was sent by the user
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// One request/response exchange, alive only for the duration of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTurn {
    /// The user prompt that opened the turn
    pub prompt: String,

    /// Model output, or the block notice that replaced it
    pub generated_text: String,

    /// Whether either scan blocked this turn
    pub blocked: bool,

    /// Human-readable reason recorded when the turn was blocked
    pub block_reason: Option<String>,
}

impl ChatTurn {
    /// Open a turn for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Record the generated text
    pub fn complete(&mut self, text: impl Into<String>) {
        self.generated_text = text.into();
    }

    /// Replace the output with a block notice
    pub fn block(&mut self, reason: impl Into<String>, notice: impl Into<String>) {
        self.blocked = true;
        self.block_reason = Some(reason.into());
        self.generated_text = notice.into();
    }

    /// The text that will be delivered to the caller
    pub fn output(&self) -> &str {
        &self.generated_text
    }
}

/// Role of a frame inside an encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Bookkeeping frame (preamble, finish event, end marker)
    Framing,
    /// Frame carrying a fragment of the text
    Content,
}

/// One framed piece of a streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    /// Position in the stream, starting at zero
    pub sequence: usize,

    /// Whether the frame carries content or bookkeeping
    pub kind: ChunkKind,

    /// Wire-ready frame text, including its delimiter
    pub payload: String,

    /// Set on the last frame of the stream
    pub is_terminal: bool,
}

impl StreamChunk {
    /// Check if this chunk carries a content fragment
    pub fn is_content(&self) -> bool {
        self.kind == ChunkKind::Content
    }

    /// Convert into body bytes
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.payload)
    }
}
