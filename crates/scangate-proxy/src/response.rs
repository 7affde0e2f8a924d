//! Chat completion payloads returned to callers

use scangate_core::{word_count, ChatMessage};
use serde::{Deserialize, Serialize};

/// Model label reported in every reply
pub const MODEL_LABEL: &str = "gpt-3.5-turbo";

/// Replaces the output when the prompt is blocked
pub const PROMPT_BLOCK_NOTICE: &str =
    "⛔ This request was blocked by Prisma AIRS Runtime Security for violating security policies.";

/// Replaces the output when the generated response is blocked
pub const RESPONSE_BLOCK_NOTICE: &str = "⛔ The model's response was blocked by security policies.";

/// Completion tokens reported for the prompt-block notice. Fixed, not counted.
pub const BLOCKED_COMPLETION_TOKENS: u32 = 15;

/// Finish reason for every reply
pub const FINISH_STOP: &str = "stop";

/// OpenAI-compatible chat completions request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Content of the first user message, if it has any text
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.is_user())
            .map(|m| m.content.as_str())
            .filter(|content| !content.is_empty())
    }
}

/// OpenAI-compatible chat completions response (non-streaming)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Word-count token accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Count both sides by whitespace-delimited words
    pub fn counted(prompt: &str, output: &str) -> Self {
        Self::new(word_count(prompt) as u32, word_count(output) as u32)
    }

    /// Accounting for a prompt-blocked reply
    pub fn prompt_blocked(prompt: &str) -> Self {
        Self::new(word_count(prompt) as u32, BLOCKED_COMPLETION_TOKENS)
    }
}

/// Build the single-shot reply envelope around `text`
pub fn synthesize(text: &str, usage: Usage, finish_reason: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
        object: "chat.completion".to_string(),
        created: unix_now(),
        model: MODEL_LABEL.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::assistant(text),
            finish_reason: finish_reason.to_string(),
        }],
        usage,
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
