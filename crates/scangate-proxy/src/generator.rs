//! Model backends
//!
//! The gateway produces text with a mock generator unless an API key for an
//! OpenAI-compatible backend is configured.

use async_trait::async_trait;
use scangate_core::{ChatMessage, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::GeneratorConfig;

/// Prompt characters echoed back by the mock generator
const MOCK_ECHO_CHARS: usize = 50;

/// Backend request timeout
const BACKEND_TIMEOUT: Duration = Duration::from_secs(120);

/// Which backend produces the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Mock,
    OpenAi,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a completion for a prompt
#[async_trait]
pub trait Generator: Send + Sync {
    fn mode(&self) -> GenerationMode;

    /// Generate the full completion text for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the generator selected by the configuration
pub fn from_config(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    match config.api_key.as_deref() {
        Some(key) if config.is_enabled() => Ok(Arc::new(OpenAiGenerator::new(
            &config.base_url,
            key,
            &config.model,
        )?)),
        _ => Ok(Arc::new(MockGenerator)),
    }
}

/// Deterministic generator that echoes the start of the prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn respond(prompt: &str) -> String {
        let head: String = prompt.chars().take(MOCK_ECHO_CHARS).collect();
        format!("This is a safe streaming response to your prompt: {}...", head)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Mock
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(Self::respond(prompt))
    }
}

#[derive(Debug, Serialize)]
struct BackendRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct BackendResponse {
    #[serde(default)]
    choices: Vec<BackendChoice>,
}

#[derive(Debug, Deserialize)]
struct BackendChoice {
    message: ChatMessage,
}

/// Generator backed by an OpenAI-compatible chat completions API
pub struct OpenAiGenerator {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .map_err(|e| Error::generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn mode(&self) -> GenerationMode {
        GenerationMode::OpenAi
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = BackendRequest {
            model: &self.model,
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
        };
        debug!("Forwarding prompt to backend model {}", self.model);

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("backend request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::generation(format!("backend returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::generation(format!("failed to read backend response: {}", e)))?;
        let parsed: BackendResponse = serde_json::from_str(&body)?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::generation("backend response has no choices"))
    }
}
