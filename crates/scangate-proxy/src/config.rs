//! Gateway configuration
//!
//! Built once at startup: defaults, then the optional YAML file, then CLI
//! flags and environment variables. The result is validated before the
//! server starts and shared read-only afterwards.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cli::Cli;

/// Default scanner endpoint
pub const DEFAULT_SCANNER_URL: &str =
    "https://service.api.aisecurity.paloaltonetworks.com/v1/scan/sync/request";

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("scanner API key is not set (PANW_AI_SEC_API_KEY)")]
    MissingApiKey,

    #[error("block status code {0} is not a valid HTTP status")]
    InvalidStatusCode(u16),

    #[error("{field} '{url}' is invalid: {reason}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        reason: String,
    },

    #[error("{field} is invalid: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// External scanner settings
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Model backend settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// HTTP status for prompt-blocked replies
    #[serde(default = "default_block_status")]
    pub block_status_code: u16,

    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Streaming chunking and pacing
    #[serde(default)]
    pub streaming: StreamSettings,
}

impl GatewayConfig {
    /// Load configuration from the optional file and CLI/env overrides, then
    /// validate it
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                serde_yaml::from_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(api_key) = &cli.api_key {
            self.scanner.api_key = api_key.clone();
        }
        if let Some(profile) = &cli.profile {
            self.scanner.profile = profile.clone();
        }
        if let Some(url) = &cli.scanner_url {
            self.scanner.endpoint = url.clone();
        }
        if let Some(timeout) = cli.scan_timeout {
            self.scanner.timeout_secs = timeout;
        }
        if cli.insecure_tls {
            self.scanner.insecure_tls = true;
        }
        if let Some(code) = cli.block_status_code {
            self.block_status_code = code;
        }
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(key) = &cli.openai_api_key {
            self.generator.api_key = Some(key.clone());
        }
        if let Some(base_url) = &cli.openai_base_url {
            self.generator.base_url = base_url.clone();
        }
        if let Some(model) = &cli.openai_model {
            self.generator.model = model.clone();
        }
    }

    /// Check every field the gateway relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.scanner.profile.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "profile",
                reason: "must not be empty".to_string(),
            });
        }
        if self.scanner.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan timeout",
                reason: "must be at least one second".to_string(),
            });
        }
        validate_http_url("scanner endpoint", &self.scanner.endpoint)?;

        if self.generator.is_enabled() {
            validate_http_url("generator base URL", &self.generator.base_url)?;
        }

        if !(100..=599).contains(&self.block_status_code)
            || StatusCode::from_u16(self.block_status_code).is_err()
        {
            return Err(ConfigError::InvalidStatusCode(self.block_status_code));
        }

        if self.streaming.chunk_words == 0 {
            return Err(ConfigError::InvalidValue {
                field: "streaming.chunk_words",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Status used for prompt-blocked replies
    pub fn block_status(&self) -> StatusCode {
        StatusCode::from_u16(self.block_status_code).unwrap_or(StatusCode::OK)
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.listen, self.server.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            generator: GeneratorConfig::default(),
            block_status_code: default_block_status(),
            server: ServerConfig::default(),
            streaming: StreamSettings::default(),
        }
    }
}

/// External scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// API key sent in the `x-pan-token` header
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Security profile applied by the scanner
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Scan endpoint
    #[serde(default = "default_scanner_url")]
    pub endpoint: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_scan_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key with everything after the first ten characters hidden
    pub fn masked_api_key(&self) -> String {
        let prefix: String = self.api_key.chars().take(10).collect();
        format!("{}...", prefix)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            profile: default_profile(),
            endpoint: default_scanner_url(),
            timeout_secs: default_scan_timeout(),
            insecure_tls: false,
        }
    }
}

/// Model backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// API key for the OpenAI-compatible backend; mock generation when unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_generator_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl GeneratorConfig {
    /// Whether a real backend is configured
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generator_url(),
            model: default_model(),
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

/// Streaming chunking and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Words per content frame
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Delay after each content frame, in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl StreamSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_words: default_chunk_words(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        url: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(format!("scheme '{}' is not http(s)", scheme))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

fn default_block_status() -> u16 {
    200
}

fn default_profile() -> String {
    "chatbot".to_string()
}

fn default_scanner_url() -> String {
    DEFAULT_SCANNER_URL.to_string()
}

fn default_scan_timeout() -> u64 {
    30
}

fn default_generator_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_chunk_words() -> usize {
    scangate_core::DEFAULT_CHUNK_WORDS
}

fn default_pacing_ms() -> u64 {
    scangate_core::DEFAULT_PACING.as_millis() as u64
}
