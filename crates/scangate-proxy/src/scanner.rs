//! Runtime security scan client
//!
//! One POST per scan, no retries. [`Scanner::try_scan`] reports every failure
//! as a [`ScanError`]; [`Scanner::scan`] is the fail-open boundary the
//! gateway calls, turning any failure into [`ScanVerdict::fail_open`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use scangate_policy::ScanVerdict;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ScannerConfig;

/// Header carrying the scanner API key
pub const API_KEY_HEADER: &str = "x-pan-token";

/// Errors from a single scanner call
#[derive(Debug, Error)]
pub enum ScanError {
    /// Connection, TLS or timeout failure
    #[error("scanner request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scanner returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scanner response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("scanner API key is not a valid header value")]
    InvalidApiKey,
}

/// Body of a scan call
#[derive(Debug, Clone, Serialize)]
pub struct ScanRequest {
    /// Correlation token, unique per call
    pub tr_id: String,
    pub ai_profile: AiProfile,
    pub contents: Vec<ScanContent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiProfile {
    pub profile_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanContent {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ScanRequest {
    /// Build a request with a fresh correlation token. `response` is only
    /// set for the post-generation scan.
    pub fn new(profile: &str, prompt: &str, response: Option<&str>) -> Self {
        Self {
            tr_id: uuid::Uuid::new_v4().to_string(),
            ai_profile: AiProfile {
                profile_name: profile.to_string(),
            },
            contents: vec![ScanContent {
                prompt: prompt.to_string(),
                response: response.map(str::to_string),
            }],
        }
    }
}

/// A content-safety scanner
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan a prompt, or a prompt and its candidate response
    async fn try_scan(&self, prompt: &str, response: Option<&str>)
        -> Result<ScanVerdict, ScanError>;

    /// Scan, letting the request through when the scanner is unavailable
    async fn scan(&self, prompt: &str, response: Option<&str>) -> ScanVerdict {
        match self.try_scan(prompt, response).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Scanner unavailable, failing open: {}", e);
                metrics::counter!("scangate_scan_failures_total").increment(1);
                ScanVerdict::fail_open(e.to_string())
            }
        }
    }
}

/// HTTP client for the runtime security scan API
pub struct RuntimeScanClient {
    http_client: reqwest::Client,
    endpoint: String,
    profile: String,
}

impl RuntimeScanClient {
    pub fn new(config: &ScannerConfig) -> Result<Self, ScanError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ScanError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        if config.insecure_tls {
            warn!("Scanner TLS certificate verification is disabled");
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            profile: config.profile.clone(),
        })
    }
}

#[async_trait]
impl Scanner for RuntimeScanClient {
    async fn try_scan(
        &self,
        prompt: &str,
        response: Option<&str>,
    ) -> Result<ScanVerdict, ScanError> {
        let request = ScanRequest::new(&self.profile, prompt, response);
        debug!(tr_id = %request.tr_id, has_response = response.is_some(), "Sending scan request");

        let reply = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = reply.status();
        let body = reply.text().await?;
        if !status.is_success() {
            return Err(ScanError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let verdict: ScanVerdict = serde_json::from_str(&body)?;
        debug!(
            tr_id = %request.tr_id,
            category = ?verdict.category,
            action = ?verdict.action,
            "Scan complete"
        );
        Ok(verdict)
    }
}
