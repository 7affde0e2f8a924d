//! Core gateway logic
//!
//! A turn runs in a fixed order: scan the prompt, stop on a block, generate,
//! scan prompt and response together, and swap the text for a notice if that
//! second verdict blocks.

use anyhow::Result;
use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusHandle;
use scangate_core::ChatTurn;
use scangate_policy::{decide, Decision, Phase, ScanVerdict};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::generator::{self, Generator};
use crate::response::{Usage, PROMPT_BLOCK_NOTICE, RESPONSE_BLOCK_NOTICE};
use crate::scanner::{RuntimeScanClient, Scanner};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration
    pub config: Arc<GatewayConfig>,

    /// Content-safety scanner
    pub scanner: Arc<dyn Scanner>,

    /// Model backend
    pub generator: Arc<dyn Generator>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Initialize application state from configuration
    pub fn new(config: GatewayConfig, metrics_handle: Option<PrometheusHandle>) -> Result<Self> {
        info!("Initializing application state");

        let scanner = RuntimeScanClient::new(&config.scanner)
            .map_err(|e| anyhow::anyhow!("Failed to build scan client: {}", e))?;
        let generator = generator::from_config(&config.generator)?;
        info!("Generation mode: {}", generator.mode());

        Ok(Self {
            config: Arc::new(config),
            scanner: Arc::new(scanner),
            generator,
            metrics_handle,
        })
    }

    /// Assemble state from already-built components
    pub fn with_components(
        config: GatewayConfig,
        scanner: Arc<dyn Scanner>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            scanner,
            generator,
            metrics_handle: None,
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allowed,
    PromptBlocked,
    ResponseBlocked,
}

/// Result of running one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: ChatTurn,
    pub disposition: Disposition,
}

impl TurnOutcome {
    /// Token accounting for the reply
    pub fn usage(&self) -> Usage {
        match self.disposition {
            Disposition::PromptBlocked => Usage::prompt_blocked(&self.turn.prompt),
            _ => Usage::counted(&self.turn.prompt, self.turn.output()),
        }
    }

    /// HTTP status for the reply; only prompt blocks use the configured code
    pub fn status(&self, block_status: StatusCode) -> StatusCode {
        match self.disposition {
            Disposition::PromptBlocked => block_status,
            _ => StatusCode::OK,
        }
    }
}

/// Run the scan/generate/scan sequence for one prompt
pub async fn execute_turn(
    state: &AppState,
    prompt: &str,
    request_id: &str,
) -> scangate_core::Result<TurnOutcome> {
    let mut turn = ChatTurn::new(prompt);

    let (verdict, decision) = scan_phase(state, Phase::Prompt, prompt, None, request_id).await;
    if decision.is_block() {
        info!(request_id, "Prompt BLOCKED");
        turn.block(block_reason(Phase::Prompt, &verdict), PROMPT_BLOCK_NOTICE);
        return Ok(TurnOutcome {
            turn,
            disposition: Disposition::PromptBlocked,
        });
    }

    debug!(request_id, "Prompt allowed, generating with {}", state.generator.mode());
    let generated = state.generator.generate(prompt).await?;
    turn.complete(generated);

    // A blank completion is still rescanned, as a prompt-only request.
    let response = Some(turn.output()).filter(|text| !text.trim().is_empty());
    let (verdict, decision) =
        scan_phase(state, Phase::Response, prompt, response, request_id).await;
    if decision.is_block() {
        info!(request_id, "Response BLOCKED");
        turn.block(block_reason(Phase::Response, &verdict), RESPONSE_BLOCK_NOTICE);
        return Ok(TurnOutcome {
            turn,
            disposition: Disposition::ResponseBlocked,
        });
    }

    Ok(TurnOutcome {
        turn,
        disposition: Disposition::Allowed,
    })
}

/// Scan one phase and record its latency, findings and decision
async fn scan_phase(
    state: &AppState,
    phase: Phase,
    prompt: &str,
    response: Option<&str>,
    request_id: &str,
) -> (ScanVerdict, Decision) {
    let start = Instant::now();
    let verdict = state.scanner.scan(prompt, response).await;
    let latency = start.elapsed();

    metrics::histogram!("scangate_scan_latency_us", "phase" => phase.as_str())
        .record(latency.as_micros() as f64);

    let threats = match phase {
        Phase::Prompt => verdict.prompt_threats(),
        Phase::Response => verdict.response_threats(),
    };
    if !threats.is_empty() {
        warn!(request_id, %phase, "Detected threats: {}", threats.join(", "));
    }

    let decision = decide(&verdict);
    metrics::counter!(
        "scangate_decisions_total",
        "phase" => phase.as_str(),
        "action" => decision.as_str()
    )
    .increment(1);

    info!(
        request_id,
        %phase,
        category = ?verdict.category,
        action = ?verdict.action,
        %decision,
        latency_us = latency.as_micros() as u64,
        "Scan result"
    );

    (verdict, decision)
}

fn block_reason(phase: Phase, verdict: &ScanVerdict) -> String {
    format!(
        "{} scan: category {:?}, action {:?}",
        phase, verdict.category, verdict.action
    )
}
