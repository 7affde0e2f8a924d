//! Test doubles for the scanner and the generator

use async_trait::async_trait;
use scangate_core::{Error, Result};
use scangate_policy::{ScanAction, ScanCategory, ScanVerdict};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::GatewayConfig;
use crate::generator::{GenerationMode, Generator, MockGenerator};
use crate::scanner::{ScanError, Scanner};

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.scanner.api_key = "test-api-key".to_string();
    config.streaming.pacing_ms = 0;
    config
}

pub fn verdict(category: ScanCategory, action: ScanAction) -> ScanVerdict {
    ScanVerdict {
        category,
        action,
        ..ScanVerdict::default()
    }
}

pub fn benign() -> ScanVerdict {
    verdict(ScanCategory::Benign, ScanAction::Allow)
}

pub fn malicious() -> ScanVerdict {
    let mut v = verdict(ScanCategory::Malicious, ScanAction::Block);
    v.prompt_findings.insert("injection".to_string(), true);
    v
}

/// Replays scripted results in order; once exhausted every call fails
pub struct ScriptedScanner {
    script: Mutex<VecDeque<std::result::Result<ScanVerdict, ScanError>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedScanner {
    pub fn new(script: Vec<std::result::Result<ScanVerdict, ScanError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scanner for ScriptedScanner {
    async fn try_scan(
        &self,
        prompt: &str,
        response: Option<&str>,
    ) -> std::result::Result<ScanVerdict, ScanError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), response.map(str::to_string)));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ScanError::Status {
                    status: 503,
                    body: "scanner unavailable".to_string(),
                })
            })
    }
}

/// Counts calls; produces mock text, fixed text, or an error
pub struct RecordingGenerator {
    calls: AtomicUsize,
    text: Option<String>,
    fail: bool,
}

impl RecordingGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: None,
            fail: false,
        })
    }

    pub fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: Some(text.to_string()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: None,
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn mode(&self) -> GenerationMode {
        GenerationMode::Mock
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::generation("backend unavailable"));
        }
        Ok(self
            .text
            .clone()
            .unwrap_or_else(|| MockGenerator::respond(prompt)))
    }
}
