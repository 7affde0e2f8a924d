//! Scanner verdict definitions

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Threat-type name to detected flag, as reported by the scanner
pub type Findings = BTreeMap<String, bool>;

/// Classification assigned by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanCategory {
    Benign,
    Malicious,
    /// Synthesized locally when the scanner could not be reached
    Error,
    /// Missing or unrecognized value
    #[default]
    #[serde(other)]
    Unknown,
}

/// Action recommended by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    Allow,
    Alert,
    Block,
    /// Missing or unrecognized value
    #[default]
    #[serde(other)]
    Unknown,
}

/// Result of one scanner call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanVerdict {
    #[serde(default)]
    pub category: ScanCategory,

    #[serde(default)]
    pub action: ScanAction,

    /// Threats found in the prompt
    #[serde(
        rename = "prompt_detected",
        default,
        deserialize_with = "lenient_findings"
    )]
    pub prompt_findings: Findings,

    /// Threats found in the response; absent unless a response was scanned
    #[serde(
        rename = "response_detected",
        default,
        deserialize_with = "lenient_optional_findings",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_findings: Option<Findings>,

    /// Failure description for synthesized verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanVerdict {
    /// Verdict used when the scanner is unavailable: let the request through
    pub fn fail_open(error: impl Into<String>) -> Self {
        Self {
            category: ScanCategory::Error,
            action: ScanAction::Allow,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether this verdict was synthesized after a scanner failure
    pub fn is_fail_open(&self) -> bool {
        self.category == ScanCategory::Error
    }

    /// Names of the prompt threats flagged as detected
    pub fn prompt_threats(&self) -> Vec<&str> {
        detected(&self.prompt_findings)
    }

    /// Names of the response threats flagged as detected
    pub fn response_threats(&self) -> Vec<&str> {
        self.response_findings.as_ref().map(detected).unwrap_or_default()
    }
}

/// Read a findings map whose values may not all be booleans. Each value is
/// reduced to its truthiness; a missing or null map is empty.
fn lenient_findings<'de, D>(deserializer: D) -> Result<Findings, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_findings(deserializer)?.unwrap_or_default())
}

fn lenient_optional_findings<'de, D>(deserializer: D) -> Result<Option<Findings>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw.map(|map| {
        map.into_iter()
            .map(|(name, value)| (name, truthy(&value)))
            .collect()
    }))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn detected(findings: &Findings) -> Vec<&str> {
    findings
        .iter()
        .filter(|(_, hit)| **hit)
        .map(|(name, _)| name.as_str())
        .collect()
}
