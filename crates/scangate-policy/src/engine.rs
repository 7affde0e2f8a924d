//! Verdict policy

use tracing::debug;

use crate::{Decision, ScanAction, ScanCategory, ScanVerdict};

/// Map a scanner verdict to a decision.
///
/// Blocks when the scanner classified the content as malicious or asked for
/// a block. Both conditions are checked independently, so an error verdict
/// that carries `action: block` still blocks. Everything else, including
/// fail-open error verdicts and unknown values, is allowed.
pub fn decide(verdict: &ScanVerdict) -> Decision {
    let decision = if verdict.category == ScanCategory::Malicious
        || verdict.action == ScanAction::Block
    {
        Decision::Block
    } else {
        Decision::Allow
    };

    debug!(
        category = ?verdict.category,
        action = ?verdict.action,
        %decision,
        "verdict evaluated"
    );
    decision
}
