//! ScanGate Policy
//!
//! Verdict model for the external content-safety scanner and the policy that
//! turns a verdict into an allow/block decision.
//!
//! The same policy gates two phases of a turn:
//! - Prompt: decides whether generation happens at all
//! - Response: decides whether the generated text is replaced by a notice

pub mod action;
pub mod engine;
pub mod verdict;

pub use action::{Decision, Phase};
pub use engine::decide;
pub use verdict::{Findings, ScanAction, ScanCategory, ScanVerdict};
