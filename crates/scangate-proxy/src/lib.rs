//! ScanGate Proxy
//!
//! Inline chat-completions gateway. Every prompt is checked by an external
//! runtime security scanner before generation, and every generated response
//! is checked again before it is returned, either as a single JSON completion
//! or as one of several paced streaming formats.

pub mod cli;
pub mod config;
pub mod generator;
pub mod proxy;
pub mod response;
pub mod routes;
pub mod scanner;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, GatewayConfig};
pub use generator::{GenerationMode, Generator, MockGenerator, OpenAiGenerator};
pub use proxy::{execute_turn, AppState, Disposition, TurnOutcome};
pub use routes::create_router;
pub use scanner::{RuntimeScanClient, ScanError, Scanner};
