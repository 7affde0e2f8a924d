//! Command-line interface
//!
//! Every setting can also come from the environment, which is how the
//! gateway is normally configured in containers.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "scangate")]
#[command(
    author,
    version,
    about = "Chat-completions gateway with runtime security scanning",
    long_about = None
)]
pub struct Cli {
    /// Optional YAML configuration file; flags and env vars override it
    #[arg(short, long, env = "SCANGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scanner API key (required)
    #[arg(long, env = "PANW_AI_SEC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Security profile name
    #[arg(long, env = "PRISMA_AIRS_PROFILE")]
    pub profile: Option<String>,

    /// Scanner endpoint URL
    #[arg(long, env = "RUNTIME_API_URL")]
    pub scanner_url: Option<String>,

    /// Scanner call timeout in seconds
    #[arg(long, env = "SCAN_TIMEOUT_SECS")]
    pub scan_timeout: Option<u64>,

    /// Accept invalid TLS certificates from the scanner (testing only)
    #[arg(long, env = "SCANNER_INSECURE_TLS")]
    pub insecure_tls: bool,

    /// HTTP status used for prompt-blocked replies
    #[arg(long, env = "BLOCK_STATUS_CODE")]
    pub block_status_code: Option<u16>,

    /// Listen address
    #[arg(short = 'l', long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// API key for an OpenAI-compatible backend; mock generation when unset
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Model requested from the backend
    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
