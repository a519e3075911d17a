use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "action-prioritizer",
    version,
    about = "Ranks the next actions an app explorer should take on a screen"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: action-prioritizer.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Popup handler agent URL
    #[arg(long, global = true)]
    pub popup_url: Option<String>,

    /// Test data generator agent URL
    #[arg(long, global = true)]
    pub data_generator_url: Option<String>,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Append pipeline trace events (JSON lines) to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank the next actions for one screen and print the response JSON
    Prioritize(PrioritizeArgs),

    /// Print the parsed, enriched UI tree as JSON
    Tree {
        /// Path or URL of the UI hierarchy document
        #[arg(long)]
        xml: String,

        /// Only print the elements eligible for ranking
        #[arg(long, default_value_t = false)]
        candidates: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PrioritizeArgs {
    /// Path or URL of the UI hierarchy document
    #[arg(long)]
    pub xml: Option<String>,

    /// Path or URL of the screenshot
    #[arg(long)]
    pub image: Option<String>,

    /// Screenshot as inline base64 (takes precedence over --image)
    #[arg(long)]
    pub image_base64: Option<String>,

    /// What the user is trying to do on this app
    #[arg(long, default_value = "")]
    pub user_prompt: String,

    /// JSON file holding the list of previous actions
    #[arg(long)]
    pub history: Option<String>,

    /// JSON file holding the test data generator config
    #[arg(long)]
    pub config_data: Option<String>,

    /// Request id (default: random)
    #[arg(long)]
    pub request_id: Option<String>,

    /// Ranking oracle: ollama or none
    #[arg(long)]
    pub oracle: Option<String>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `action-prioritizer.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    pub popup_url: Option<String>,

    pub data_generator_url: Option<String>,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            popup_url: None,
            data_generator_url: None,
            timeout_secs: default_collaborator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    pub endpoint: Option<String>,

    pub model: Option<String>,

    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            model: None,
            timeout_secs: default_oracle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceConfig {
    pub path: Option<String>,
}

// Serde default helpers
fn default_collaborator_timeout() -> u64 { 30 }
fn default_oracle_timeout() -> u64 { 60 }
fn default_backend() -> String { "ollama".to_string() }

pub const DEFAULT_CONFIG_PATH: &str = "action-prioritizer.yaml";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:1.5b";

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config file; using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Settings resolution: CLI > config file > environment > defaults
// ============================================================================

/// Values given on the command line, each overriding the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub popup_url: Option<&'a str>,
    pub data_generator_url: Option<&'a str>,
    pub ollama_endpoint: Option<&'a str>,
    pub ollama_model: Option<&'a str>,
    pub oracle: Option<&'a str>,
    pub trace: Option<&'a str>,
}

impl<'a> Overrides<'a> {
    pub fn from_cli(cli: &'a Cli) -> Self {
        let oracle = match &cli.command {
            Commands::Prioritize(args) => args.oracle.as_deref(),
            Commands::Tree { .. } => None,
        };

        Self {
            popup_url: cli.popup_url.as_deref(),
            data_generator_url: cli.data_generator_url.as_deref(),
            ollama_endpoint: cli.ollama_endpoint.as_deref(),
            ollama_model: cli.ollama_model.as_deref(),
            oracle,
            trace: cli.trace.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub popup_url: Option<String>,
    pub data_generator_url: Option<String>,
    pub collaborator_timeout: Duration,
    pub oracle_backend: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    pub oracle_timeout: Duration,
    pub trace_path: Option<String>,
}

/// Merge CLI overrides, the config file and environment variables
/// (`POPUP_HANDLER_URL`, `TEST_DATA_GENERATOR_URL`, `OLLAMA_ENDPOINT`,
/// `OLLAMA_MODEL`).
pub fn resolve_settings<F>(overrides: &Overrides<'_>, config: &AppConfig, env: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let pick = |cli: Option<&str>, file: &Option<String>, var: &str| {
        cli.map(str::to_string)
            .or_else(|| file.clone())
            .or_else(|| env(var))
            .filter(|v| !v.trim().is_empty())
    };

    Settings {
        popup_url: pick(
            overrides.popup_url,
            &config.collaborators.popup_url,
            "POPUP_HANDLER_URL",
        ),
        data_generator_url: pick(
            overrides.data_generator_url,
            &config.collaborators.data_generator_url,
            "TEST_DATA_GENERATOR_URL",
        ),
        collaborator_timeout: Duration::from_secs(config.collaborators.timeout_secs),
        oracle_backend: overrides
            .oracle
            .map(str::to_string)
            .unwrap_or_else(|| config.oracle.backend.clone()),
        ollama_endpoint: pick(
            overrides.ollama_endpoint,
            &config.oracle.endpoint,
            "OLLAMA_ENDPOINT",
        )
        .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
        ollama_model: pick(overrides.ollama_model, &config.oracle.model, "OLLAMA_MODEL")
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        oracle_timeout: Duration::from_secs(config.oracle.timeout_secs),
        trace_path: overrides
            .trace
            .map(str::to_string)
            .or_else(|| config.trace.path.clone()),
    }
}
