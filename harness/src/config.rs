//! Configuration loading

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::mcp::{Endpoint, Timeouts};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = ".harness.toml";

/// Environment variable holding the model API token
pub const DEFAULT_TOKEN_ENV: &str = "HF_TOKEN";

/// Tool server launched when no endpoint is given
pub const DEFAULT_SERVER_BINARY: &str = "probe-mcp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} not found. Please set it in the environment or a .env file")]
    MissingCredential { var: String },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/harness/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("harness").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// Harness Configuration (.harness.toml)
// ============================================================================

/// Top-level harness configuration (from .harness.toml)
#[derive(Debug, Default, Deserialize)]
pub struct HarnessFileConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub experiment: ExperimentSection,
    #[serde(default)]
    pub timeouts: TimeoutSection,
}

/// Model API section
#[derive(Debug, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable the bearer token is read from
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Experiment section
#[derive(Debug, Default, Deserialize)]
pub struct ExperimentSection {
    pub system_prompt: Option<String>,
    /// Launch strings; empty means the bundled probe server
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// Timeouts section, in seconds
#[derive(Debug, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_startup_secs")]
    pub startup_secs: u64,
    #[serde(default = "default_tool_secs")]
    pub tool_secs: u64,
    #[serde(default = "default_teardown_secs")]
    pub teardown_secs: u64,
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_startup_secs() -> u64 {
    Timeouts::default().startup.as_secs()
}

fn default_tool_secs() -> u64 {
    Timeouts::default().tool.as_secs()
}

fn default_teardown_secs() -> u64 {
    Timeouts::default().teardown.as_secs()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            token_env: default_token_env(),
        }
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            startup_secs: default_startup_secs(),
            tool_secs: default_tool_secs(),
            teardown_secs: default_teardown_secs(),
        }
    }
}

impl HarnessFileConfig {
    /// Load config from .harness.toml, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(config_path) = find_config_file(CONFIG_FILE) {
            tracing::debug!("Loading harness config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the model API token from the configured environment variable
    pub fn resolve_token(&self) -> Result<String, ConfigError> {
        resolve_token(&self.llm.token_env)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            startup: Duration::from_secs(self.timeouts.startup_secs),
            tool: Duration::from_secs(self.timeouts.tool_secs),
            teardown: Duration::from_secs(self.timeouts.teardown_secs),
        }
    }

    /// Configured endpoints, or the bundled probe server when none are set
    pub fn endpoints(&self) -> Vec<Endpoint> {
        if self.experiment.endpoints.is_empty() {
            return default_endpoints();
        }
        self.experiment
            .endpoints
            .iter()
            .map(|launch| Endpoint::new(launch.as_str()))
            .collect()
    }
}

/// Read a non-empty credential from the environment
pub fn resolve_token(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ConfigError::MissingCredential {
            var: var.to_string(),
        }),
    }
}

pub fn default_endpoints() -> Vec<Endpoint> {
    vec![Endpoint::sibling_binary(DEFAULT_SERVER_BINARY)]
}
