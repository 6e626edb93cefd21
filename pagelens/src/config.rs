//! Persisted coordinator configuration.
//!
//! Holds per-worker endpoint overrides and the search API key. The file
//! lives at `~/.pagelens/config.json` and is consulted when building the
//! worker client; compiled-in endpoint defaults apply for anything not
//! overridden here.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default per-call timeout for remote workers, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint overrides keyed by worker wire name (e.g. `"analyzer"`).
    #[serde(default)]
    pub workers: HashMap<String, String>,

    /// API key injected into search requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,

    /// Upper bound on each remote call, in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: HashMap::new(),
            search_api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Validate the configuration, returning human-readable issues.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, endpoint) in &self.workers {
            if url::Url::parse(endpoint).is_err() {
                issues.push(format!("worker '{name}' has an invalid endpoint URL"));
            }
        }
        if self.request_timeout_secs == 0 {
            issues.push("request_timeout_secs must be greater than zero".to_string());
        }

        issues
    }
}

/// Directory holding coordinator state (`~/.pagelens`).
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pagelens")
}

/// Path to the configuration file.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default path.
///
/// A missing file yields the defaults.
pub async fn load_config() -> ConfigResult<Config> {
    let path = config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = tokio::fs::read_to_string(&path).await?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default path.
pub async fn save_config(config: &Config) -> ConfigResult<()> {
    tokio::fs::create_dir_all(config_dir()).await?;
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(config_path(), content).await?;
    Ok(())
}

/// Write a default configuration file.
pub async fn init_config() -> ConfigResult<()> {
    save_config(&Config::default()).await
}
