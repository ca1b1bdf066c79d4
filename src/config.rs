use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";

/// Default configuration written by `init`.
pub const DEFAULT_CONFIG_JSON: &str = include_str!("../resources/config.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How often `watch` checks the store for changes.
    pub poll_interval_ms: u64,
    /// Currency recorded on expenses when none is given.
    pub default_currency: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_interval_ms: 2000,
            default_currency: "USD".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load `config.json` from the workspace directory. A missing file means
    /// defaults; missing keys take their default values.
    pub fn load(workspace_dir: &Path) -> Result<Self> {
        let path = workspace_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }
}
