//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use timing_engine::EngineConfig;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Line-delimited JSON update streams; `-` is stdin
    #[serde(default)]
    pub streams: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Reopen a stream after a read failure instead of giving up
    #[serde(default)]
    pub retry: bool,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Give up after this many consecutive failures (unlimited if absent)
    #[serde(default)]
    pub max_retries: Option<u32>,
}

fn default_retry_delay() -> u64 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retry: false,
            retry_delay_secs: default_retry_delay(),
            max_retries: None,
        }
    }
}

impl FeedConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Event output file (default: stdout)
    pub path: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
