//! Collector configuration, loaded from `~/.config/gleaner/config.toml`.
//! A missing file means defaults; unset keys fall back per field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::error::{GleanerError, Result};
use crate::limiter::DEFAULT_MAX_PER_HOST;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Database file path (default: the platform data directory).
    pub db_path: Option<PathBuf>,

    /// Base URL of the headless crawl worker.
    pub crawler_url: String,

    /// Minimum normalized content length for a rendered page to be kept.
    pub min_content_length: usize,

    /// Maximum concurrent fetches against a single host.
    pub max_concurrent_per_domain: usize,

    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            crawler_url: "http://localhost:8001".to_string(),
            min_content_length: 100,
            max_concurrent_per_domain: DEFAULT_MAX_PER_HOST,
            http_timeout_secs: 10,
            user_agent: concat!("gleaner/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CollectorConfig {
    /// Load from the default config path, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GleanerError::Config(e.to_string()))
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gleaner").join("config.toml"))
    }
}
