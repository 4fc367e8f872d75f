use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

pub const ENV_API_URL: &str = "ADMIRROR_API_URL";
pub const ENV_API_KEY: &str = "ADMIRROR_API_KEY";
pub const ENV_RATE_LIMIT_MS: &str = "ADMIRROR_RATE_LIMIT_MS";

fn default_rate_limit_interval_ms() -> u64 {
    RateLimitConfig::default().interval_ms
}

fn default_page_size() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_state_file() -> PathBuf {
    PathBuf::from("admirror-state.json")
}

/// Sync configuration, loaded from YAML and overridable from the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub api_base_url: String,
    /// Bearer key for the upstream API
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_rate_limit_interval_ms")]
    pub rate_limit_interval_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: None,
            rate_limit_interval_ms: default_rate_limit_interval_ms(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            state_file: default_state_file(),
            log_file: None,
        }
    }
}

impl SyncConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config YAML {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Environment variables win over file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Ok(interval) = std::env::var(ENV_RATE_LIMIT_MS) {
            self.rate_limit_interval_ms = interval.trim().parse().with_context(|| {
                format!("{} must be a number, got '{}'", ENV_RATE_LIMIT_MS, interval)
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            anyhow::bail!("api_base_url is required");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        self.rate_limit()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid rate limit: {}", e))
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.rate_limit_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
