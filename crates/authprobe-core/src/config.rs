//! Application configuration management.
//!
//! Settings come from an optional JSON file at
//! `~/.config/authprobe/config.json`, the `AUTHPROBE_URL` environment
//! variable, and command-line overrides, in increasing precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "authprobe";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured base URL
pub const BASE_URL_ENV: &str = "AUTHPROBE_URL";

/// Where the development server listens by default
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load the user config file, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Fold in the environment and command-line overrides
    pub fn with_overrides(
        mut self,
        env_url: Option<String>,
        cli_url: Option<String>,
        cli_timeout: Option<u64>,
    ) -> Self {
        let nonblank = |u: &String| !u.trim().is_empty();
        if let Some(url) = cli_url.filter(nonblank).or(env_url.filter(nonblank)) {
            self.base_url = Some(url);
        }
        if cli_timeout.is_some() {
            self.timeout_secs = cli_timeout;
        }
        self
    }

    /// Read the base URL override from the process environment
    pub fn env_base_url() -> Option<String> {
        std::env::var(BASE_URL_ENV).ok()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
