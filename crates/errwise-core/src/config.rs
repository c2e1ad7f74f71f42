//! Configuration management for the ErrWise client.
//!
//! Loads configuration from ${ERRWISE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::idle::IdleConfig;

/// Default backend base URL (local development API).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

/// Backend transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL. `ERRWISE_BASE_URL` overrides this.
    pub base_url: String,
    /// Timeout for business requests in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for the token refresh exchange in seconds.
    ///
    /// Kept shorter than the request timeout so queued callers are never
    /// left waiting on a wedged refresh.
    pub refresh_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            refresh_timeout_secs: 10,
        }
    }
}

/// Idle-session policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicyConfig {
    /// Minutes of inactivity before forced logout.
    pub idle_timeout_mins: u64,
    /// Minutes before expiry at which the inactivity warning fires.
    pub idle_warning_mins: u64,
    /// Seconds between idle checks.
    pub idle_check_secs: u64,
}

impl Default for SessionPolicyConfig {
    fn default() -> Self {
        Self {
            idle_timeout_mins: 30,
            idle_warning_mins: 5,
            idle_check_secs: 60,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend transport settings.
    pub api: ApiConfig,
    /// Idle-session policy.
    pub session: SessionPolicyConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the effective base URL with precedence: env > config > default.
    /// Validates that the URL is well-formed.
    pub fn resolve_base_url(&self) -> Result<String> {
        // Try env var first
        if let Ok(env_url) = std::env::var("ERRWISE_BASE_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.to_string());
            }
        }

        let trimmed = self.api.base_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }

        Ok(DEFAULT_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.api.refresh_timeout_secs)
    }

    /// Builds the idle policy, rejecting windows that cannot fit.
    pub fn idle_config(&self) -> Result<IdleConfig> {
        let config = IdleConfig {
            timeout: Duration::from_secs(self.session.idle_timeout_mins * 60),
            warning_window: Duration::from_secs(self.session.idle_warning_mins * 60),
            check_interval: Duration::from_secs(self.session.idle_check_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for ErrWise configuration and data directories.
    //!
    //! ERRWISE_HOME resolution order:
    //! 1. ERRWISE_HOME environment variable (if set)
    //! 2. ~/.config/errwise (default)

    use std::path::PathBuf;

    /// Returns the ErrWise home directory.
    ///
    /// Checks ERRWISE_HOME env var first, falls back to ~/.config/errwise
    pub fn errwise_home() -> PathBuf {
        if let Ok(home) = std::env::var("ERRWISE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("errwise"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        errwise_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        errwise_home().join("session.json")
    }

    /// Returns the directory for CLI log files.
    pub fn logs_dir() -> PathBuf {
        errwise_home().join("logs")
    }
}
