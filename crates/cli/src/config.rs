//! Configuration for the eden CLI
//!
//! Loads settings from environment variables (and a `.env` file when present)
//! with sensible defaults. Command-line flags are layered on top by the binary.

use crate::poller::PollSettings;
use anyhow::{Context, Result};
use eden_broker::DEFAULT_API_VERSION;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Open Service Broker base URL
    pub broker_url: String,

    /// Basic auth username or UAA client
    pub broker_client: String,

    /// Basic auth password or UAA client secret
    pub broker_client_secret: String,

    /// Value of the `X-Broker-API-Version` header
    pub api_version: String,

    /// Registry file holding provisioned instances and their credentials
    pub registry_path: PathBuf,

    /// Seconds between last-operation queries
    pub poll_interval_secs: u64,

    /// Give up after this many last-operation queries
    pub max_polls: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_path = match lookup("EDEN_CONFIG").filter(|p| !p.is_empty()) {
            Some(path) => expand_home(&path, lookup("HOME").as_deref()),
            None => default_registry_path(lookup("HOME").as_deref()),
        };

        let max_polls = match lookup("EDEN_MAX_POLLS").filter(|v| !v.is_empty()) {
            Some(value) => Some(value.parse().context("Invalid EDEN_MAX_POLLS")?),
            None => None,
        };

        let config = Config {
            broker_url: lookup("EDEN_BROKER_URL").unwrap_or_default(),
            broker_client: lookup("EDEN_BROKER_CLIENT").unwrap_or_default(),
            broker_client_secret: lookup("EDEN_BROKER_CLIENT_SECRET").unwrap_or_default(),

            api_version: lookup("EDEN_BROKER_API_VERSION")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),

            registry_path,

            poll_interval_secs: lookup("EDEN_POLL_INTERVAL_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("Invalid EDEN_POLL_INTERVAL_SECS")?,

            max_polls,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate settings every command depends on
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("EDEN_POLL_INTERVAL_SECS must be greater than 0");
        }

        if self.max_polls == Some(0) {
            anyhow::bail!("EDEN_MAX_POLLS must be greater than 0 when set");
        }

        Ok(())
    }

    /// Validate settings needed by commands that talk to the broker
    pub fn validate_broker(&self) -> Result<()> {
        if self.broker_url.trim().is_empty() {
            anyhow::bail!("Broker URL is required (--url or EDEN_BROKER_URL)");
        }

        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }
}

/// `~/.eden/config`, or `.eden/config` relative to the working directory when
/// no home directory is known
pub fn default_registry_path(home: Option<&str>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".eden").join("config"),
        None => PathBuf::from(".eden").join("config"),
    }
}

/// Expand a leading `~/` against `home`
pub fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~/"), home.filter(|h| !h.is_empty())) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
