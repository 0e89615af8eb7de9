//! Configuration loading and persistence.
//!
//! Handles reading and writing the berean configuration file. The session
//! bearer token is never serialized here; it lives in the OS keyring via
//! the credentials module.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::credentials::CredentialStore;

/// Configuration for the berean client core.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Base URL of the backend (account, notification and subscription
    /// services share one host; routes live under `/api`).
    pub server_url: String,
    /// Session bearer token - NOT serialized to disk (stored in keyring).
    #[serde(skip)]
    pub token: String,
    /// Seconds between checkout status polls.
    pub checkout_poll_interval: u64,
    /// Maximum checkout status poll attempts before reporting a timeout.
    pub checkout_poll_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "https://berean.app".to_string(),
            token: String::new(),
            checkout_poll_interval: 2,
            checkout_poll_attempts: 10,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `#[cfg(test)]` (unit tests): `tmp/berean-test` in the repo
    /// 2. `BEREAN_CONFIG_DIR` env var: explicit override
    /// 3. `BEREAN_ENV=test`: `tmp/berean-test` (integration tests)
    /// 4. Default: platform config dir (macOS: ~/Library/Application Support/berean)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                // Unit tests: use the repo's tmp/ directory (gitignored)
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/berean-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(test_dir) = std::env::var("BEREAN_CONFIG_DIR") {
                    PathBuf::from(test_dir)
                } else if crate::env::should_skip_keyring() {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/berean-test")
                } else {
                    dirs::config_dir()
                        .context("Could not determine config directory")?
                        .join("berean")
                }
            }
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    /// The token is loaded from the credential store (or env var).
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_else(|_| Self::default());
        config.apply_env_overrides();

        // Load token from the credential store if not set via env var
        if config.token.is_empty() {
            if let Ok(store) = CredentialStore::open() {
                if let Some(token) = store.load_token() {
                    config.token = token;
                }
            }
        }

        Ok(config)
    }

    /// Loads configuration from the config file only.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content).context("Invalid config file")?;
        Ok(config)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Applies `BEREAN_SERVER_URL` and `BEREAN_TOKEN` overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BEREAN_SERVER_URL") {
            if !url.is_empty() {
                self.server_url = url;
            }
        }
        if let Ok(token) = std::env::var("BEREAN_TOKEN") {
            if !token.is_empty() {
                self.token = token;
            }
        }
    }

    /// Saves the configuration file (token excluded).
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Whether a token is available (from keyring, file or env).
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Base URL for API routes.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.server_url.trim_end_matches('/'))
    }
}
