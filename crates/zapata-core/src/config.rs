//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, where the session token is kept, and the
//! last email used to log in.
//!
//! Configuration is stored at `~/.config/zapata/config.json`. Command-line
//! flags (and their environment variables) override the file through
//! [`Config::apply_overrides`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyValueStorage, KeyringStorage, MemoryStorage, TokenStore};
use crate::auth::DEFAULT_EXPIRY_CHECK_INTERVAL;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "zapata";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Hosted calculation backend
pub const DEFAULT_API_BASE_URL: &str = "https://backing-iwik.onrender.com/api";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Not persisted
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" | "keychain" => Ok(StorageKind::Keyring),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub storage: StorageKind,
    pub expiry_check_minutes: Option<u64>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Values given on the command line win over the file.
    pub fn apply_overrides(&mut self, api_base_url: Option<String>, storage: Option<StorageKind>) {
        if let Some(url) = api_base_url.filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(kind) = storage {
            self.storage = kind;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn expiry_check_interval(&self) -> Duration {
        match self.expiry_check_minutes {
            Some(minutes) if minutes > 0 => Duration::from_secs(minutes * 60),
            _ => DEFAULT_EXPIRY_CHECK_INTERVAL,
        }
    }

    /// Token store backed by the configured storage.
    pub fn token_store(&self) -> Result<TokenStore> {
        let storage: Arc<dyn KeyValueStorage> = match self.storage {
            StorageKind::File => Arc::new(FileStorage::new(self.cache_dir()?)),
            StorageKind::Keyring => Arc::new(KeyringStorage::new(APP_NAME)),
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Ok(TokenStore::new(storage))
    }
}
