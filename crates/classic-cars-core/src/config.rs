//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, an optional API key fallback, the
//! default list ordering and the storage directory override.
//!
//! Configuration is stored at `~/.config/classic-cars/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_API_BASE_URL;
use crate::query::SortOrder;

/// Application name used for config/data directory paths
const APP_NAME: &str = "classic-cars";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `api_base_url` when set
pub const API_URL_ENV: &str = "CLASSIC_CARS_API_URL";

/// Checked before the keychain and the config file
pub const API_KEY_ENV: &str = "CLASSIC_CARS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,
    /// Plain-text fallback; prefer the keychain
    pub api_key: Option<String>,
    /// e.g. `"year-desc"`
    pub default_sort: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the cache and demo-mode data files.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// API base URL after applying the environment override.
    pub fn effective_api_url(&self) -> String {
        self.api_url_with_override(std::env::var(API_URL_ENV).ok())
    }

    fn api_url_with_override(&self, env_url: Option<String>) -> String {
        env_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Parsed `default_sort`. An invalid value is logged and ignored.
    pub fn default_sort_order(&self) -> Option<SortOrder> {
        let raw = self.default_sort.as_deref()?;
        match raw.parse() {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(value = raw, error = %e, "Ignoring invalid default_sort in config");
                None
            }
        }
    }
}
