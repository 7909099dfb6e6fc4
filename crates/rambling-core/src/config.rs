//! Application configuration management.
//!
//! This module handles loading and saving the router configuration: the
//! origin being served, the running version, the cache prefix, and the
//! manifest of URLs to pre-cache.
//!
//! Configuration is stored at `~/.config/rambling-sw/config.json`;
//! `RAMBLING_ORIGIN` and `RAMBLING_VERSION` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::net::client::DEFAULT_TIMEOUT_SECS;
use crate::router::manifest::LOGGED_OUT_URLS;
use crate::router::{Manifest, RouterOptions};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "rambling-sw";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_ORIGIN: &str = "http://localhost:8049";
pub const DEFAULT_VERSION: u32 = 4;
pub const DEFAULT_CACHE_PREFIX: &str = "rambling";

pub const ORIGIN_ENV: &str = "RAMBLING_ORIGIN";
pub const VERSION_ENV: &str = "RAMBLING_VERSION";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    pub version: u32,
    pub cache_prefix: String,
    pub manifest: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            version: DEFAULT_VERSION,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            manifest: LOGGED_OUT_URLS.iter().map(|u| u.to_string()).collect(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
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
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `RAMBLING_ORIGIN` / `RAMBLING_VERSION` if set.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ORIGIN_ENV).ok(),
            std::env::var(VERSION_ENV).ok(),
        )
    }

    fn apply_overrides(&mut self, origin: Option<String>, version: Option<String>) -> Result<()> {
        if let Some(origin) = origin {
            self.origin = origin;
        }
        if let Some(version) = version {
            self.version = version
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got {:?}", VERSION_ENV, version))?;
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn router_options(&self) -> Result<RouterOptions> {
        let origin = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin: {}", self.origin))?;
        if self.version == 0 {
            bail!("version must be positive");
        }
        if self.cache_prefix.is_empty() {
            bail!("cache_prefix must not be empty");
        }
        Ok(RouterOptions::new(origin, self.version)
            .with_prefix(self.cache_prefix.clone())
            .with_manifest(Manifest::new(self.manifest.clone())))
    }
}
