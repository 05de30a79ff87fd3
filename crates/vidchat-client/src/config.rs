use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "vidchat";
const CONFIG_FILE: &str = "config.json";

/// Overrides `api_base_url`
pub const API_URL_ENV: &str = "VIDCHAT_API_URL";
/// Overrides `app_base_url`
pub const APP_URL_ENV: &str = "VIDCHAT_APP_URL";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL of the web front end, used for navigation
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    /// Front-end route the user is sent to when the session cannot be renewed
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Where exports are saved; the user's download directory when unset
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Per-request timeout in seconds; requests never time out when unset
    #[serde(default)]
    pub request_timeout_sec: Option<u64>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            app_base_url: default_app_base_url(),
            login_route: default_login_route(),
            download_dir: None,
            request_timeout_sec: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_sec.map(Duration::from_secs)
    }

    /// Applies environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(APP_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.app_base_url = url;
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: ClientConfig,
    path: PathBuf,
}

impl ConfigManager {
    /// Loads configuration from the default location
    pub fn new() -> Result<Self> {
        Ok(Self::from_path(Self::config_dir()?.join(CONFIG_FILE)))
    }

    /// Loads configuration from an explicit file
    ///
    /// A missing or unreadable file yields the defaults; environment overrides
    /// are applied either way.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut config = load_file(&path);
        config.apply_overrides(|key| std::env::var(key).ok());

        Self { config, path }
    }

    /// Gets a copy of the current configuration
    pub fn get(&self) -> ClientConfig {
        self.config.clone()
    }

    /// Path the configuration was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_NAME))
    }
}

fn load_file(path: &Path) -> ClientConfig {
    if !path.exists() {
        return ClientConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
            ClientConfig::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
            ClientConfig::default()
        }
    }
}
