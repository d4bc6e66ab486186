use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::provider::ServiceId;

const ENV_PREFIX: &str = "CITY_INSIGHTS";

/// Credentials and optional endpoint override for one upstream service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Replaces the public endpoint, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Where lookups are persisted and statistics come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [services.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,

    /// Example TOML:
    /// [backend]
    /// url = "http://localhost:5000/api"
    /// api_key = "..."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
}

impl Config {
    pub fn service_config(&self, id: ServiceId) -> Option<&ServiceConfig> {
        self.services.get(id.as_str())
    }

    /// Returns API key for a service, if present.
    pub fn service_api_key(&self, id: ServiceId) -> Option<&str> {
        self.service_config(id).and_then(|cfg| cfg.api_key.as_deref())
    }

    pub fn service_base_url(&self, id: ServiceId) -> Option<&str> {
        self.service_config(id).and_then(|cfg| cfg.base_url.as_deref())
    }

    pub fn is_service_configured(&self, id: ServiceId) -> bool {
        !id.requires_api_key() || self.service_api_key(id).is_some()
    }

    /// Set or replace a service API key, keeping any base URL override.
    pub fn upsert_service_api_key(&mut self, id: ServiceId, api_key: String) {
        self.services.entry(id.as_str().to_string()).or_default().api_key = Some(api_key);
    }

    pub fn set_service_base_url(&mut self, id: ServiceId, base_url: String) {
        self.services.entry(id.as_str().to_string()).or_default().base_url = Some(base_url);
    }

    pub fn set_backend(&mut self, url: String, api_key: String) {
        self.backend = Some(BackendConfig { url, api_key });
    }

    /// Backend settings, or an error telling the user how to add them.
    pub fn backend(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().ok_or_else(|| {
            anyhow!(
                "No backend configured.\n\
                 Hint: run `city-insights configure backend` first."
            )
        })
    }

    /// Overlay `CITY_INSIGHTS_*` environment variables on top of the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for id in ServiceId::all() {
            let upper = id.as_str().to_uppercase();

            if let Some(key) = lookup(&format!("{ENV_PREFIX}_{upper}_KEY")) {
                self.upsert_service_api_key(*id, key);
            }
            if let Some(url) = lookup(&format!("{ENV_PREFIX}_{upper}_URL")) {
                self.set_service_base_url(*id, url);
            }
        }

        let url = lookup(&format!("{ENV_PREFIX}_BACKEND_URL"));
        let key = lookup(&format!("{ENV_PREFIX}_BACKEND_KEY"));

        match (url, key) {
            (Some(url), Some(key)) => self.set_backend(url, key),
            (url, key) => {
                // A lone URL or key only patches a backend that already exists.
                if let Some(backend) = self.backend.as_mut() {
                    if let Some(url) = url {
                        backend.url = url;
                    }
                    if let Some(key) = key {
                        backend.api_key = key;
                    }
                }
            }
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "city-insights", "city-insights")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the session token is kept between runs.
    pub fn token_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("token"))
    }

    pub fn favorites_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("favorites.toml"))
    }
}
