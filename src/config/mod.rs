//! Application configuration: `config.toml` under the platform config
//! directory, with environment variable overrides.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub autosave: AutosaveSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Where session snapshots live; defaults to the user cache directory.
    pub dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            autosave: AutosaveSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { dir: None }
    }
}

impl AppConfig {
    /// Load config.toml if present, then apply environment overrides
    /// (`INTAKE_API_URL`, `INTAKE_AUTOSAVE_INTERVAL`, `INTAKE_SESSION_DIR`).
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", config_path.display(), e))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("INTAKE_API_URL") {
            config.api.base_url = url;
        }
        if let Ok(interval) = std::env::var("INTAKE_AUTOSAVE_INTERVAL") {
            config.autosave.interval_secs = interval
                .parse()
                .map_err(|_| anyhow!("INTAKE_AUTOSAVE_INTERVAL must be a number of seconds"))?;
        }
        if let Ok(dir) = std::env::var("INTAKE_SESSION_DIR") {
            config.session.dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("intake-cli").join("config.toml"))
    }

    /// Directory for session snapshots.
    pub fn session_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.session.dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
        Ok(cache_dir.join("intake-cli").join("sessions"))
    }
}
