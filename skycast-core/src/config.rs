use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key. Absent means "not configured": the pipeline
    /// reports that state instead of issuing keyless requests.
    pub api_key: Option<String>,

    /// How long cached snapshots and search results stay fresh.
    pub cache_ttl_secs: u64,

    /// Sliding-window rate limit: at most this many requests...
    pub rate_limit_max_requests: usize,
    /// ...per this many seconds, per identifier.
    pub rate_limit_window_secs: u64,

    /// Upper bound on a device-location request.
    pub geolocation_timeout_secs: u64,

    /// Per-request HTTP timeout.
    pub http_timeout_secs: u64,

    /// Maximum geocoding matches returned per search.
    pub search_limit: usize,

    /// Fallback location used when device geolocation yields nothing.
    pub default_lat: Option<f64>,
    pub default_lon: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            cache_ttl_secs: 600,
            rate_limit_max_requests: 60,
            rate_limit_window_secs: 60,
            geolocation_timeout_secs: 10,
            http_timeout_secs: 10,
            search_limit: 5,
            default_lat: None,
            default_lon: None,
        }
    }
}

impl Config {
    /// Effective API key: the environment variable wins over the file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Load config from disk, or return defaults if no file exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the recent-searches data file.
    pub fn recent_searches_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("recent_searches.json"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}
