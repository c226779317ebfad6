use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::{LocationFix, LocationPriority, Units};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/";
pub const DEFAULT_ENDPOINT: &str = "weather";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 10_000;

/// Where location fixes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum LocationSource {
    /// Coarse position derived from the public IP address.
    #[default]
    Ip,
    /// Pinned coordinates.
    Fixed { latitude: f64, longitude: f64 },
}

impl LocationSource {
    pub fn fixed(fix: LocationFix) -> Self {
        LocationSource::Fixed {
            latitude: fix.latitude,
            longitude: fix.longitude,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "imperial"
/// poll_interval_ms = 15000
///
/// [location]
/// source = "fixed"
/// latitude = 32.75
/// longitude = -97.33
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub endpoint: String,
    pub units: Units,
    pub poll_interval_ms: u64,
    pub location_timeout_ms: u64,
    pub priority: LocationPriority,
    pub location: LocationSource,

    /// Answer to the location prompt; `None` until the user has been asked.
    pub location_consent: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            units: Units::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            location_timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            priority: LocationPriority::default(),
            location: LocationSource::default(),
            location_consent: None,
        }
    }
}

impl Config {
    /// Returns the API key, or an error pointing at `weatherwatch configure`.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weatherwatch configure` and enter your OpenWeather API key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    /// Reject values that would make the poll loop spin or every cycle fail.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than zero"));
        }
        if self.location_timeout_ms == 0 {
            return Err(anyhow!("location_timeout_ms must be greater than zero"));
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("base_url must not be empty"));
        }
        if let LocationSource::Fixed { latitude, longitude } = self.location {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(anyhow!(
                    "Fixed location ({latitude}, {longitude}) is outside valid coordinates"
                ));
            }
        }
        Ok(())
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Like [`Config::load`], for an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
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

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherwatch", "weatherwatch")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
