use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{error::WeatherError, provider::ProviderId};

/// Environment variable checked before the key file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_provider = "openmeteo"
/// test_data_dir = "/home/me/weather-fixtures"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Provider id, e.g. "openweather" or "openmeteo".
    pub default_provider: Option<String>,

    /// Where test-data mode looks for canned responses. Defaults to the
    /// working directory.
    pub test_data_dir: Option<PathBuf>,
}

impl Config {
    /// Default provider as a strongly-typed id. OpenWeather when unset.
    pub fn default_provider_id(&self) -> Result<ProviderId, WeatherError> {
        match self.default_provider.as_deref() {
            Some(name) => ProviderId::try_from(name),
            None => Ok(ProviderId::OpenWeather),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self, WeatherError> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, WeatherError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| WeatherError::io(path, e))?;

        toml::from_str(&contents).map_err(|e| {
            WeatherError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<(), WeatherError> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), WeatherError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WeatherError::io(parent, e))?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| WeatherError::Config(format!("failed to serialize config: {e}")))?;

        fs::write(path, toml).map_err(|e| WeatherError::io(path, e))
    }

    /// `$HOME/.config/weather`, on every platform.
    pub fn config_dir() -> Result<PathBuf, WeatherError> {
        let dirs = BaseDirs::new()
            .ok_or_else(|| WeatherError::Config("could not determine home directory".into()))?;

        Ok(dirs.home_dir().join(".config").join("weather"))
    }

    pub fn config_file_path() -> Result<PathBuf, WeatherError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Dotfile holding the API key for `id`, e.g. `~/.config/weather/openweather_api_key`.
    pub fn api_key_file_path(id: ProviderId) -> Result<PathBuf, WeatherError> {
        Ok(Self::config_dir()?.join(format!("{id}_api_key")))
    }
}

/// Resolve the API key for `id` from [`API_KEY_ENV`], then its key file.
pub fn resolve_api_key(id: ProviderId) -> Result<String, WeatherError> {
    let key_file = Config::api_key_file_path(id)?;
    resolve_api_key_from(std::env::var(API_KEY_ENV).ok(), &key_file, id)
}

/// Same as [`resolve_api_key`] with the environment value passed in.
pub fn resolve_api_key_from(
    env_value: Option<String>,
    key_file: &Path,
    id: ProviderId,
) -> Result<String, WeatherError> {
    if let Some(key) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        debug!(provider = %id, "using API key from environment");
        return Ok(key);
    }

    if key_file.exists() {
        let contents = fs::read_to_string(key_file).map_err(|e| WeatherError::io(key_file, e))?;
        let key = contents.trim();
        if !key.is_empty() {
            debug!(provider = %id, path = %key_file.display(), "using API key from key file");
            return Ok(key.to_string());
        }
    }

    Err(WeatherError::MissingApiKey {
        provider: id.to_string(),
        key_file: key_file.display().to_string(),
    })
}

/// Write `key` to `key_file`, creating parent directories as needed.
pub fn store_api_key(key_file: &Path, key: &str) -> Result<(), WeatherError> {
    if let Some(parent) = key_file.parent() {
        fs::create_dir_all(parent).map_err(|e| WeatherError::io(parent, e))?;
    }

    fs::write(key_file, format!("{}\n", key.trim())).map_err(|e| WeatherError::io(key_file, e))
}
