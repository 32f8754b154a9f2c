use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Everything a provider call can fail with.
///
/// Nothing here is retried: the caller reports the error and gives up on the
/// request.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(
        "API key for provider '{provider}' not found in environment or config file.\n\
         Hint: set OPENWEATHER_API_KEY or run `weather configure {provider}` \
         (key file: {key_file})"
    )]
    MissingApiKey { provider: String, key_file: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("error making request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid date/time in response: {0}")]
    InvalidTimestamp(String),

    #[error("no weather data available")]
    NoWeatherData,

    #[error("no forecast data available")]
    NoForecastData,

    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("insufficient forecast data available")]
    InsufficientForecastData,
}

impl WeatherError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
