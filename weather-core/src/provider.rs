use crate::{
    Config, CurrentWeather, Forecast, WeatherError,
    config::resolve_api_key,
    provider::{openmeteo::OpenMeteoProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{fmt::Debug, path::PathBuf};
use tracing::debug;

pub mod openmeteo;
pub mod openweather;
mod tables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::OpenMeteo => "openmeteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::OpenMeteo]
    }

    /// Whether the provider needs an API key to make requests.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OpenWeather)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "openmeteo" => Ok(ProviderId::OpenMeteo),
            _ => Err(WeatherError::Config(format!(
                "Unknown provider '{value}'. Supported providers: openweather, openmeteo."
            ))),
        }
    }
}

/// A weather data source.
///
/// `location` is a 5-digit US zip code or "City,ST". Each call is independent
/// and performs its outbound requests one after another.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current_weather(&self, location: &str) -> Result<CurrentWeather, WeatherError>;

    async fn forecast(&self, location: &str) -> Result<Forecast, WeatherError>;
}

/// Construct a provider from config and explicit ProviderId.
///
/// With `use_test_data` the key-based provider reads canned responses from
/// the configured test-data directory and needs no API key.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    use_test_data: bool,
) -> Result<Box<dyn WeatherProvider>, WeatherError> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather if use_test_data => {
            let dir = config.test_data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            Box::new(OpenWeatherProvider::from_test_data(dir))
        }
        ProviderId::OpenWeather => Box::new(OpenWeatherProvider::new(resolve_api_key(id)?)),
        ProviderId::OpenMeteo => {
            if use_test_data {
                debug!("test-data mode only applies to openweather; using the live API");
            }
            Box::new(OpenMeteoProvider::new())
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(
    config: &Config,
    use_test_data: bool,
) -> Result<Box<dyn WeatherProvider>, WeatherError> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config, use_test_data)
}

/// True for exactly five ASCII digits, i.e. a US zip code.
pub(crate) fn is_us_zip(location: &str) -> bool {
    location.len() == 5 && location.bytes().all(|b| b.is_ascii_digit())
}

/// GET `url` with `query` and decode the body as JSON.
///
/// Non-2xx responses keep the raw body so the caller can see what the API said.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, WeatherError> {
    let res = http.get(url).query(query).send().await?;

    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        debug!(%status, url, "request failed");
        return Err(WeatherError::Status { status, body });
    }

    Ok(serde_json::from_str(&body)?)
}
