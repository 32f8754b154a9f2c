use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{CurrentWeather, DailyForecast, Forecast},
    provider::{fetch_json, is_us_zip},
};

use super::{ProviderId, WeatherProvider};

const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Samples before this hour are left out of the daily summary so overnight
/// lows don't drag the day down.
const FIRST_DAYTIME_HOUR: &str = "06";

/// Timestamp fragment of the sample that represents the whole day.
const NOON: &str = "12:00:00";

#[derive(Debug, Clone)]
enum Source {
    Live { api_key: String, base_url: String },
    TestData(PathBuf),
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }

    fn test_data_file(self) -> &'static str {
        match self {
            Endpoint::Current => "weather.weather.json",
            Endpoint::Forecast => "weather.forecast.json",
        }
    }
}

/// OpenWeather (api.openweathermap.org), keyed by `appid`.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    http: Client,
    source: Source,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            source: Source::Live { api_key, base_url: base_url.into() },
        }
    }

    /// Serve canned `weather.weather.json` / `weather.forecast.json` from `dir`
    /// instead of calling the API.
    pub fn from_test_data(dir: impl Into<PathBuf>) -> Self {
        Self { http: Client::new(), source: Source::TestData(dir.into()) }
    }

    async fn fetch_data<T: DeserializeOwned>(
        &self,
        location: &str,
        endpoint: Endpoint,
    ) -> Result<T, WeatherError> {
        match &self.source {
            Source::TestData(dir) => {
                let path = dir.join(endpoint.test_data_file());
                debug!(path = %path.display(), "reading test data");

                let body = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| WeatherError::io(&path, e))?;

                Ok(serde_json::from_str(&body)?)
            }
            Source::Live { api_key, base_url } => {
                let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint.path());
                let (key, value) = location_query(location);
                debug!(%url, key, %value, "requesting OpenWeather");

                fetch_json(
                    &self.http,
                    &url,
                    &[
                        (key, value),
                        ("units", "imperial".to_string()),
                        ("appid", api_key.clone()),
                    ],
                )
                .await
            }
        }
    }
}

/// `zip=<code>,us` for a zip code, `q=<location>,us` for anything else.
///
/// No further validation happens here: "Boston, ma" is sent as typed.
fn location_query(location: &str) -> (&'static str, String) {
    if is_us_zip(location) {
        ("zip", format!("{location},us"))
    } else {
        ("q", format!("{location},us"))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    /// "YYYY-MM-DD HH:MM:SS"
    dt_txt: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

fn current_from_parts(
    location: &str,
    main: &OwMain,
    weather: &OwWeather,
    wind: &OwWind,
) -> CurrentWeather {
    CurrentWeather {
        location: location.to_string(),
        conditions: weather.description.clone(),
        temperature: main.temp,
        feels_like: main.feels_like,
        temp_max: main.temp_max,
        temp_min: main.temp_min,
        humidity: main.humidity,
        wind_speed: wind.speed,
    }
}

struct DayAccumulator {
    high: f64,
    low: f64,
    wind_speed: f64,
    conditions: String,
    humidity: u8,
}

/// Collapse 3-hour samples into one record per calendar day.
///
/// Samples before 06:00 are skipped. High and low are the extremes of the
/// remaining samples, wind is the strongest reading, and conditions/humidity
/// come from the noon sample when there is one, else the first kept sample.
fn aggregate_daily(entries: &[OwForecastEntry]) -> Result<Vec<DailyForecast>, WeatherError> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for entry in entries {
        let (date, time) = entry
            .dt_txt
            .split_once(' ')
            .ok_or_else(|| WeatherError::InvalidTimestamp(entry.dt_txt.clone()))?;

        let hour = time.split(':').next().unwrap_or(time);
        if hour < FIRST_DAYTIME_HOUR {
            continue;
        }

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| WeatherError::InvalidTimestamp(entry.dt_txt.clone()))?;
        let description = entry.weather.first().map(|w| w.description.as_str());

        let day = days.entry(date).or_insert_with(|| DayAccumulator {
            high: entry.main.temp_max,
            low: entry.main.temp_min,
            wind_speed: 0.0,
            conditions: description.unwrap_or("unknown").to_string(),
            humidity: entry.main.humidity,
        });

        day.high = day.high.max(entry.main.temp_max);
        day.low = day.low.min(entry.main.temp_min);
        day.wind_speed = day.wind_speed.max(entry.wind.speed);

        if entry.dt_txt.contains(NOON) {
            if let Some(description) = description {
                day.conditions = description.to_string();
            }
            day.humidity = entry.main.humidity;
        }
    }

    Ok(days
        .into_iter()
        .map(|(date, day)| DailyForecast {
            date,
            conditions: day.conditions,
            high: day.high,
            low: day.low,
            wind_speed: day.wind_speed,
            humidity: day.humidity,
        })
        .collect())
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    #[instrument(skip(self))]
    async fn current_weather(&self, location: &str) -> Result<CurrentWeather, WeatherError> {
        let parsed: OwCurrentResponse = self.fetch_data(location, Endpoint::Current).await?;

        let weather = parsed.weather.first().ok_or(WeatherError::NoWeatherData)?;

        Ok(current_from_parts(&parsed.name, &parsed.main, weather, &parsed.wind))
    }

    #[instrument(skip(self))]
    async fn forecast(&self, location: &str) -> Result<Forecast, WeatherError> {
        let parsed: OwForecastResponse = self.fetch_data(location, Endpoint::Forecast).await?;

        let first = parsed.list.first().ok_or(WeatherError::NoForecastData)?;

        let current = first
            .weather
            .first()
            .map(|w| current_from_parts(&parsed.city.name, &first.main, w, &first.wind));

        let daily = aggregate_daily(&parsed.list)?;
        debug!(samples = parsed.list.len(), days = daily.len(), "aggregated forecast");

        Ok(Forecast { location: parsed.city.name, current, daily })
    }
}
