use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{CurrentWeather, DailyForecast, Forecast},
    provider::{fetch_json, is_us_zip},
};

use super::{
    ProviderId, WeatherProvider,
    tables::{state_matches, weather_description},
};

const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1";

/// Future days returned by `forecast`. One extra day ("today") is requested
/// and dropped.
const FORECAST_DAYS: usize = 5;

const CURRENT_FIELDS: &str =
    "temperature_2m,relativehumidity_2m,apparent_temperature,weathercode,windspeed_10m";
const TODAY_DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min";
const FORECAST_DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min,\
                                     windspeed_10m_max,relative_humidity_2m_max";

/// Open-Meteo: free, no key, but needs a geocoding step before every lookup.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_GEOCODING_URL, DEFAULT_FORECAST_URL)
    }

    pub fn with_base_urls(
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            geocoding_url: geocoding_url.into(),
            forecast_url: forecast_url.into(),
        }
    }

    /// Step one: resolve location text to a single place with coordinates.
    async fn geocode(&self, location: &str) -> Result<GeoResult, WeatherError> {
        let query = LocationQuery::parse(location);
        let url = format!("{}/search", self.geocoding_url.trim_end_matches('/'));
        debug!(?query, "geocoding");

        let response: GeoResponse = fetch_json(
            &self.http,
            &url,
            &[
                ("name", query.name().to_string()),
                ("count", query.count().to_string()),
                ("language", "en".to_string()),
                ("format", "json".to_string()),
            ],
        )
        .await?;

        let place = select_candidate(response.results, &query)?;
        debug!(name = %place.name, lat = place.latitude, lon = place.longitude, "geocoded");

        Ok(place)
    }

    /// Step two: weather for the coordinates, `days` days of daily data
    /// starting with the local today.
    async fn fetch_by_coordinates(
        &self,
        place: &GeoResult,
        daily_fields: &str,
        days: usize,
    ) -> Result<OmResponse, WeatherError> {
        let url = format!("{}/forecast", self.forecast_url.trim_end_matches('/'));

        fetch_json(
            &self.http,
            &url,
            &[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", daily_fields.to_string()),
                ("temperature_unit", "fahrenheit".to_string()),
                ("windspeed_unit", "mph".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", days.to_string()),
            ],
        )
        .await
    }
}

/// How a location string is sent to the geocoder.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LocationQuery {
    Zip(String),
    /// "City, ST": the geocoder only takes the city, the state filters results.
    CityState { city: String, state: String },
    Name(String),
}

impl LocationQuery {
    fn parse(location: &str) -> Self {
        if is_us_zip(location) {
            return LocationQuery::Zip(location.to_string());
        }

        match split_city_state(location) {
            Some((city, state)) => {
                LocationQuery::CityState { city: city.to_string(), state: state.to_string() }
            }
            None => LocationQuery::Name(location.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            LocationQuery::Zip(name) | LocationQuery::Name(name) => name,
            LocationQuery::CityState { city, .. } => city,
        }
    }

    /// Same-named cities exist in many states, so ask for enough to filter.
    fn count(&self) -> u8 {
        match self {
            LocationQuery::CityState { .. } => 10,
            LocationQuery::Zip(_) | LocationQuery::Name(_) => 1,
        }
    }

    fn state(&self) -> Option<&str> {
        match self {
            LocationQuery::CityState { state, .. } => Some(state),
            LocationQuery::Zip(_) | LocationQuery::Name(_) => None,
        }
    }
}

/// Letters and spaces, a comma, an optional space, two capitals.
fn split_city_state(location: &str) -> Option<(&str, &str)> {
    let (city, rest) = location.split_once(',')?;
    let state = rest.strip_prefix(' ').unwrap_or(rest);

    let city_ok = !city.is_empty() && city.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
    let state_ok = state.len() == 2 && state.bytes().all(|b| b.is_ascii_uppercase());

    (city_ok && state_ok).then(|| (city.trim(), state))
}

fn select_candidate(
    results: Vec<GeoResult>,
    query: &LocationQuery,
) -> Result<GeoResult, WeatherError> {
    let not_found = || WeatherError::LocationNotFound(query.name().to_string());

    match query.state() {
        Some(state) => results
            .into_iter()
            .find(|r| r.admin1.as_deref().is_some_and(|region| state_matches(region, state)))
            .ok_or_else(not_found),
        None => results.into_iter().next().ok_or_else(not_found),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GeoResult {
    name: String,
    /// First-level region, the state for US results.
    #[serde(default)]
    admin1: Option<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    /// Omitted entirely when nothing matched.
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relativehumidity_2m: u8,
    #[serde(default)]
    apparent_temperature: Option<f64>,
    weathercode: i32,
    windspeed_10m: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OmDaily {
    time: Vec<String>,
    weathercode: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    windspeed_10m_max: Vec<f64>,
    relative_humidity_2m_max: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
    #[serde(default)]
    daily: OmDaily,
}

fn current_from_response(location: &str, data: &OmResponse) -> CurrentWeather {
    let current = &data.current;

    CurrentWeather {
        location: location.to_string(),
        conditions: weather_description(current.weathercode).to_string(),
        temperature: current.temperature_2m,
        feels_like: current.apparent_temperature.unwrap_or(current.temperature_2m),
        temp_max: data.daily.temperature_2m_max.first().copied().unwrap_or_default(),
        temp_min: data.daily.temperature_2m_min.first().copied().unwrap_or_default(),
        humidity: current.relativehumidity_2m,
        wind_speed: current.windspeed_10m,
    }
}

/// Offsets 1..=5 of the daily arrays. Offset 0 is today, already covered by
/// the current block.
fn future_days(daily: &OmDaily) -> Result<Vec<DailyForecast>, WeatherError> {
    let needed = FORECAST_DAYS + 1;
    let shortest = [
        daily.time.len(),
        daily.weathercode.len(),
        daily.temperature_2m_max.len(),
        daily.temperature_2m_min.len(),
        daily.windspeed_10m_max.len(),
        daily.relative_humidity_2m_max.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or_default();

    if shortest < needed {
        return Err(WeatherError::InsufficientForecastData);
    }

    (1..needed)
        .map(|i| -> Result<DailyForecast, WeatherError> {
            let date = NaiveDate::parse_from_str(&daily.time[i], "%Y-%m-%d")
                .map_err(|_| WeatherError::InvalidTimestamp(daily.time[i].clone()))?;

            Ok(DailyForecast {
                date,
                conditions: weather_description(daily.weathercode[i]).to_string(),
                high: daily.temperature_2m_max[i],
                low: daily.temperature_2m_min[i],
                wind_speed: daily.windspeed_10m_max[i],
                humidity: daily.relative_humidity_2m_max[i],
            })
        })
        .collect()
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    #[instrument(skip(self))]
    async fn current_weather(&self, location: &str) -> Result<CurrentWeather, WeatherError> {
        let place = self.geocode(location).await?;
        let data = self.fetch_by_coordinates(&place, TODAY_DAILY_FIELDS, 1).await?;

        Ok(current_from_response(&place.name, &data))
    }

    #[instrument(skip(self))]
    async fn forecast(&self, location: &str) -> Result<Forecast, WeatherError> {
        let place = self.geocode(location).await?;
        let data = self
            .fetch_by_coordinates(&place, FORECAST_DAILY_FIELDS, FORECAST_DAYS + 1)
            .await?;

        let daily = future_days(&data.daily)?;

        Ok(Forecast {
            current: Some(current_from_response(&place.name, &data)),
            location: place.name,
            daily,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(name: &str, admin1: &str, lat: f64) -> GeoResult {
        GeoResult {
            name: name.into(),
            admin1: Some(admin1.into()),
            latitude: lat,
            longitude: -70.0,
        }
    }

    fn daily_with(days: usize) -> OmDaily {
        let dates = [
            "2024-01-15", "2024-01-16", "2024-01-17", "2024-01-18", "2024-01-19", "2024-01-20",
            "2024-01-21",
        ];

        OmDaily {
            time: dates[..days].iter().map(|d| d.to_string()).collect(),
            weathercode: [0, 1, 42, 3, 61, 95, 2][..days].to_vec(),
            temperature_2m_max: [40.0, 41.0, 42.0, 43.0, 44.0, 45.0, 46.0][..days].to_vec(),
            temperature_2m_min: [30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0][..days].to_vec(),
            windspeed_10m_max: [5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0][..days].to_vec(),
            relative_humidity_2m_max: [50, 51, 52, 53, 54, 55, 56][..days].to_vec(),
        }
    }

    #[test]
    fn parse_zip() {
        let q = LocationQuery::parse("02108");
        assert_eq!(q, LocationQuery::Zip("02108".into()));
        assert_eq!(q.count(), 1);
        assert_eq!(q.state(), None);
    }

    #[test]
    fn parse_city_state_with_and_without_space() {
        for input in ["Boston,MA", "Boston, MA"] {
            let q = LocationQuery::parse(input);
            assert_eq!(q, LocationQuery::CityState { city: "Boston".into(), state: "MA".into() });
            assert_eq!(q.name(), "Boston");
            assert_eq!(q.count(), 10);
        }
    }

    #[test]
    fn parse_multi_word_city() {
        let q = LocationQuery::parse("Salt Lake City,UT");
        assert_eq!(q.name(), "Salt Lake City");
        assert_eq!(q.state(), Some("UT"));
    }

    #[test]
    fn lowercase_state_is_a_plain_name() {
        let q = LocationQuery::parse("Boston,ma");
        assert_eq!(q, LocationQuery::Name("Boston,ma".into()));
        assert_eq!(q.count(), 1);
    }

    #[test]
    fn freeform_text_is_a_plain_name() {
        assert_eq!(LocationQuery::parse("Paris"), LocationQuery::Name("Paris".into()));
        assert_eq!(
            LocationQuery::parse("St. Louis,MO"),
            LocationQuery::Name("St. Louis,MO".into())
        );
    }

    #[test]
    fn state_filter_picks_matching_region() {
        let results = vec![
            candidate("Springfield", "Illinois", 39.8),
            candidate("Springfield", "Massachusetts", 42.1),
            candidate("Springfield", "Missouri", 37.2),
        ];
        let query = LocationQuery::parse("Springfield,MA");

        let place = select_candidate(results, &query).unwrap();
        assert_eq!(place.admin1.as_deref(), Some("Massachusetts"));
        assert_eq!(place.latitude, 42.1);
    }

    #[test]
    fn state_filter_without_match_is_not_found() {
        let results = vec![candidate("Springfield", "Illinois", 39.8)];
        let query = LocationQuery::parse("Springfield,VT");

        let err = select_candidate(results, &query).unwrap_err();
        assert!(matches!(err, WeatherError::LocationNotFound(ref name) if name == "Springfield"));
    }

    #[test]
    fn candidate_without_region_never_matches_a_state() {
        let results = vec![GeoResult {
            name: "Boston".into(),
            admin1: None,
            latitude: 1.0,
            longitude: 1.0,
        }];
        let err = select_candidate(results, &LocationQuery::parse("Boston,MA")).unwrap_err();
        assert!(matches!(err, WeatherError::LocationNotFound(_)));
    }

    #[test]
    fn no_state_takes_first_candidate() {
        let results =
            vec![candidate("Paris", "Ile-de-France", 48.8), candidate("Paris", "Texas", 33.6)];
        let place = select_candidate(results, &LocationQuery::parse("Paris")).unwrap();
        assert_eq!(place.latitude, 48.8);
    }

    #[test]
    fn empty_results_are_not_found() {
        let err = select_candidate(Vec::new(), &LocationQuery::parse("02108")).unwrap_err();
        assert_eq!(err.to_string(), "location not found: 02108");
    }

    #[test]
    fn future_days_drops_today_and_keeps_five() {
        let days = future_days(&daily_with(6)).unwrap();

        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(days[0].high, 41.0);
        assert_eq!(days[0].low, 31.0);
        assert_eq!(days[0].wind_speed, 6.0);
        assert_eq!(days[0].humidity, 51);
        assert_eq!(days[0].conditions, "mainly clear");
        assert_eq!(days[1].conditions, "unknown");
    }

    #[test]
    fn future_days_ignores_extra_entries() {
        let days = future_days(&daily_with(7)).unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[4].high, 45.0);
    }

    #[test]
    fn future_days_needs_six_entries() {
        let err = future_days(&daily_with(5)).unwrap_err();
        assert!(matches!(err, WeatherError::InsufficientForecastData));

        let err = future_days(&OmDaily::default()).unwrap_err();
        assert!(matches!(err, WeatherError::InsufficientForecastData));
    }

    #[test]
    fn current_uses_today_extremes_and_apparent_temperature() {
        let data: OmResponse = serde_json::from_value(json!({
            "current": {
                "temperature_2m": 52.8,
                "relativehumidity_2m": 62,
                "apparent_temperature": 49.1,
                "weathercode": 3,
                "windspeed_10m": 12.5
            },
            "daily": {
                "time": ["2025-02-15"],
                "temperature_2m_max": [58.0],
                "temperature_2m_min": [41.0]
            }
        }))
        .unwrap();

        let current = current_from_response("Clinton", &data);

        assert_eq!(current.location, "Clinton");
        assert_eq!(current.conditions, "overcast");
        assert_eq!(current.temperature, 52.8);
        assert_eq!(current.feels_like, 49.1);
        assert_eq!(current.temp_max, 58.0);
        assert_eq!(current.temp_min, 41.0);
        assert_eq!(current.humidity, 62);
        assert_eq!(current.wind_speed, 12.5);
    }

    #[test]
    fn current_without_daily_or_apparent_temperature() {
        let data: OmResponse = serde_json::from_value(json!({
            "current": {
                "temperature_2m": 70.0,
                "relativehumidity_2m": 40,
                "weathercode": 42,
                "windspeed_10m": 3.0
            }
        }))
        .unwrap();

        let current = current_from_response("Nowhere", &data);

        assert_eq!(current.feels_like, 70.0);
        assert_eq!(current.temp_max, 0.0);
        assert_eq!(current.temp_min, 0.0);
        assert_eq!(current.conditions, "unknown");
    }
}
