use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Conditions right now. Temperatures are Fahrenheit, wind speed is mph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location: String,
    pub conditions: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity: u8,
    pub wind_speed: f64,
}

/// One aggregated calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub conditions: String,
    pub high: f64,
    pub low: f64,
    pub wind_speed: f64,
    pub humidity: u8,
}

/// Multi-day forecast. `daily` is ascending by date with no repeated dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: String,
    /// Absent when the provider payload has nothing usable for "now".
    pub current: Option<CurrentWeather>,
    pub daily: Vec<DailyForecast>,
}
