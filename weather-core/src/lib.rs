//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credential resolution
//! - Abstraction over weather providers (OpenWeather, Open-Meteo)
//! - The normalized weather model every provider maps into
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use config::Config;
pub use error::WeatherError;
pub use model::{CurrentWeather, DailyForecast, Forecast};
pub use provider::{ProviderId, WeatherProvider};
