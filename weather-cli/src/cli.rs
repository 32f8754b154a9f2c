use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use tracing::debug;
use weather_core::{
    Config, ProviderId, WeatherProvider,
    config::store_api_key,
    provider::{default_provider_from_config, provider_from_config},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Log request details to stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Provider short name, overriding the configured default.
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Read canned OpenWeather responses (weather.weather.json,
    /// weather.forecast.json) instead of calling the API.
    #[arg(long, global = true)]
    pub test_data: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "openmeteo".
        provider: String,
    },

    /// Show current conditions.
    Current {
        /// 5-digit US zip code or "City,ST".
        location: String,
    },

    /// Show current conditions and a multi-day forecast.
    Forecast {
        /// 5-digit US zip code or "City,ST".
        location: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli { provider, test_data, command, .. } = self;

        match command {
            Command::Configure { provider } => configure(&provider)?,
            Command::Current { location } => {
                let provider = build_provider(provider.as_deref(), test_data)?;
                let current = provider
                    .current_weather(&location)
                    .await
                    .with_context(|| format!("Failed to get current weather for '{location}'"))?;

                print!("{}", render::current(&current));
            }
            Command::Forecast { location } => {
                let provider = build_provider(provider.as_deref(), test_data)?;
                let forecast = provider
                    .forecast(&location)
                    .await
                    .with_context(|| format!("Failed to get forecast for '{location}'"))?;

                print!("{}", render::forecast(&forecast));
            }
        }

        Ok(())
    }
}

fn build_provider(
    provider: Option<&str>,
    test_data: bool,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let config = Config::load()?;

    let provider = match provider {
        Some(name) => provider_from_config(ProviderId::try_from(name)?, &config, test_data)?,
        None => default_provider_from_config(&config, test_data)?,
    };
    debug!(provider = %provider.id(), test_data, "provider selected");

    Ok(provider)
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if id.requires_api_key() {
        let key = Password::new(&format!("{id} API key:"))
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()?;

        if key.trim().is_empty() {
            bail!("API key must not be empty");
        }

        let key_file = Config::api_key_file_path(id)?;
        store_api_key(&key_file, &key)?;
        println!("Saved API key to {}", key_file.display());
    } else {
        println!("{id} does not need an API key.");
    }

    let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
        .with_default(true)
        .prompt()?;

    if make_default {
        config.set_default_provider(id);
        config.save()?;
        println!("Default provider set to {id}");
    }

    Ok(())
}
