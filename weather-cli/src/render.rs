//! Plain-text rendering of the weather model.

use std::fmt::Write;

use weather_core::{CurrentWeather, DailyForecast, Forecast};

pub fn current(weather: &CurrentWeather) -> String {
    let mut out = String::new();

    let header = format!("Weather Summary for {}:", weather.location);
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
    let _ = writeln!(out, "Conditions: {}", title_case(&weather.conditions));
    let _ = writeln!(out, "Temperature: {:.1}°F", weather.temperature);
    let _ = writeln!(out, "Feels Like: {:.1}°F", weather.feels_like);
    let _ = writeln!(out, "High/Low: {:.1}°F / {:.1}°F", weather.temp_max, weather.temp_min);
    let _ = writeln!(out, "Humidity: {}%", weather.humidity);
    let _ = writeln!(out, "Wind Speed: {:.1} mph", weather.wind_speed);

    out
}

pub fn forecast(forecast: &Forecast) -> String {
    let mut out = String::new();

    if let Some(now) = &forecast.current {
        out.push_str(&current(now));
        out.push('\n');
    }

    let header = format!("{}-Day Forecast for {}:", forecast.daily.len(), forecast.location);
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));

    for day in &forecast.daily {
        let _ = writeln!(out, "{}", daily_row(day));
    }

    out
}

fn daily_row(day: &DailyForecast) -> String {
    format!(
        "{}: {:<24} High {:>5.1}°F  Low {:>5.1}°F  Humidity {:>3}%  Wind {:>4.1} mph",
        day.date.format("%a %b %d"),
        title_case(&day.conditions),
        day.high,
        day.low,
        day.humidity,
        day.wind_speed,
    )
}

/// "broken clouds" -> "Broken Clouds".
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_current() -> CurrentWeather {
        CurrentWeather {
            location: "Boston".into(),
            conditions: "broken clouds".into(),
            temperature: 41.5,
            feels_like: 36.24,
            temp_max: 44.6,
            temp_min: 38.1,
            humidity: 64,
            wind_speed: 9.22,
        }
    }

    #[test]
    fn title_cases_each_word() {
        assert_eq!(title_case("broken clouds"), "Broken Clouds");
        assert_eq!(title_case("thunderstorm with heavy hail"), "Thunderstorm With Heavy Hail");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn current_summary_layout() {
        let text = current(&sample_current());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Weather Summary for Boston:");
        assert_eq!(lines[1], "-".repeat(lines[0].len()));
        assert_eq!(lines[2], "Conditions: Broken Clouds");
        assert_eq!(lines[3], "Temperature: 41.5°F");
        assert_eq!(lines[4], "Feels Like: 36.2°F");
        assert_eq!(lines[5], "High/Low: 44.6°F / 38.1°F");
        assert_eq!(lines[6], "Humidity: 64%");
        assert_eq!(lines[7], "Wind Speed: 9.2 mph");
    }

    #[test]
    fn forecast_lists_one_row_per_day() {
        let day = |d: u32, conditions: &str| DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            conditions: conditions.into(),
            high: 40.0,
            low: 30.0,
            wind_speed: 10.0,
            humidity: 60,
        };
        let fc = Forecast {
            location: "Boston".into(),
            current: None,
            daily: vec![day(16, "slight snow"), day(17, "overcast")],
        };

        let text = forecast(&fc);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "2-Day Forecast for Boston:");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("Tue Jan 16: Slight Snow"));
        assert!(lines[2].contains("High  40.0°F"));
        assert!(lines[3].starts_with("Wed Jan 17: Overcast"));
    }

    #[test]
    fn forecast_includes_current_block_when_present() {
        let fc = Forecast {
            location: "Boston".into(),
            current: Some(sample_current()),
            daily: Vec::new(),
        };

        let text = forecast(&fc);
        assert!(text.starts_with("Weather Summary for Boston:"));
        assert!(text.contains("0-Day Forecast for Boston:"));
    }
}
