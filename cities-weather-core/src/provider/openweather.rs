use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{error::EtlError, model::WeatherObservation, units::kelvin_to_fahrenheit};

use super::ObservationSource;

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Fetches current observations from the OpenWeather API.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, EtlError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { api_key, http })
    }
}

#[async_trait]
impl ObservationSource for OpenWeatherSource {
    async fn fetch(&self, city: &str) -> Result<WeatherObservation, EtlError> {
        let res = self
            .http
            .get(CURRENT_WEATHER_URL)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| EtlError::Provider(format!("request to OpenWeather for `{city}` failed: {e}")))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            EtlError::Provider(format!("failed to read OpenWeather response for `{city}`: {e}"))
        })?;

        if !status.is_success() {
            return Err(EtlError::Provider(format!(
                "OpenWeather request for `{city}` failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        parse_current_body(city, &body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
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
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    weather: Vec<OwWeather>,
    main: OwMain,
    wind: OwWind,
    dt: i64,
    timezone: i64,
    sys: OwSys,
}

/// Normalize a raw current-weather body into a [`WeatherObservation`].
///
/// Temperatures come back in Kelvin and are converted to the display unit;
/// `observed_at`, `sunrise` and `sunset` are all shifted to city-local time
/// with the response's own UTC offset.
fn parse_current_body(city: &str, body: &str) -> Result<WeatherObservation, EtlError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| EtlError::Parse(format!("invalid OpenWeather JSON for `{city}`: {e}")))?;

    let description = parsed
        .weather
        .first()
        .map(|w| w.description.clone())
        .ok_or_else(|| {
            EtlError::Parse(format!("OpenWeather response for `{city}` has an empty weather array"))
        })?;

    let observed_at = local_timestamp(parsed.dt, parsed.timezone)
        .ok_or_else(|| EtlError::Parse(format!("observation epoch out of range for `{city}`")))?;
    let sunrise = local_timestamp(parsed.sys.sunrise, parsed.timezone)
        .ok_or_else(|| EtlError::Parse(format!("sunrise epoch out of range for `{city}`")))?;
    let sunset = local_timestamp(parsed.sys.sunset, parsed.timezone)
        .ok_or_else(|| EtlError::Parse(format!("sunset epoch out of range for `{city}`")))?;

    Ok(WeatherObservation {
        city: city.to_string(),
        description,
        temperature: kelvin_to_fahrenheit(parsed.main.temp),
        feels_like: kelvin_to_fahrenheit(parsed.main.feels_like),
        temp_min: kelvin_to_fahrenheit(parsed.main.temp_min),
        temp_max: kelvin_to_fahrenheit(parsed.main.temp_max),
        pressure: parsed.main.pressure,
        humidity: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        observed_at,
        sunrise,
        sunset,
    })
}

fn local_timestamp(epoch: i64, utc_offset: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch + utc_offset, 0).map(|dt| dt.naive_utc())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-03-11 10:00:00 UTC
    const DT: i64 = 1741687200;

    fn sample_body(timezone: i64) -> String {
        format!(
            r#"{{
                "weather": [{{"description": "light rain"}}],
                "main": {{
                    "temp": 283.15,
                    "feels_like": 281.15,
                    "temp_min": 280.15,
                    "temp_max": 285.15,
                    "pressure": 1016,
                    "humidity": 87
                }},
                "wind": {{"speed": 4.12}},
                "dt": {DT},
                "timezone": {timezone},
                "sys": {{"sunrise": {}, "sunset": {}}}
            }}"#,
            DT - 10800,
            DT + 28800,
        )
    }

    #[test]
    fn parses_and_converts_a_current_weather_body() {
        let obs = parse_current_body("Seattle", &sample_body(0)).expect("parse");

        assert_eq!(obs.city, "Seattle");
        assert_eq!(obs.description, "light rain");
        assert!((obs.temperature - 50.0).abs() < 1e-6);
        assert!((obs.feels_like - 46.4).abs() < 1e-6);
        assert!((obs.temp_min - 44.6).abs() < 1e-6);
        assert!((obs.temp_max - 53.6).abs() < 1e-6);
        assert_eq!(obs.pressure, 1016);
        assert_eq!(obs.humidity, 87);
        assert!((obs.wind_speed - 4.12).abs() < 1e-6);
        assert_eq!(obs.observed_at_key(), "2025-03-11 10:00:00");
    }

    #[test]
    fn applies_the_utc_offset_to_all_three_timestamps() {
        // Mumbai, UTC+5:30
        let obs = parse_current_body("Mumbai", &sample_body(19800)).expect("parse");

        assert_eq!(obs.observed_at_key(), "2025-03-11 15:30:00");
        assert_eq!(
            obs.sunrise.format(crate::model::TIMESTAMP_FORMAT).to_string(),
            "2025-03-11 12:30:00"
        );
        assert_eq!(
            obs.sunset.format(crate::model::TIMESTAMP_FORMAT).to_string(),
            "2025-03-11 23:30:00"
        );
    }

    #[test]
    fn empty_weather_array_is_a_parse_error() {
        let body = sample_body(0).replacen(r#"[{"description": "light rain"}]"#, "[]", 1);

        let err = parse_current_body("Seattle", &body).unwrap_err();

        assert!(matches!(err, EtlError::Parse(_)));
    }

    #[test]
    fn missing_main_block_is_a_parse_error() {
        let err = parse_current_body("Seattle", r#"{"weather": []}"#).unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
    }
}
