//! HTTP client for the OpenWeather endpoints.
//!
//! This layer does exactly one thing per call: a parameterized GET,
//! deserialized at this boundary into the explicit payload structs below.
//! It never touches the cache or the rate limiter, and it never retries;
//! both policies belong to the gateway and its callers.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::Coordinate;

const DEFAULT_WEATHER_BASE: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_GEO_BASE: &str = "https://api.openweathermap.org/geo/1.0";

/// Client for the three OpenWeather endpoints the pipeline consumes:
/// current conditions, 5-day/3-hour forecast, and geocoding search.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
    weather_base: String,
    geo_base: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            http,
            weather_base: DEFAULT_WEATHER_BASE.to_string(),
            geo_base: DEFAULT_GEO_BASE.to_string(),
        })
    }

    /// Override endpoint bases, e.g. to point at a mock server in tests.
    pub fn with_base_urls(mut self, weather_base: &str, geo_base: &str) -> Self {
        self.weather_base = weather_base.trim_end_matches('/').to_string();
        self.geo_base = geo_base.trim_end_matches('/').to_string();
        self
    }

    pub async fn fetch_current(&self, coord: Coordinate) -> Result<RawCurrent> {
        let url = format!("{}/weather", self.weather_base);
        self.get_json(&url, &[
            ("lat", coord.lat.to_string()),
            ("lon", coord.lon.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ])
        .await
    }

    pub async fn fetch_forecast(&self, coord: Coordinate) -> Result<RawForecast> {
        let url = format!("{}/forecast", self.weather_base);
        self.get_json(&url, &[
            ("lat", coord.lat.to_string()),
            ("lon", coord.lon.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ])
        .await
    }

    pub async fn search_places(&self, query: &str, limit: usize) -> Result<Vec<RawPlace>> {
        let url = format!("{}/direct", self.geo_base);
        self.get_json(&url, &[
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("appid", self.api_key.clone()),
        ])
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        tracing::debug!(url, "provider request");

        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Provider {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|err| Error::MalformedResponse(format!("{url}: {err}")))
    }
}

/// `weather[i]` element, shared by current and forecast payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSys {
    pub country: Option<String>,
}

/// Subset of `GET /weather` the pipeline consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrent {
    pub coord: RawCoord,
    pub weather: Vec<RawCondition>,
    pub main: RawMain,
    pub wind: RawWind,
    /// Meters; the provider omits it in some conditions.
    pub visibility: Option<f64>,
    #[serde(default)]
    pub sys: RawSys,
    pub name: String,
    /// UV index is only present on some provider plans.
    #[serde(default)]
    pub uvi: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastMain {
    pub temp: f64,
    pub humidity: f64,
}

/// One 3-hour sample from `GET /forecast`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastEntry {
    /// Sample timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub dt_txt: String,
    pub main: RawForecastMain,
    pub weather: Vec<RawCondition>,
    pub wind: RawWind,
    /// Precipitation probability in [0, 1].
    #[serde(default)]
    pub pop: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    pub list: Vec<RawForecastEntry>,
}

/// One geocoding match from `GET /direct`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlace {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn parses_current_payload_subset() {
        let body = r#"{
            "coord": {"lat": 51.5074, "lon": -0.1278},
            "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
            "main": {"temp": 17.3, "feels_like": 16.9, "humidity": 72, "pressure": 1012},
            "wind": {"speed": 4.1},
            "visibility": 10000,
            "sys": {"country": "GB"},
            "name": "London",
            "dt": 1754500000
        }"#;

        let parsed: RawCurrent = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.name, "London");
        assert_eq!(parsed.sys.country.as_deref(), Some("GB"));
        assert_eq!(parsed.weather[0].main, "Clouds");
        assert_eq!(parsed.visibility, Some(10000.0));
        assert_eq!(parsed.uvi, None);
    }

    #[test]
    fn parses_forecast_entry_without_pop() {
        let body = r#"{
            "dt_txt": "2026-08-07 12:00:00",
            "main": {"temp": 21.0, "humidity": 60},
            "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
            "wind": {"speed": 3.0}
        }"#;

        let parsed: RawForecastEntry = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.pop, None);
        assert_eq!(parsed.dt_txt, "2026-08-07 12:00:00");
    }

    #[test]
    fn parses_geocoding_matches() {
        let body = r#"[
            {"name": "London", "country": "GB", "lat": 51.5074, "lon": -0.1278},
            {"name": "London", "country": "CA", "state": "Ontario", "lat": 42.9836, "lon": -81.2497}
        ]"#;

        let parsed: Vec<RawPlace> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].state, None);
        assert_eq!(parsed[1].state.as_deref(), Some("Ontario"));
    }
}
