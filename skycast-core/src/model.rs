use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated geographic coordinate.
///
/// Construction is validation: every entry point into the pipeline goes
/// through [`Coordinate::new`], so downstream code never re-checks ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::Validation(format!(
                "latitude {lat} is out of range (must be between -90 and 90)"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::Validation(format!(
                "longitude {lon} is out of range (must be between -180 and 180)"
            )));
        }
        Ok(Self { lat, lon })
    }
}

/// One geocoding match, as surfaced to callers for disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    /// ISO-3166 alpha-2 country code.
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl SearchResult {
    /// Display label, e.g. "London, England, GB".
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// Current conditions for one location, recomputed on each fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub condition_code: String,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i32,
    pub visibility_km: i32,
    pub pressure_hpa: f64,
    pub uv_index: Option<f64>,
    pub icon_code: String,
}

/// One calendar day aggregated from the provider's 3-hourly samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub max_temp: i32,
    pub min_temp: i32,
    pub condition_code: String,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i32,
    pub precipitation_pct: u8,
    pub icon_code: String,
}

/// Resolved place attached to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// The unit the cache stores and callers consume: current conditions plus
/// up to five days of forecast for one location. Immutable once built; a
/// refresh produces a new snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    pub last_updated: DateTime<Utc>,
}
