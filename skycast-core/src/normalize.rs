//! Reshapes raw provider payloads into the canonical [`WeatherSnapshot`].
//!
//! The interesting part is the forecast aggregation: the provider delivers
//! 3-hourly samples spanning up to five days, and each calendar day is
//! collapsed into a single [`DailyForecast`].

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{CurrentConditions, DailyForecast, LocationInfo, WeatherSnapshot};
use crate::provider::{RawCurrent, RawForecast, RawForecastEntry};

/// How many distinct calendar days the aggregation keeps.
const FORECAST_DAYS: usize = 5;

/// Visibility reported when the provider omits the field, in km.
const DEFAULT_VISIBILITY_KM: i32 = 10;

/// Build a snapshot from one current-conditions payload and one forecast
/// payload. Fails without partial output if either payload is unusable, so
/// the gateway never caches a half-built snapshot.
pub fn snapshot(
    current: &RawCurrent,
    forecast: &RawForecast,
    now: DateTime<Utc>,
) -> Result<WeatherSnapshot> {
    Ok(WeatherSnapshot {
        location: LocationInfo {
            name: current.name.clone(),
            country: current.sys.country.clone().unwrap_or_default(),
            lat: current.coord.lat,
            lon: current.coord.lon,
        },
        current: current_conditions(current)?,
        forecast: daily_forecast(&forecast.list)?,
        last_updated: now,
    })
}

fn current_conditions(raw: &RawCurrent) -> Result<CurrentConditions> {
    let condition = raw
        .weather
        .first()
        .ok_or_else(|| Error::MalformedResponse("current payload has no weather entry".into()))?;

    Ok(CurrentConditions {
        temperature: raw.main.temp,
        feels_like: raw.main.feels_like,
        condition_code: condition.main.clone(),
        description: condition.description.clone(),
        humidity_pct: clamp_pct(raw.main.humidity),
        wind_speed_kmh: wind_kmh(raw.wind.speed),
        visibility_km: visibility_km(raw.visibility),
        pressure_hpa: raw.main.pressure,
        uv_index: raw.uvi,
        icon_code: condition.icon.clone(),
    })
}

/// Collapse 3-hourly samples into at most [`FORECAST_DAYS`] daily entries.
///
/// Buckets are keyed by the date portion of `dt_txt` and kept in first-seen
/// order; the provider delivers samples chronologically, so first-seen
/// equals ascending date. Out-of-order input is bucketed as-is, not
/// re-sorted.
fn daily_forecast(samples: &[RawForecastEntry]) -> Result<Vec<DailyForecast>> {
    if samples.is_empty() {
        return Err(Error::MalformedResponse("forecast payload has no samples".into()));
    }

    let mut buckets: Vec<(&str, Vec<&RawForecastEntry>)> = Vec::new();
    for sample in samples {
        let date = sample
            .dt_txt
            .split_whitespace()
            .next()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                Error::MalformedResponse(format!("forecast sample has no timestamp: {:?}", sample.dt_txt))
            })?;

        match buckets.iter().position(|(d, _)| *d == date) {
            Some(i) => buckets[i].1.push(sample),
            None if buckets.len() < FORECAST_DAYS => buckets.push((date, vec![sample])),
            // Already have five distinct days; later dates are dropped.
            None => {}
        }
    }

    buckets.into_iter().map(|(date, bucket)| aggregate_day(date, &bucket)).collect()
}

fn aggregate_day(date: &str, bucket: &[&RawForecastEntry]) -> Result<DailyForecast> {
    // Condition comes from the day's first sample; the icon comes from the
    // temporally middle sample, which better matches the day's overall
    // character than an early-morning one.
    let first = bucket[0]
        .weather
        .first()
        .ok_or_else(|| Error::MalformedResponse(format!("sample for {date} has no weather entry")))?;
    let middle = bucket[bucket.len() / 2]
        .weather
        .first()
        .ok_or_else(|| Error::MalformedResponse(format!("sample for {date} has no weather entry")))?;

    let temps: Vec<f64> = bucket.iter().map(|s| s.main.temp).collect();
    let max_temp = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_temp = temps.iter().copied().fold(f64::INFINITY, f64::min);

    let mean_humidity = mean(bucket.iter().map(|s| s.main.humidity));
    let mean_wind = mean(bucket.iter().map(|s| s.wind.speed));
    let mean_pop = mean(bucket.iter().map(|s| s.pop.unwrap_or(0.0)));

    Ok(DailyForecast {
        date: date.to_string(),
        max_temp: max_temp.round() as i32,
        min_temp: min_temp.round() as i32,
        condition_code: first.main.clone(),
        description: first.description.clone(),
        humidity_pct: clamp_pct(mean_humidity),
        wind_speed_kmh: wind_kmh(mean_wind),
        precipitation_pct: clamp_pct(mean_pop * 100.0),
        icon_code: middle.icon.clone(),
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Wind speed in m/s to rounded km/h.
pub fn wind_kmh(mps: f64) -> i32 {
    (mps * 3.6).round() as i32
}

/// Visibility in meters to rounded km, defaulting when the provider omits it.
pub fn visibility_km(meters: Option<f64>) -> i32 {
    match meters {
        Some(m) => (m / 1000.0).round() as i32,
        None => DEFAULT_VISIBILITY_KM,
    }
}

fn clamp_pct(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
