//! Orchestrator for the acquisition pipeline.
//!
//! Every caller-facing operation runs the same sequence: validate input,
//! consult the rate limiter, consult the cache, fetch on a miss, normalize,
//! store, return. Failures propagate typed; nothing partial is cached.
//!
//! All collaborators are injected at construction, so the composition root
//! (the CLI, a test harness) owns every piece of shared state.

use std::time::Duration;

use chrono::Utc;

use crate::cache::{self, CacheStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geolocate::{self, GeoOutcome, Geolocator, NoGeolocation};
use crate::model::{Coordinate, SearchResult, WeatherSnapshot};
use crate::normalize;
use crate::provider::OpenWeatherClient;
use crate::rate_limit::RateLimiter;
use crate::recent::RecentSearches;

/// Rate-limiter identifier for coordinate lookups.
const WEATHER_LIMIT_ID: &str = "weather";
/// Rate-limiter identifier for geocoding searches.
const SEARCH_LIMIT_ID: &str = "search";

const MIN_QUERY_CHARS: usize = 2;

pub struct WeatherGateway {
    /// Absent when no API key is configured; operations then fail with
    /// [`Error::NotConfigured`] before any request is issued.
    client: Option<OpenWeatherClient>,
    cache: CacheStore,
    limiter: RateLimiter,
    geolocator: Box<dyn Geolocator>,
    recent: RecentSearches,
    search_limit: usize,
    geolocation_timeout: Duration,
}

impl WeatherGateway {
    pub fn new(client: Option<OpenWeatherClient>, cache: CacheStore, limiter: RateLimiter) -> Self {
        Self {
            client,
            cache,
            limiter,
            geolocator: Box::new(NoGeolocation),
            recent: RecentSearches::in_memory(),
            search_limit: 5,
            geolocation_timeout: geolocate::DEFAULT_TIMEOUT,
        }
    }

    /// Assemble a gateway from configuration, the way the CLI does it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = match config.api_key() {
            Some(key) => Some(OpenWeatherClient::new(key, config.http_timeout())?),
            None => None,
        };

        let cache = CacheStore::new(config.cache_ttl());
        let limiter =
            RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window());

        let recent = match Config::recent_searches_path() {
            Ok(path) => RecentSearches::load(path),
            Err(_) => RecentSearches::in_memory(),
        };

        Ok(Self {
            search_limit: config.search_limit,
            geolocation_timeout: config.geolocation_timeout(),
            recent,
            ..Self::new(client, cache, limiter)
        })
    }

    pub fn with_geolocator(mut self, geolocator: Box<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    pub fn with_recent_searches(mut self, recent: RecentSearches) -> Self {
        self.recent = recent;
        self
    }

    /// Whether a provider key is available. When false, every fetching
    /// operation fails with [`Error::NotConfigured`].
    pub fn has_provider_key(&self) -> bool {
        self.client.is_some()
    }

    /// Current conditions plus forecast for a coordinate, served from
    /// cache when fresh.
    pub async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let coord = Coordinate::new(lat, lon)?;
        self.weather_for(coord).await
    }

    /// Force fresh provider calls by dropping the cache entry first.
    pub async fn refresh(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let coord = Coordinate::new(lat, lon)?;
        self.cache.remove(&cache::weather_key(coord));
        self.weather_for(coord).await
    }

    async fn weather_for(&self, coord: Coordinate) -> Result<WeatherSnapshot> {
        let client = self.client.as_ref().ok_or(Error::NotConfigured)?;

        self.admit(WEATHER_LIMIT_ID)?;

        let key = cache::weather_key(coord);
        if let Some(snapshot) = self.cache.get::<WeatherSnapshot>(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(snapshot);
        }

        tracing::info!(lat = coord.lat, lon = coord.lon, "fetching weather");
        let (current, forecast) =
            tokio::try_join!(client.fetch_current(coord), client.fetch_forecast(coord))?;

        let snapshot = normalize::snapshot(&current, &forecast, Utc::now())?;
        self.cache.set(&key, &snapshot);

        Ok(snapshot)
    }

    /// Geocode a free-text query into candidate places.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return Err(Error::Validation(
                "search query must be at least 2 characters".to_string(),
            ));
        }

        let client = self.client.as_ref().ok_or(Error::NotConfigured)?;

        self.admit(SEARCH_LIMIT_ID)?;

        let key = cache::search_key(trimmed);
        if let Some(results) = self.cache.get::<Vec<SearchResult>>(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(results);
        }

        tracing::info!(query = trimmed, "searching places");
        let places = client.search_places(trimmed, self.search_limit).await?;

        let results: Vec<SearchResult> = places
            .into_iter()
            .map(|p| SearchResult {
                name: p.name,
                country: p.country,
                state: p.state,
                lat: p.lat,
                lon: p.lon,
            })
            .collect();

        self.cache.set(&key, &results);
        Ok(results)
    }

    /// Weather for the device's current position.
    ///
    /// Returns `Ok(None)` when no position could be determined (denied,
    /// unavailable, or timed out); callers fall back to a default
    /// location. Pipeline failures after a successful fix still surface
    /// as errors.
    pub async fn weather_for_current_device(&self) -> Result<Option<WeatherSnapshot>> {
        let outcome =
            geolocate::locate_with_timeout(self.geolocator.as_ref(), self.geolocation_timeout)
                .await;

        match outcome {
            GeoOutcome::Position(coord) => self.weather_for(coord).await.map(Some),
            GeoOutcome::PermissionDenied | GeoOutcome::Unavailable | GeoOutcome::Timeout => {
                tracing::debug!(?outcome, "no device position");
                Ok(None)
            }
        }
    }

    /// Remember a place the caller picked from search results.
    pub fn record_search(&self, result: SearchResult) {
        self.recent.record(result);
    }

    /// Recently picked places, most recent first.
    pub fn recent_searches(&self) -> Vec<SearchResult> {
        self.recent.list()
    }

    fn admit(&self, identifier: &str) -> Result<()> {
        let decision = self.limiter.check(identifier);
        if decision.allowed {
            return Ok(());
        }

        let retry_after = decision.retry_after.unwrap_or_default();
        tracing::warn!(identifier, retry_secs = retry_after.as_secs(), "rate limited");
        Err(Error::RateLimited { retry_after })
    }
}
