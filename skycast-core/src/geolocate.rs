//! Device-location capability consumed by the gateway.
//!
//! The actual positioning backend is a collaborator, not part of the
//! pipeline, so it sits behind an async trait. Outcomes are a closed set
//! rather than an error type: every failure mode degrades to "no
//! position", and callers fall back to a default location.

use std::time::Duration;

use async_trait::async_trait;

use crate::model::Coordinate;

/// Default cap on how long a position request may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a device-location request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoOutcome {
    Position(Coordinate),
    PermissionDenied,
    Unavailable,
    Timeout,
}

/// Positioning backend. Implementations do not need high-accuracy fixes;
/// a cached position up to a few minutes old is acceptable.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> GeoOutcome;
}

/// Run `locate` with a hard upper bound on wall time.
pub async fn locate_with_timeout(geolocator: &dyn Geolocator, timeout: Duration) -> GeoOutcome {
    match tokio::time::timeout(timeout, geolocator.locate()).await {
        Ok(outcome) => outcome,
        Err(_) => GeoOutcome::Timeout,
    }
}

/// Null backend for environments with no positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn locate(&self) -> GeoOutcome {
        GeoOutcome::Unavailable
    }
}

/// Backend that reads a position from `SKYCAST_LAT` / `SKYCAST_LON`.
///
/// This is the CLI's stand-in for a browser's geolocation prompt: useful
/// on headless machines and in scripted setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvGeolocation;

#[async_trait]
impl Geolocator for EnvGeolocation {
    async fn locate(&self) -> GeoOutcome {
        let lat = std::env::var("SKYCAST_LAT").ok().and_then(|v| v.parse::<f64>().ok());
        let lon = std::env::var("SKYCAST_LON").ok().and_then(|v| v.parse::<f64>().ok());

        match (lat, lon) {
            (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
                Ok(coord) => GeoOutcome::Position(coord),
                Err(_) => GeoOutcome::Unavailable,
            },
            _ => GeoOutcome::Unavailable,
        }
    }
}

/// Fixed-position backend for tests and configured defaults.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl Geolocator for FixedPosition {
    async fn locate(&self) -> GeoOutcome {
        GeoOutcome::Position(self.0)
    }
}
