//! End-to-end tests for the gateway pipeline against a mock provider.

use std::time::Duration;

use skycast_core::cache::CacheStore;
use skycast_core::error::Error;
use skycast_core::gateway::WeatherGateway;
use skycast_core::geolocate::FixedPosition;
use skycast_core::model::Coordinate;
use skycast_core::provider::OpenWeatherClient;
use skycast_core::rate_limit::RateLimiter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAT: f64 = 51.5074;
const LON: f64 = -0.1278;

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lat": LAT, "lon": LON},
        "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
        "main": {"temp": 17.3, "feels_like": 16.9, "humidity": 72, "pressure": 1012},
        "wind": {"speed": 4.1},
        "visibility": 8000,
        "sys": {"country": "GB"},
        "name": "London",
        "dt": 1754500000
    })
}

fn forecast_body() -> serde_json::Value {
    let mut list = Vec::new();
    for day in 1..=6 {
        for hour in [9, 15] {
            list.push(serde_json::json!({
                "dt_txt": format!("2026-08-{day:02} {hour:02}:00:00"),
                "main": {"temp": 14.0 + f64::from(hour) / 3.0, "humidity": 65},
                "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}],
                "wind": {"speed": 5.0},
                "pop": 0.4
            }));
        }
    }
    serde_json::json!({"list": list})
}

async fn mount_weather(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(expected_calls)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn gateway_for(server: &MockServer) -> WeatherGateway {
    let client = OpenWeatherClient::new("test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_urls(&server.uri(), &server.uri());

    WeatherGateway::new(
        Some(client),
        CacheStore::new(Duration::from_secs(600)),
        RateLimiter::new(60, Duration::from_secs(60)),
    )
}

#[tokio::test]
async fn cold_cache_fetches_once_then_serves_cached() {
    let server = MockServer::start().await;
    // Exactly one current call and one forecast call across both lookups.
    mount_weather(&server, 1).await;

    let gateway = gateway_for(&server);

    let first = gateway.weather(LAT, LON).await.unwrap();
    assert_eq!(first.location.name, "London");
    assert_eq!(first.location.country, "GB");
    assert_eq!(first.current.visibility_km, 8);
    assert_eq!(first.forecast.len(), 5);
    assert_eq!(first.forecast[0].date, "2026-08-01");

    let second = gateway.weather(LAT, LON).await.unwrap();
    assert_eq!(second.location.name, first.location.name);
    assert_eq!(second.last_updated, first.last_updated);
}

#[tokio::test]
async fn refresh_always_refetches() {
    let server = MockServer::start().await;
    mount_weather(&server, 2).await;

    let gateway = gateway_for(&server);

    gateway.weather(LAT, LON).await.unwrap();
    // The cache entry is still fresh; refresh must bypass it.
    gateway.refresh(LAT, LON).await.unwrap();
}

#[tokio::test]
async fn provider_failure_propagates_and_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);

    let err = gateway.weather(LAT, LON).await.unwrap_err();
    assert!(matches!(err, Error::Provider { status: 500, .. }));

    // The failed lookup left nothing behind; a retry reaches the
    // now-healthy provider and succeeds.
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;

    let snapshot = gateway.weather(LAT, LON).await.unwrap();
    assert_eq!(snapshot.location.name, "London");
}

#[tokio::test]
async fn repeated_search_hits_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "London", "country": "GB", "lat": LAT, "lon": LON}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);

    let first = gateway.search("London").await.unwrap();
    // Same query modulo case and whitespace maps to the same cache key.
    let second = gateway.search("  LONDON ").await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second[0].name, "London");
}

#[tokio::test]
async fn search_rate_limit_is_independent_of_weather() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "London", "country": "GB", "lat": LAT, "lon": LON}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_weather(&server, 1).await;

    let client = OpenWeatherClient::new("test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_urls(&server.uri(), &server.uri());
    // One admission per window: the second search call must be denied,
    // while the weather identifier is untouched by search traffic.
    let gateway = WeatherGateway::new(
        Some(client),
        CacheStore::new(Duration::from_secs(600)),
        RateLimiter::new(1, Duration::from_secs(60)),
    );

    let results = gateway.search("London").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label(), "London, GB");

    let err = gateway.search("Paris").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));

    let snapshot = gateway.weather(LAT, LON).await.unwrap();
    assert_eq!(snapshot.location.name, "London");
}

#[tokio::test]
async fn device_position_feeds_the_same_pipeline() {
    let server = MockServer::start().await;
    mount_weather(&server, 1).await;

    let coord = Coordinate::new(LAT, LON).unwrap();
    let gateway = gateway_for(&server).with_geolocator(Box::new(FixedPosition(coord)));

    let snapshot = gateway.weather_for_current_device().await.unwrap();
    assert_eq!(snapshot.unwrap().location.name, "London");
}
