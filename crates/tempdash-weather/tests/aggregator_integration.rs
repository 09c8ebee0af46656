//! Integration tests for WeatherAggregator using wiremock.
//!
//! Each city is matched on its latitude so responses (and their delays) can be
//! set per city.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tempdash_weather::{City, ForecastError, ForecastProvider, WeatherAggregator};
use tokio::runtime::Handle;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn city_a() -> City {
    City::new("New York", 40.7128, -74.006, "America/New_York")
}

fn city_b() -> City {
    City::new("London", 51.5074, -0.1278, "Europe/London")
}

fn daily_body(times: &[&str], temps: &[f64]) -> serde_json::Value {
    serde_json::json!({
        "daily": {
            "time": times,
            "temperature_2m_max": temps
        }
    })
}

async fn mount_city(server: &MockServer, city: &City, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", city.latitude.to_string()))
        .respond_with(template)
        .mount(server)
        .await;
}

fn aggregator_for(server: &MockServer) -> WeatherAggregator {
    let provider =
        ForecastProvider::with_base_url(&format!("{}/v1/forecast", server.uri())).unwrap();
    WeatherAggregator::new(Arc::new(provider), Handle::current())
}

#[tokio::test]
async fn test_refresh_populates_every_city() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200)
            .set_body_json(daily_body(&["2024-07-01", "2024-07-02", "2024-07-03"], &[30.0, 31.0, 29.0]))
            .set_delay(Duration::from_millis(80)),
    )
    .await;
    mount_city(
        &server,
        &city_b(),
        ResponseTemplate::new(200)
            .set_body_json(daily_body(&["2024-07-01", "2024-07-02"], &[20.0, 22.0])),
    )
    .await;

    let mut agg = aggregator_for(&server);
    let report = agg.refresh(&[city_a(), city_b()]).await;

    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 2);
    assert!(!agg.is_loading());
    assert_eq!(agg.last_error(), None);
    assert_eq!(agg.series("New York").map(<[_]>::len), Some(3));
    assert_eq!(agg.average_temperature("New York"), Some(30.0));
    assert_eq!(agg.average_temperature("London"), Some(21.0));
}

#[tokio::test]
async fn test_requests_run_concurrently_and_complete_in_any_order() {
    let server = MockServer::start().await;
    // The first city answers last
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200)
            .set_body_json(daily_body(&["2024-07-01"], &[30.0]))
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_city(
        &server,
        &city_b(),
        ResponseTemplate::new(200).set_body_json(daily_body(&["2024-07-01"], &[20.0])),
    )
    .await;

    let mut agg = aggregator_for(&server);
    let report = agg.refresh(&[city_a(), city_b()]).await;

    let order: Vec<&str> = report.succeeded.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(order, vec!["London", "New York"]);
}

#[tokio::test]
async fn test_failure_completing_last_sets_last_error() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200).set_body_json(daily_body(&["2024-07-01"], &[30.0])),
    )
    .await;
    mount_city(
        &server,
        &city_b(),
        ResponseTemplate::new(200)
            .set_body_string("not json")
            .set_delay(Duration::from_millis(300)),
    )
    .await;

    let mut agg = aggregator_for(&server);
    let report = agg.refresh(&[city_a(), city_b()]).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "London");
    assert!(matches!(report.failed[0].1, ForecastError::Decode(_)));
    let err = agg.last_error().unwrap();
    assert!(err.starts_with("Failed to decode data: "), "{}", err);
    assert_eq!(agg.average_temperature("New York"), Some(30.0));
}

#[tokio::test]
async fn test_failure_completing_first_is_masked_by_later_success() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200)
            .set_body_json(daily_body(&["2024-07-01"], &[30.0]))
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_city(&server, &city_b(), ResponseTemplate::new(200)).await;

    let mut agg = aggregator_for(&server);
    let report = agg.refresh(&[city_a(), city_b()]).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(agg.last_error(), None);
    // The failure is still visible per city
    assert_eq!(agg.city_error("London"), Some("No data received"));
}

#[tokio::test]
async fn test_failed_refetch_keeps_previous_series() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(daily_body(&["2024-07-01", "2024-07-02"], &[10.0, 14.0])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut agg = aggregator_for(&server);
    agg.refresh(&[city_a()]).await;
    assert_eq!(agg.average_temperature("New York"), Some(12.0));

    let report = agg.refresh(&[city_a()]).await;
    assert!(matches!(
        report.failed[0].1,
        ForecastError::Api { status: 500, .. }
    ));
    assert_eq!(agg.average_temperature("New York"), Some(12.0));
    assert!(agg.last_error().is_some());
}

#[tokio::test]
async fn test_overlapping_cycle_skips_cities_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(daily_body(&["2024-07-01"], &[18.0]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut agg = aggregator_for(&server);
    assert_eq!(agg.fetch_all(&[city_a()]), 1);
    assert_eq!(agg.fetch_all(&[city_a()]), 0);
    assert_eq!(agg.in_flight_count(), 1);

    let report = agg.settle().await;
    assert_eq!(report.succeeded, vec![("New York".to_string(), 1)]);
    // MockServer verifies the single-request expectation on drop
}

#[tokio::test]
async fn test_poll_updates_applies_completed_fetches() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200).set_body_json(daily_body(&["2024-07-01"], &[25.0])),
    )
    .await;
    mount_city(
        &server,
        &city_b(),
        ResponseTemplate::new(200).set_body_json(daily_body(&["2024-07-01"], &[15.0])),
    )
    .await;

    let mut agg = aggregator_for(&server);
    agg.fetch_all(&[city_a(), city_b()]);
    assert!(agg.is_loading());

    let mut applied = 0;
    for _ in 0..100 {
        applied += agg.poll_updates();
        if !agg.is_loading() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(applied, 2);
    assert!(!agg.is_loading());
    assert_eq!(agg.latest_temperature("New York"), Some(25.0));
    assert_eq!(agg.latest_temperature("London"), Some(15.0));
}

#[tokio::test]
async fn test_timezone_is_sent_per_city() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("timezone", "Europe/London"))
        .and(query_param("daily", "temperature_2m_max"))
        .and(query_param("longitude", "-0.1278"))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_body(&["2024-07-01"], &[19.5])))
        .expect(1)
        .mount(&server)
        .await;

    let mut agg = aggregator_for(&server);
    let report = agg.refresh(&[city_b()]).await;

    assert!(report.is_success());
    assert_eq!(agg.average_temperature("London"), Some(19.5));
}

#[tokio::test]
async fn test_settle_returns_when_fetch_runtime_shuts_down() {
    let server = MockServer::start().await;
    mount_city(
        &server,
        &city_a(),
        ResponseTemplate::new(200)
            .set_body_json(daily_body(&["2024-07-01"], &[30.0]))
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    // Fetches run on a runtime that goes away before they finish
    let io_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let provider =
        ForecastProvider::with_base_url(&format!("{}/v1/forecast", server.uri())).unwrap();
    let mut agg = WeatherAggregator::new(Arc::new(provider), io_runtime.handle().clone());

    assert_eq!(agg.fetch_all(&[city_a()]), 1);
    assert!(agg.is_loading());
    io_runtime.shutdown_background();

    let report = tokio::time::timeout(Duration::from_secs(3), agg.settle())
        .await
        .expect("settle hung on a task that never reported");

    assert!(!agg.is_loading());
    assert_eq!(agg.in_flight_count(), 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "New York");
    assert!(matches!(
        &report.failed[0].1,
        ForecastError::Transport(msg) if msg.contains("ended without a result")
    ));
    assert!(agg.series("New York").is_none());
    assert!(agg.last_error().is_some());

    // The city is no longer marked in flight, so the next cycle issues it again
    assert_eq!(agg.fetch_all(&[city_a()]), 1);
    let report = tokio::time::timeout(Duration::from_secs(3), agg.settle())
        .await
        .expect("settle hung after runtime shutdown");
    assert_eq!(report.failed.len(), 1);
    assert!(!agg.is_loading());
}
