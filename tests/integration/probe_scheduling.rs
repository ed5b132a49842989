//! Probing real HTTP endpoints
//!
//! These tests verify that:
//! - Any status code is recorded as-is, 2xx counts as success
//! - Transport errors become failed observations
//! - A failing probe never stops the actor

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use website_monitoring::actors::probe::ProbeHandle;
use website_monitoring::http::ReqwestClient;
use website_monitoring::stats::{Lookback, StatStore};
use website_monitoring::util::WallClock;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn spawn_probe(url: Url, store: &StatStore) -> ProbeHandle {
    ProbeHandle::spawn(
        url,
        // only the immediate first tick and manual probes
        Duration::from_secs(3600),
        Arc::new(ReqwestClient::new().unwrap()),
        store.clone(),
        WallClock::new(),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn test_successful_probe_is_recorded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(30)))
        .mount(&mock_server)
        .await;

    let store = StatStore::new(Duration::from_secs(600));
    let url = Url::parse(&format!("{}/health", mock_server.uri())).unwrap();
    let handle = spawn_probe(url, &store);

    let observation = handle.probe_now().await.unwrap();

    assert_eq!(observation.status_code, Some(200));
    assert!(observation.is_success());
    assert!(observation.latency >= Duration::from_millis(30));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_server_error_is_an_unsuccessful_observation() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let store = StatStore::new(Duration::from_secs(600));
    let handle = spawn_probe(Url::parse(&mock_server.uri()).unwrap(), &store);

    let observation = handle.probe_now().await.unwrap();

    assert_eq!(observation.status_code, Some(500));
    assert!(!observation.is_success());

    let snapshot = store
        .snapshot(WallClock::new().now(), Lookback::Retention)
        .await;
    assert_eq!(snapshot.availability, Some(0.0));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_connection_refused_is_a_failed_observation() {
    let store = StatStore::new(Duration::from_secs(600));
    let handle = spawn_probe(unreachable_url(), &store);

    let first = handle.probe_now().await.unwrap();
    assert_eq!(first.status_code, None);
    assert!(!first.is_success());

    // the actor survives and keeps probing
    let second = handle.probe_now().await.unwrap();
    assert_eq!(second.status_code, None);
    assert!(store.len().await >= 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_redirect_is_recorded_not_followed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", mock_server.uri())),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = StatStore::new(Duration::from_secs(600));
    let url = Url::parse(&format!("{}/old", mock_server.uri())).unwrap();
    let handle = spawn_probe(url, &store);

    let observation = handle.probe_now().await.unwrap();
    assert_eq!(observation.status_code, Some(301));
    assert!(!observation.is_success());

    handle.shutdown().await;
}
