mod common;

use axum::http::StatusCode;
use druginfo::infrastructure::resilience::CircuitBreakerOptions;
use serde_json::Value;
use std::time::Duration;

#[tokio::test]
async fn test_health_endpoint_success() {
    let dir = common::create_fixture_tree();
    let server = common::create_test_server(common::create_test_state(dir.path()));

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.header("cache-control"), "no-store");

    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["store"]["status"], "ok");
    assert_eq!(json["checks"]["cache"]["status"], "ok");
    assert_eq!(json["checks"]["circuit"]["state"], "closed");
}

#[tokio::test]
async fn test_health_endpoint_structure() {
    let dir = common::create_fixture_tree();
    let server = common::create_test_server(common::create_test_state(dir.path()));

    let json = server.get("/health").await.json::<Value>();

    assert!(json.get("status").is_some());
    assert!(json.get("version").is_some());
    assert!(json["checks"].get("store").is_some());
    assert!(json["checks"].get("cache").is_some());
    assert!(json["checks"].get("circuit").is_some());
}

#[tokio::test]
async fn test_health_degraded_when_store_missing() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::create_test_server(common::create_test_state(
        &dir.path().join("does-not-exist"),
    ));

    let response = server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json = response.json::<Value>();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["store"]["status"], "error");
}

/// An `index.json` that is a directory can be stat'ed but not read, so
/// listings fail while the store probe still succeeds.
#[tokio::test]
async fn test_open_circuit_fails_fast_and_degrades_health() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("index.json")).unwrap();

    let circuit = CircuitBreakerOptions {
        failure_threshold: 1,
        reset_timeout: Duration::from_secs(60),
        half_open_max_attempts: 1,
    };
    let server =
        common::create_test_server(common::create_test_state_with(dir.path(), circuit));

    let first = server.get("/api/drugs").await;
    first.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let second = server.get("/api/drugs").await;
    second.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json = second.json::<Value>();
    assert_eq!(json["error"]["code"], "service_unavailable");
    assert_eq!(json["error"]["details"]["circuit"], "store:files");

    let health = server.get("/health").await;
    health.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json = health.json::<Value>();
    assert_eq!(json["checks"]["store"]["status"], "ok");
    assert_eq!(json["checks"]["circuit"]["state"], "open");
    assert_eq!(json["checks"]["circuit"]["failures"], 1);
}
