//! Stale-response middleware over HTTP

mod common;

use axum::http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{StalledWriteStore, TestApp, body_json, browser, header, test_config};

const IP: &str = "203.0.113.90";

#[tokio::test]
async fn test_successful_get_is_tagged_fresh() {
    let app = TestApp::new();

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-status"), Some("fresh"));
    assert_eq!(body_json(response).await["total"], 42);
}

#[tokio::test]
async fn test_failure_propagates_outside_degraded_window() {
    let app = TestApp::new();
    app.send(browser("GET", "/api/report", IP)).await;
    app.report_failing.store(true, Ordering::SeqCst);

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header(&response, "x-cache-status").is_none());
}

#[tokio::test]
async fn test_stale_copy_served_under_high_traffic() {
    let app = TestApp::new();
    app.send(browser("GET", "/api/report", IP)).await;
    app.report_failing.store(true, Ordering::SeqCst);
    app.state.traffic.set_mode(true).await.unwrap();

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-status"), Some("stale"));
    assert!(
        header(&response, "content-type")
            .unwrap()
            .starts_with("application/json")
    );
    assert_eq!(body_json(response).await["total"], 42);
}

#[tokio::test]
async fn test_stale_copy_served_while_circuit_open() {
    let app = TestApp::new();
    app.send(browser("GET", "/api/report", IP)).await;
    app.report_failing.store(true, Ordering::SeqCst);
    for _ in 0..10 {
        app.state.circuit_breaker.record_failure().await;
    }

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-status"), Some("stale"));
}

#[tokio::test]
async fn test_missing_entry_returns_original_failure() {
    let app = TestApp::new();
    app.report_failing.store(true, Ordering::SeqCst);
    app.state.traffic.set_mode(true).await.unwrap();

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "database down");
}

#[tokio::test]
async fn test_query_string_is_part_of_the_key() {
    let app = TestApp::new();
    app.send(browser("GET", "/api/report?page=1", IP)).await;
    app.report_failing.store(true, Ordering::SeqCst);
    app.state.traffic.set_mode(true).await.unwrap();

    let other_page = app.send(browser("GET", "/api/report?page=2", IP)).await;
    assert_eq!(other_page.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let same_page = app.send(browser("GET", "/api/report?page=1", IP)).await;
    assert_eq!(same_page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disabled_cache_passes_through() {
    let mut config = test_config();
    config.stale_cache.enabled = false;
    let app = TestApp::with_config(config);

    let response = app.send(browser("GET", "/api/report", IP)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, "x-cache-status").is_none());
}

#[tokio::test]
async fn test_post_is_never_cached() {
    let app = TestApp::new();

    let response = app.send(browser("POST", "/api/posts", IP)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(header(&response, "x-cache-status").is_none());
}

#[tokio::test]
async fn test_stalled_cache_write_does_not_hold_the_response() {
    let app = TestApp::with_store(test_config(), Arc::new(StalledWriteStore::default()));

    let response = tokio::time::timeout(
        Duration::from_secs(2),
        app.send(browser("GET", "/api/report", IP)),
    )
    .await
    .expect("response should not wait on the cache write");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-status"), Some("fresh"));
    assert_eq!(body_json(response).await["total"], 42);
}
