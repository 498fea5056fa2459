//! Integration tests for the scrape and health endpoints.
//!
//! Uses `tower::ServiceExt::oneshot` to call handlers without binding a real
//! TCP port; every test gets a fresh registry and handler.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use flate2::read::GzDecoder;
use prometheus::{IntCounter, Registry};
use std::io::Read;
use std::sync::Arc;
use tower::ServiceExt; // .oneshot()
use vitrine_admin::{AdminState, build_admin_router};
use vitrine_exposition::{
    ErrorHandling, GatherError, GatherFn, HandlerOptions, MetricsHandler, Snapshot,
};
use vitrine_observability::HandlerMetrics;

// ── Helper ────────────────────────────────────────────────────

fn registry_with_jobs() -> Registry {
    let registry = Registry::new();
    let jobs = IntCounter::new("jobs_total", "Jobs processed").unwrap();
    registry.register(Box::new(jobs.clone())).unwrap();
    jobs.inc_by(3);
    registry
}

fn make_state(registry: Registry, error_handling: ErrorHandling) -> Arc<AdminState> {
    let options = HandlerOptions::default().with_error_handling(error_handling);
    Arc::new(AdminState::new(MetricsHandler::new(registry, options), "/metrics"))
}

fn failing_state(error_handling: ErrorHandling) -> Arc<AdminState> {
    let gatherer = GatherFn(|| Snapshot::failed(GatherError::new("collector \"disk\" failed")));
    let options = HandlerOptions::default().with_error_handling(error_handling);
    Arc::new(AdminState::new(MetricsHandler::new(gatherer, options), "/metrics"))
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn gzip_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    to_bytes(resp.into_body(), 1024 * 1024).await.unwrap().to_vec()
}

async fn body_text(resp: axum::response::Response) -> String {
    String::from_utf8(body_bytes(resp).await).unwrap()
}

// ── Health ────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_returns_200() {
    let app = build_admin_router(make_state(Registry::new(), ErrorHandling::HttpError));
    let resp = app.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["metrics_path"], "/metrics");
    assert_eq!(json["error_handling"], "http_error");
}

// ── Scrape ────────────────────────────────────────────────────

#[tokio::test]
async fn scrape_returns_plain_text() {
    let app = build_admin_router(make_state(registry_with_jobs(), ErrorHandling::HttpError));
    let resp = app.oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/plain; version=0.0.4");
    assert!(resp.headers().get("content-encoding").is_none());
    assert!(body_text(resp).await.contains("jobs_total 3"));
}

#[tokio::test]
async fn scrape_gzips_when_asked() {
    let app = build_admin_router(make_state(registry_with_jobs(), ErrorHandling::HttpError));
    let resp = app.oneshot(gzip_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-encoding"], "gzip");

    let compressed = body_bytes(resp).await;
    let mut text = String::new();
    GzDecoder::new(&compressed[..]).read_to_string(&mut text).unwrap();
    assert!(text.contains("jobs_total 3"));
}

#[tokio::test]
async fn scrape_serves_on_configured_path_only() {
    let handler = MetricsHandler::new(registry_with_jobs(), HandlerOptions::default());
    let state = Arc::new(AdminState::new(handler, "/prom"));

    let resp = build_admin_router(Arc::clone(&state))
        .oneshot(get_req("/prom"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = build_admin_router(state)
        .oneshot(get_req("/metrics"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Error policies ────────────────────────────────────────────

#[tokio::test]
async fn gather_error_becomes_500_with_message() {
    let app = build_admin_router(failing_state(ErrorHandling::HttpError));
    let resp = app.oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get("content-type").is_none());
    let body = body_text(resp).await;
    assert!(body.starts_with("An error has occurred during metrics gathering"));
    assert!(body.contains("collector \"disk\" failed"));
}

#[tokio::test]
async fn panic_policy_is_recovered_as_500() {
    let state = failing_state(ErrorHandling::Panic);

    let resp = build_admin_router(Arc::clone(&state))
        .oneshot(get_req("/metrics"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(resp).await;
    assert_eq!(body, "An error has occurred while serving metrics");
    assert!(!body.contains("disk"));
    assert_eq!(state.handler.pool().outstanding(), 0);

    // The endpoint keeps serving after a panic.
    let resp = build_admin_router(state)
        .oneshot(get_req("/health"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ── Instrumentation ───────────────────────────────────────────

#[tokio::test]
async fn instrumentation_counts_scrapes_by_status() {
    let registry = registry_with_jobs();
    let metrics = HandlerMetrics::register(&registry).unwrap();
    let handler = MetricsHandler::new(registry, HandlerOptions::default());
    let state = Arc::new(AdminState::new(handler, "/metrics").with_metrics(metrics.clone()));

    let first = build_admin_router(Arc::clone(&state))
        .oneshot(get_req("/metrics"))
        .await
        .unwrap();
    // The scrape sees itself in flight.
    assert!(body_text(first).await.contains("vitrine_exposition_requests_in_flight 1"));

    let second = build_admin_router(Arc::clone(&state))
        .oneshot(get_req("/metrics"))
        .await
        .unwrap();
    let text = body_text(second).await;
    assert!(text.contains(r#"vitrine_exposition_requests_total{code="200"} 1"#));

    assert_eq!(metrics.requests(200), 2);
    assert_eq!(metrics.in_flight(), 0);
}

#[tokio::test]
async fn instrumentation_counts_failures() {
    let registry = Registry::new();
    let metrics = HandlerMetrics::register(&registry).unwrap();
    let gatherer = GatherFn(|| Snapshot::failed(GatherError::new("down")));
    let handler = MetricsHandler::new(gatherer, HandlerOptions::default());
    let state = Arc::new(AdminState::new(handler, "/metrics").with_metrics(metrics.clone()));

    let resp = build_admin_router(state)
        .oneshot(get_req("/metrics"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(metrics.requests(500), 1);
    assert_eq!(metrics.in_flight(), 0);
}
