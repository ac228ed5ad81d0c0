//! Integration tests for the controller API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rightsizing_controller::api::{create_router, AppState};
use rightsizing_lib::{
    health::components, Error, HealthRegistry, RightSizingMetrics, StoreError, ValidationError,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = RightSizingMetrics::new();
    let state = Arc::new(AppState::new(health_registry, metrics));
    let router = create_router(state.clone());

    (router, state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_store_degraded() {
    let (app, state) = setup_test_app().await;

    let failed: Result<(), Error> = Err(Error::Store {
        action: "get",
        resource: "ConfigMap obs/rs-namespace-config".to_string(),
        source: StoreError::Backend("connection refused".to_string()),
    });
    state
        .health_registry
        .record_attempt(components::NAMESPACE, &failed)
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["resource_store"]["status"], "degraded");
}

#[tokio::test]
async fn test_invalid_configuration_fails_readiness_not_liveness() {
    let (app, state) = setup_test_app().await;

    let failed: Result<(), Error> = Err(Error::Validation(ValidationError::ConflictingLabelFilter {
        label: "label_env".to_string(),
    }));
    state
        .health_registry
        .record_attempt(components::VIRTUALIZATION, &failed)
        .await;

    state.health_registry.set_ready(true).await;

    let (status, health) = get_json(app.clone(), "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "unhealthy");
    assert!(health["components"]["virtualization"]["message"]
        .as_str()
        .unwrap()
        .contains("label_env"));

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_503_before_first_pass() {
    let (app, _state) = setup_test_app().await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_returns_503_when_ready_but_unhealthy() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;
    state
        .health_registry
        .set_unhealthy(components::NAMESPACE, "Conflicting namespace filter")
        .await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["reason"], "Unhealthy components: namespace");
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_reconcile_latency("namespace", 0.01);
    state.metrics.inc_reconciliations("namespace", "activated");
    state.metrics.set_component_enabled("namespace", true);
    state.metrics.set_rule_records("namespace", 28);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("rightsizing_reconcile_latency_seconds_bucket"));
    assert!(metrics_text.contains("rightsizing_reconciliations_total"));
    assert!(metrics_text.contains("rightsizing_component_enabled"));
    assert!(metrics_text.contains("rightsizing_rule_records"));
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _state) = setup_test_app().await;

    let (_, health) = get_json(app, "/healthz").await;

    assert!(health["components"].is_object());
    for name in components::ALL {
        assert!(health["components"][name].is_object());
    }
}
