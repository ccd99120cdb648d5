//! Integration tests for observability
//!
//! Metrics recorded through the public API must show up on the
//! `/metrics` endpoint, and readiness must follow the checker.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use piishield_observability::{
    ComponentStatus, HealthState, Metrics, Outcome, ReadinessChecker, health_router,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower::ServiceExt;

struct ToggleChecker {
    ready: AtomicBool,
}

impl ReadinessChecker for ToggleChecker {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn component_statuses(&self) -> Vec<ComponentStatus> {
        vec![ComponentStatus {
            name: "pattern_registry".to_string(),
            status: if self.is_ready() { "loaded" } else { "loading" }.to_string(),
            detail: None,
        }]
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_metrics_exposed_on_endpoint() {
    let metrics = Arc::new(Metrics::new().unwrap());
    metrics.set_patterns_loaded(12);
    metrics.record_request("detect", Outcome::Success, 0.004);
    metrics.record_request("batch", Outcome::Timeout, 30.0);
    metrics.record_detections([("SSN", 1), ("EMAIL", 2)]);
    metrics.record_text_size(36);

    let app = health_router(HealthState::new(metrics));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("piishield_requests_total"));
    assert!(body.contains("outcome=\"timeout\""));
    assert!(body.contains("piishield_detections_total{pii_type=\"EMAIL\"} 2"));
    assert!(body.contains("piishield_patterns_loaded 12"));
    assert!(body.contains("piishield_text_size_bytes_count 1"));
}

#[tokio::test]
async fn test_readiness_follows_checker() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let checker = Arc::new(ToggleChecker {
        ready: AtomicBool::new(false),
    });
    let state = HealthState::with_readiness_checker(metrics, checker.clone());

    let response = health_router(state.clone())
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_string(response).await.contains("\"loading\""));

    checker.ready.store(true, Ordering::SeqCst);

    let response = health_router(state)
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("\"loaded\""));
}
