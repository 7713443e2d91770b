use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use monitoring_cell::{monitoring_routes, HealthMonitorService, HealthStatus, MonitoringError};
use shared_utils::test_utils::{DataApiMock, TestConfig};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_reports_the_service() {
    let server = MockServer::start().await;
    let app = monitoring_routes(TestConfig::for_server(&server).to_arc());

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "SW Glenmore Wellness Clinic API", "version": "1.0.0", "status": "active" })
    );
}

#[tokio::test]
async fn health_is_ok_when_the_store_answers() {
    let server = MockServer::start().await;
    DataApiMock::respond(&server, "findOne", "_health", json!({ "document": null })).await;
    let app = monitoring_routes(TestConfig::for_server(&server).to_arc());

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn health_is_unavailable_when_the_store_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/action/findOne"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;
    let app = monitoring_routes(TestConfig::for_server(&server).to_arc());

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("Authentication error"));
}

#[tokio::test]
async fn unconfigured_store_is_unhealthy() {
    let mut config = TestConfig::default().to_app_config();
    config.data_api_url = String::new();

    let result = HealthMonitorService::new(&config).check().await;

    assert_matches!(result, Err(MonitoringError::DatabaseUnreachable(message)) if message.contains("not configured"));
}

#[tokio::test]
async fn healthy_report_serializes_lowercase() {
    assert_eq!(serde_json::to_value(HealthStatus::Healthy).unwrap(), json!("healthy"));
}
