use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use patient_cell::patient_routes;
use shared_utils::test_utils::{DataApiMock, TestConfig};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn jane() -> Value {
    json!({
        "patient_id": 1,
        "first_name": "Jane",
        "last_name": "Smith",
        "date_of_birth": { "$date": "1990-03-20T00:00:00Z" },
        "phone": "403-555-0199",
        "email": "jane.smith@example.com",
        "gov_card_no": "GOV123456",
        "insurance_no": "INS987654"
    })
}

#[tokio::test]
async fn search_requires_a_name() {
    let server = MockServer::start().await;
    let app = patient_routes(TestConfig::for_server(&server).to_arc());

    let request = Request::builder()
        .uri("/patients/search/by-name")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_matches_case_insensitively() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "Patient",
        json!({ "filter": { "first_name": { "$regex": "jan", "$options": "i" } } }),
        json!({ "documents": [jane()] }),
    )
    .await;

    let app = patient_routes(TestConfig::for_server(&server).to_arc());
    let request = Request::builder()
        .uri("/patients/search/by-name?first_name=jan")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["last_name"], "Smith");
    assert_eq!(body[0]["date_of_birth"], "1990-03-20");
}

#[tokio::test]
async fn create_patient_assigns_next_id() {
    let server = MockServer::start().await;
    DataApiMock::max_id(&server, "Patient", 0).await;
    DataApiMock::accept_inserts(&server, "Patient").await;

    let app = patient_routes(TestConfig::for_server(&server).to_arc());
    let request = Request::builder()
        .method("POST")
        .uri("/patients")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "first_name": "Jane",
                "last_name": "Smith",
                "date_of_birth": "1990-03-20",
                "phone": "403-555-0199"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["patient_id"], 1);
    assert_eq!(body["email"], Value::Null);
}

#[tokio::test]
async fn get_patient_by_id() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "findOne",
        "Patient",
        json!({ "filter": { "patient_id": 1 } }),
        json!({ "document": jane() }),
    )
    .await;

    let app = patient_routes(TestConfig::for_server(&server).to_arc());
    let request = Request::builder().uri("/patients/1").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["gov_card_no"], "GOV123456");
}
