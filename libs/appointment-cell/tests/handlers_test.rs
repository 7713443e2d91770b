use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use appointment_cell::appointment_routes;
use shared_utils::test_utils::{DataApiMock, TestConfig};

fn app(server: &MockServer) -> Router {
    appointment_routes(TestConfig::for_server(server).to_arc())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking(start: &str, end: &str, is_walkin: bool) -> Value {
    json!({
        "patient_id": 4,
        "staff_id": 2,
        "scheduled_start": start,
        "scheduled_end": end,
        "is_walkin": is_walkin
    })
}

#[tokio::test]
async fn end_before_start_is_rejected() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(post_json(
            "/appointments",
            booking("2024-05-06T10:10:00", "2024-05-06T10:00:00", false),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("scheduled_end must be after scheduled_start"));
}

#[tokio::test]
async fn overlapping_booking_conflicts() {
    let server = MockServer::start().await;
    DataApiMock::documents(
        &server,
        "find",
        "Appointment",
        json!([{
            "appointment_id": 9,
            "patient_id": 1,
            "staff_id": 2,
            "scheduled_start": { "$date": "2024-05-06T10:00:00Z" },
            "scheduled_end": { "$date": "2024-05-06T10:30:00Z" },
            "is_walkin": false,
            "status": "scheduled"
        }]),
    )
    .await;

    let response = app(&server)
        .oneshot(post_json(
            "/appointments",
            booking("2024-05-06T10:15:00", "2024-05-06T10:45:00", false),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn multi_day_booking_started_earlier_conflicts() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "Appointment",
        json!({
            "filter": { "$and": [
                { "staff_id": 2 },
                { "is_walkin": { "$ne": true } },
                { "$expr": { "$and": [
                    { "$lt": [
                        { "$convert": { "input": "$scheduled_start" } },
                        { "$date": "2024-05-06T10:45:00.000Z" }
                    ] },
                    { "$gt": [
                        { "$convert": { "input": "$scheduled_end" } },
                        { "$date": "2024-05-06T10:15:00.000Z" }
                    ] }
                ] } }
            ] }
        }),
        json!({ "documents": [{
            "appointment_id": 3,
            "patient_id": 1,
            "staff_id": 2,
            "scheduled_start": { "$date": "2024-05-04T08:00:00Z" },
            "scheduled_end": { "$date": "2024-05-07T08:00:00Z" },
            "is_walkin": false,
            "status": "scheduled"
        }] }),
    )
    .await;

    let response = app(&server)
        .oneshot(post_json(
            "/appointments",
            booking("2024-05-06T10:15:00", "2024-05-06T10:45:00", false),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("appointment 3"));
}

#[tokio::test]
async fn walkin_skips_conflict_check() {
    let server = MockServer::start().await;
    DataApiMock::max_id(&server, "Appointment", 9).await;
    DataApiMock::accept_inserts(&server, "Appointment").await;

    let response = app(&server)
        .oneshot(post_json(
            "/appointments",
            booking("2024-05-06T10:15:00", "2024-05-06T10:45:00", true),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["appointment_id"], 10);
    assert_eq!(body["is_walkin"], true);
}

#[tokio::test]
async fn staff_schedule_filters_by_day() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "Appointment",
        json!({ "filter": { "$and": [ { "staff_id": 2 } ] }, "sort": { "scheduled_start": 1 } }),
        json!({ "documents": [] }),
    )
    .await;

    let request = Request::builder()
        .uri("/appointments/staff/2?date=2024-05-06")
        .body(Body::empty())
        .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn bad_staff_date_is_rejected() {
    let server = MockServer::start().await;

    let request = Request::builder()
        .uri("/appointments/staff/2?date=06-05-2024")
        .body(Body::empty())
        .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
