use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use shared_utils::test_utils::{DataApiMock, JwtTestUtils, TestConfig, TestUser};
use views_cell::views_routes;

fn app(server: &MockServer) -> Router {
    views_routes(TestConfig::for_server(server).to_arc())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn recreate() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/views/recreate")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn visit_details_rejects_non_numeric_ids() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get("/api/views/visit-details?patient_id=seven"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid patient_id");
}

#[tokio::test]
async fn visit_details_forwards_filters() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "visit_complete_details",
        json!({
            "filter": {
                "patient_id": 7,
                "start_time": { "$gte": "2024-05-01T00:00:00", "$lt": "2024-06-01T00:00:00" }
            },
            "limit": 100
        }),
        json!({ "documents": [
            { "visit_id": 12, "patient_id": 7, "visit_status": "Completed", "patient_name": "Jane Smith" }
        ] }),
    )
    .await;

    let response = app(&server)
        .oneshot(get(
            "/api/views/visit-details?patient_id=7&start_date=2024-05-01&end_date=2024-05-31",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["visit_id"], 12);
    assert_eq!(body["filters_applied"]["patient_id"], "7");
    assert_eq!(body["filters_applied"]["status"], Value::Null);
}

#[tokio::test]
async fn clinic_schedule_rejects_bad_date() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(get("/api/views/clinic-schedule?date=06/05/2024"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid date format. Use ISO format (YYYY-MM-DD)"
    );
}

#[tokio::test]
async fn clinic_schedule_summarizes_the_day() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "daily_clinic_schedule",
        json!({
            "filter": {
                "scheduled_start": { "$gte": "2024-05-06T00:00:00", "$lt": "2024-05-07T00:00:00" }
            }
        }),
        json!({ "documents": [
            { "appointment_id": 1, "patient_id": 3, "staff_id": 1, "appointment_type": "Scheduled" },
            { "appointment_id": 2, "patient_id": 4, "staff_id": 1, "appointment_type": "Walk-in" },
            { "appointment_id": 3, "patient_id": 3, "staff_id": 2, "appointment_type": "Scheduled" }
        ] }),
    )
    .await;

    let response = app(&server)
        .oneshot(get("/api/views/clinic-schedule?date=2024-05-06"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["date"], "2024-05-06");
    assert_eq!(body["count"], 3);
    assert_eq!(
        body["summary"],
        json!({
            "total_appointments": 3,
            "walk_ins": 1,
            "scheduled": 2,
            "unique_patients": 2,
            "unique_staff": 2
        })
    );
}

#[tokio::test]
async fn staff_workload_defaults_to_active_staff() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "staff_workload_analysis",
        json!({ "filter": { "active": true } }),
        json!({ "documents": [
            { "staff_id": 1, "workload_score": 9, "is_busy": true, "active_visits": 2, "total_appointments": 3 },
            { "staff_id": 2, "workload_score": 4, "is_busy": false, "active_visits": 0, "total_appointments": 1 }
        ] }),
    )
    .await;

    let response = app(&server)
        .oneshot(get("/api/views/staff-workload"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await["summary"].clone();
    assert_eq!(summary["total_staff"], 2);
    assert_eq!(summary["busy_staff"], 1);
    assert_eq!(summary["total_active_visits"], 2);
    assert_eq!(summary["avg_workload_score"], 6.5);
}

#[tokio::test]
async fn status_reports_each_view() {
    let server = MockServer::start().await;
    DataApiMock::documents(
        &server,
        "find",
        "view_meta",
        json!([
            { "view": "visit_complete_details", "document_count": 4, "refreshed_at": "2024-05-06T08:00:00" }
        ]),
    )
    .await;
    for view in [
        "visit_complete_details",
        "patient_financial_summary",
        "staff_workload_analysis",
        "daily_clinic_schedule",
        "patient_clinical_history",
    ] {
        let documents = if view == "visit_complete_details" {
            json!([{ "count": 4 }])
        } else {
            json!([])
        };
        DataApiMock::documents(&server, "aggregate", view, documents).await;
    }

    let response = app(&server).oneshot(get("/api/views/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["visit_complete_details"],
        json!({ "exists": true, "document_count": 4, "refreshed_at": "2024-05-06T08:00:00" })
    );
    assert_eq!(
        body["patient_clinical_history"],
        json!({ "exists": false, "document_count": 0, "refreshed_at": null })
    );
}

#[tokio::test]
async fn recreate_requires_admin() {
    let server = MockServer::start().await;
    let config = TestConfig::for_server(&server).with_jwt_secret("test-secret");
    let token = JwtTestUtils::create_test_token(&TestUser::staff("nurse@glenmore.test"), "test-secret", None);

    let request = Request::builder()
        .method("POST")
        .uri("/api/views/recreate")
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = views_routes(config.to_arc()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recreate_reports_failed_views() {
    let server = MockServer::start().await;
    // Staff is left unmocked so its view fails to build.
    for base in ["Visit", "Patient", "Appointment"] {
        DataApiMock::documents(&server, "aggregate", base, json!([])).await;
    }
    for view in [
        "visit_complete_details",
        "patient_financial_summary",
        "daily_clinic_schedule",
        "patient_clinical_history",
    ] {
        DataApiMock::deleted(&server, "deleteMany", view, 0).await;
    }
    DataApiMock::update_matched(&server, "view_meta", 1).await;

    let response = app(&server).oneshot(recreate()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Recreated 4/5 views");
    assert_eq!(body["results"]["staff_workload_analysis"], false);
    assert_eq!(body["results"]["daily_clinic_schedule"], true);
}

#[tokio::test]
async fn summary_combines_every_view() {
    let server = MockServer::start().await;
    DataApiMock::documents(
        &server,
        "aggregate",
        "visit_complete_details",
        json!([{ "_id": null, "total": 10, "active": 3 }]),
    )
    .await;
    DataApiMock::documents(
        &server,
        "aggregate",
        "patient_clinical_history",
        json!([{ "_id": null, "total": 6, "with_balance": 2, "needing_follow_up": 1 }]),
    )
    .await;
    DataApiMock::documents(
        &server,
        "aggregate",
        "staff_workload_analysis",
        json!([{ "_id": null, "total": 4, "active": 3, "busy": 2 }]),
    )
    .await;
    DataApiMock::documents(&server, "aggregate", "daily_clinic_schedule", json!([])).await;
    DataApiMock::documents(
        &server,
        "aggregate",
        "patient_financial_summary",
        json!([{ "_id": null, "total_outstanding": 120.5, "total_invoiced": 900.0, "total_paid": 779.5 }]),
    )
    .await;

    let response = app(&server).oneshot(get("/api/views/summary")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["visits"], json!({ "total": 10, "active": 3, "completed": 7 }));
    assert_eq!(body["appointments"], json!({ "today": 0, "walk_ins": 0, "scheduled": 0 }));
    assert_eq!(body["financials"]["total_outstanding"], 120.5);
    assert!(body["timestamp"].is_string());
}
