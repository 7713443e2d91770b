use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use billing_cell::billing_routes;
use shared_utils::test_utils::{DataApiMock, TestConfig};

fn app(server: &MockServer) -> Router {
    billing_routes(TestConfig::for_server(server).to_arc())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn invoice(status: &str) -> Value {
    json!({
        "invoice_id": 7,
        "patient_id": 4,
        "invoice_date": "2024-05-02",
        "status": status,
        "total_amount": 150.0,
        "insurer_portion": 50.0,
        "patient_portion": 100.0
    })
}

#[tokio::test]
async fn create_invoice_derives_patient_portion() {
    let server = MockServer::start().await;
    DataApiMock::max_id(&server, "Invoice", 6).await;
    DataApiMock::accept_inserts(&server, "Invoice").await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/invoices",
            json!({ "patient_id": 4, "invoice_date": "2024-05-02", "total_amount": 150.0, "insurer_portion": 50.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["invoice_id"], 7);
    assert_eq!(body["patient_portion"], 100.0);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn insurer_portion_above_total_is_rejected() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/invoices",
            json!({ "patient_id": 4, "total_amount": 50.0, "insurer_portion": 80.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_filter_is_passed_through() {
    let server = MockServer::start().await;
    DataApiMock::respond_matching(
        &server,
        "find",
        "Invoice",
        json!({ "filter": { "status": "partial" } }),
        json!({ "documents": [invoice("partial")] }),
    )
    .await;

    let response = app(&server).oneshot(get("/invoices?status=partial")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await[0]["status"], "partial");
}

#[tokio::test]
async fn unknown_status_value_is_rejected() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(json_request("PUT", "/invoices/7/status", json!({ "status": "settled" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn line_number_is_allocated_per_invoice() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Invoice", invoice("pending")).await;
    DataApiMock::respond_matching(
        &server,
        "aggregate",
        "InvoiceLine",
        json!({ "pipeline": [ { "$match": { "invoice_id": 7 } } ] }),
        json!({ "documents": [ { "_id": null, "max_value": 2 } ] }),
    )
    .await;
    DataApiMock::accept_inserts(&server, "InvoiceLine").await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/invoices/7/lines",
            json!({ "description": "Consultation", "qty": 2, "unit_price": 37.5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["line_no"], 3);
    assert_eq!(body["line_total"], 75.0);
}

#[tokio::test]
async fn line_for_missing_invoice_is_404() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Invoice", Value::Null).await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/invoices/70/lines",
            json!({ "description": "Consultation", "qty": 1, "unit_price": 10 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Invoice not found");
}

#[tokio::test]
async fn missing_line_delete_is_404() {
    let server = MockServer::start().await;
    DataApiMock::deleted(&server, "deleteOne", "InvoiceLine", 0).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/invoices/7/lines/9")
        .body(Body::empty())
        .unwrap();
    let response = app(&server).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Invoice line not found");
}

fn payment(payment_id: i64, amount: f64) -> Value {
    json!({
        "payment_id": payment_id,
        "invoice_id": 7,
        "patient_id": 4,
        "amount": amount,
        "payment_date": "2024-05-03T09:00:00",
        "method": "card"
    })
}

async fn expect_status_update(server: &MockServer, status: Option<&str>, times: u64) {
    let update = match status {
        Some(status) => json!({ "collection": "Invoice", "update": { "$set": { "status": status } } }),
        None => json!({ "collection": "Invoice" }),
    };
    Mock::given(method("POST"))
        .and(path("/action/updateOne"))
        .and(body_partial_json(update))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matchedCount": 1, "modifiedCount": 1 })))
        .expect(times)
        .mount(server)
        .await;
}

async fn delete_payment_12(server: &MockServer) -> StatusCode {
    app(server)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/payments/12")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn deleting_only_payment_reopens_invoice() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Payment", payment(12, 100.0)).await;
    DataApiMock::deleted(&server, "deleteOne", "Payment", 1).await;
    DataApiMock::document(&server, "Invoice", invoice("paid")).await;
    DataApiMock::documents(&server, "find", "Payment", json!([])).await;
    expect_status_update(&server, Some("pending"), 1).await;

    assert_eq!(delete_payment_12(&server).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deleting_one_of_two_payments_leaves_invoice_partial() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Payment", payment(12, 60.0)).await;
    DataApiMock::deleted(&server, "deleteOne", "Payment", 1).await;
    DataApiMock::document(&server, "Invoice", invoice("paid")).await;
    DataApiMock::documents(&server, "find", "Payment", json!([payment(11, 40.0)])).await;
    expect_status_update(&server, Some("partial"), 1).await;

    assert_eq!(delete_payment_12(&server).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn payment_on_void_invoice_keeps_status() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Invoice", invoice("void")).await;
    DataApiMock::max_id(&server, "Payment", 11).await;
    DataApiMock::accept_inserts(&server, "Payment").await;
    DataApiMock::documents(&server, "find", "Payment", json!([payment(12, 100.0)])).await;
    expect_status_update(&server, None, 0).await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/payments",
            json!({ "invoice_id": 7, "patient_id": 4, "amount": 100.0, "payment_date": "2024-05-03T09:00:00", "method": "card" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn full_payment_marks_invoice_paid() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Invoice", invoice("pending")).await;
    DataApiMock::max_id(&server, "Payment", 11).await;
    DataApiMock::accept_inserts(&server, "Payment").await;
    DataApiMock::documents(
        &server,
        "find",
        "Payment",
        json!([{
            "payment_id": 12,
            "invoice_id": 7,
            "patient_id": 4,
            "amount": 100.0,
            "payment_date": "2024-05-03T09:00:00",
            "method": "card"
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/action/updateOne"))
        .and(body_partial_json(json!({
            "collection": "Invoice",
            "update": { "$set": { "status": "paid" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matchedCount": 1, "modifiedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/payments",
            json!({ "invoice_id": 7, "patient_id": 4, "amount": 100.0, "payment_date": "2024-05-03T09:00:00", "method": "card" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["payment_id"], 12);
}

#[tokio::test]
async fn non_positive_payment_is_rejected() {
    let server = MockServer::start().await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/payments",
            json!({ "invoice_id": 7, "patient_id": 4, "amount": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_for_other_patient_is_rejected() {
    let server = MockServer::start().await;
    DataApiMock::document(&server, "Invoice", invoice("pending")).await;

    let response = app(&server)
        .oneshot(json_request(
            "POST",
            "/payments",
            json!({ "invoice_id": 7, "patient_id": 5, "amount": 20.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invoice_summary_folds_lines() {
    let server = MockServer::start().await;
    DataApiMock::documents(
        &server,
        "aggregate",
        "Invoice",
        json!([{
            "invoice_id": 7,
            "patient_id": 4,
            "invoice_date": { "$date": "2024-05-02T00:00:00Z" },
            "status": "pending",
            "total_amount": 150.0,
            "insurer_portion": 50.0,
            "patient_portion": 100.0,
            "line_count": 1,
            "items": [ { "description": "Consultation", "qty": 2.0, "unit_price": 75.0, "line_total": 150.0 } ]
        }]),
    )
    .await;

    let response = app(&server).oneshot(get("/api/invoices/7/summary")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["line_count"], 1);
    assert_eq!(body["items"][0]["line_total"], 150.0);
    assert_eq!(body["invoice_date"], "2024-05-02");
}

#[tokio::test]
async fn summary_of_missing_invoice_is_404() {
    let server = MockServer::start().await;
    DataApiMock::documents(&server, "aggregate", "Invoice", json!([])).await;

    let response = app(&server).oneshot(get("/api/invoices/99/summary")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
