use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_database::Record;
use shared_models::error::AppError;

use crate::models::{
    AddInvoiceLineRequest, CreatePaymentRequest, Invoice, InvoiceLine, InvoiceListQuery,
    InvoiceSummary, Payment, StatusUpdate,
};
use crate::services::{InvoiceService, PaymentService};

// ==============================================================================
// INVOICES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_invoices(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = InvoiceService::new(&config).list(&query).await?;
    Ok(Json(invoices))
}

#[axum::debug_handler]
pub async fn get_patient_invoices(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = InvoiceService::new(&config).for_patient(patient_id).await?;
    Ok(Json(invoices))
}

#[axum::debug_handler]
pub async fn update_invoice_status(
    State(config): State<Arc<AppConfig>>,
    Path(invoice_id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = InvoiceService::new(&config)
        .set_status(invoice_id, update.status)
        .await?;
    Ok(Json(invoice))
}

#[axum::debug_handler]
pub async fn get_invoice_summary(
    State(config): State<Arc<AppConfig>>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<InvoiceSummary>, AppError> {
    let summary = InvoiceService::new(&config).summary(invoice_id).await?;
    Ok(Json(summary))
}

// ==============================================================================
// INVOICE LINES
// ==============================================================================

#[axum::debug_handler]
pub async fn add_invoice_line(
    State(config): State<Arc<AppConfig>>,
    Path(invoice_id): Path<i64>,
    Json(request): Json<AddInvoiceLineRequest>,
) -> Result<(StatusCode, Json<InvoiceLine>), AppError> {
    request.validate().map_err(AppError::BadRequest)?;
    let line = InvoiceService::new(&config).add_line(invoice_id, request).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

#[axum::debug_handler]
pub async fn get_invoice_lines(
    State(config): State<Arc<AppConfig>>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<Vec<InvoiceLine>>, AppError> {
    let lines = InvoiceService::new(&config).lines(invoice_id).await?;
    Ok(Json(lines))
}

#[axum::debug_handler]
pub async fn delete_invoice_line(
    State(config): State<Arc<AppConfig>>,
    Path((invoice_id, line_no)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    InvoiceService::new(&config)
        .delete_line(invoice_id, line_no)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_payment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    Payment::validate(&request).map_err(AppError::BadRequest)?;
    let payment = PaymentService::new(&config).record(request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[axum::debug_handler]
pub async fn delete_payment(
    State(config): State<Arc<AppConfig>>,
    Path(payment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    PaymentService::new(&config).remove(payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_patient_payments(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = PaymentService::new(&config).for_patient(patient_id).await?;
    Ok(Json(payments))
}

#[axum::debug_handler]
pub async fn get_invoice_payments(
    State(config): State<Arc<AppConfig>>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = PaymentService::new(&config).for_invoice(invoice_id).await?;
    Ok(Json(payments))
}
