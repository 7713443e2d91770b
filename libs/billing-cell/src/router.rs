use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::{
    crud::{create_record, get_record, item_routes, list_records},
    extractor::auth_middleware,
};

use crate::handlers::*;
use crate::models::{Insurer, Invoice, Payment};

pub fn billing_routes(config: Arc<AppConfig>) -> Router {
    item_routes::<Invoice>("/invoices")
        .route("/invoices", post(create_record::<Invoice>).get(list_invoices))
        .route("/invoices/{id}/status", put(update_invoice_status))
        .route("/invoices/patient/{patient_id}", get(get_patient_invoices))
        .route("/invoices/{id}/lines", post(add_invoice_line).get(get_invoice_lines))
        .route("/invoices/{id}/lines/{line_no}", delete(delete_invoice_line))
        .route("/api/invoices/{id}/summary", get(get_invoice_summary))
        .route("/payments", post(create_payment).get(list_records::<Payment>))
        .route("/payments/{id}", get(get_record::<Payment>).delete(delete_payment))
        .route("/payments/patient/{patient_id}", get(get_patient_payments))
        .route("/payments/invoice/{invoice_id}", get(get_invoice_payments))
        .route("/insurers", post(create_record::<Insurer>).get(list_records::<Insurer>))
        .route("/insurers/{id}", get(get_record::<Insurer>))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
