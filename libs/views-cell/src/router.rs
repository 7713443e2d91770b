use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn views_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/api/views/visit-details", get(visit_details))
        .route("/api/views/patient-financials", get(patient_financials))
        .route("/api/views/staff-workload", get(staff_workload))
        .route("/api/views/clinic-schedule", get(clinic_schedule))
        .route("/api/views/patient-history", get(patient_history))
        .route("/api/views/summary", get(views_summary))
        .route("/api/views/status", get(views_status))
        .route("/api/views/recreate", post(recreate_views))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
