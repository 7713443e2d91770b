use std::sync::Arc;

use axum::Router;

use appointment_cell::appointment_routes;
use billing_cell::billing_routes;
use clinical_cell::clinical_routes;
use monitoring_cell::monitoring_routes;
use patient_cell::patient_routes;
use reporting_cell::reporting_routes;
use shared_config::AppConfig;
use staff_cell::staff_routes;
use views_cell::views_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(monitoring_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(staff_routes(state.clone()))
        .merge(appointment_routes(state.clone()))
        .merge(clinical_routes(state.clone()))
        .merge(billing_routes(state.clone()))
        .merge(reporting_routes(state.clone()))
        .merge(views_routes(state))
}
