use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::{
    crud::{delete_record, get_record, list_records},
    extractor::auth_middleware,
};

use crate::handlers::*;
use crate::models::Appointment;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments", post(create_appointment).get(list_records::<Appointment>))
        .route(
            "/appointments/{id}",
            get(get_record::<Appointment>)
                .put(update_appointment)
                .delete(delete_record::<Appointment>),
        )
        .route("/appointments/patient/{patient_id}", get(get_patient_appointments))
        .route("/appointments/staff/{staff_id}", get(get_staff_appointments))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
