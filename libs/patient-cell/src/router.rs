use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::{crud::crud_routes, extractor::auth_middleware};

use crate::handlers::*;
use crate::models::Patient;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    crud_routes::<Patient>("/patients")
        .route("/patients/search/by-name", get(search_patients_by_name))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
