use std::sync::Arc;

use axum::{middleware, routing::{get, post, put}, Router};

use shared_config::AppConfig;
use shared_utils::{
    crud::{create_record, item_routes},
    extractor::auth_middleware,
};

use crate::handlers::*;
use crate::models::Staff;

pub fn staff_routes(config: Arc<AppConfig>) -> Router {
    item_routes::<Staff>("/staff")
        .route("/staff", post(create_record::<Staff>).get(list_staff))
        .route("/staff/{id}/deactivate", put(deactivate_staff))
        .route("/schedules/shifts", post(create_shift))
        .route("/schedules/daily-master", get(daily_master_schedule))
        .route("/staff_assignments", get(list_assignments))
        .route("/staff_assignment", post(create_assignment))
        .route("/staff_assignment/{id}", put(update_assignment).delete(delete_assignment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
