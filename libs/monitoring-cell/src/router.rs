use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers::{health_check, root};
use crate::services::HealthMonitorService;

/// Public routes; no authentication.
pub fn monitoring_routes(config: Arc<AppConfig>) -> Router {
    let service = Arc::new(HealthMonitorService::new(&config));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(service)
}
