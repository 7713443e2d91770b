use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn reporting_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/statements/monthly", get(monthly_statements))
        .route("/reports/outstanding-balances", get(outstanding_balances))
        .route("/reports/monthly-activity", get(monthly_activity))
        .route("/reports/daily-delivery-log", get(daily_delivery_log))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
