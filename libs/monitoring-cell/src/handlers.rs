use std::sync::Arc;

use axum::{extract::State, Json};

use crate::models::{HealthReport, MonitoringError, ServiceBanner};
use crate::services::HealthMonitorService;

pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner::default())
}

pub async fn health_check(
    State(service): State<Arc<HealthMonitorService>>,
) -> Result<Json<HealthReport>, MonitoringError> {
    Ok(Json(service.check().await?))
}
