// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const SERVICE_NAME: &str = "SW Glenmore Wellness Clinic API";
pub const SERVICE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBanner {
    pub message: String,
    pub version: String,
    pub status: String,
}

impl Default for ServiceBanner {
    fn default() -> Self {
        Self {
            message: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            status: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: String,
    pub uptime_seconds: u64,
    pub response_time_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    #[error("{0}")]
    DatabaseUnreachable(String),
}

impl IntoResponse for MonitoringError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": HealthStatus::Unhealthy,
            "error": self.to_string(),
        }));
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}
