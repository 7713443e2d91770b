pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{HealthReport, HealthStatus, MonitoringError};
pub use router::monitoring_routes;
pub use services::HealthMonitorService;
