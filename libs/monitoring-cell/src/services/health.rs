use std::time::Instant;

use tracing::{error, instrument};

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{HealthReport, HealthStatus, MonitoringError};

pub struct HealthMonitorService {
    start_time: Instant,
    client: StoreClient,
}

impl HealthMonitorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            start_time: Instant::now(),
            client: StoreClient::new(config),
        }
    }

    /// Ping the document store.
    #[instrument(skip(self))]
    pub async fn check(&self) -> Result<HealthReport, MonitoringError> {
        let started = Instant::now();

        self.client.ping().await.map_err(|e| {
            error!("Health check failed: {}", e);
            MonitoringError::DatabaseUnreachable(e.to_string())
        })?;

        Ok(HealthReport {
            status: HealthStatus::Healthy,
            database: "connected".to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            response_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
