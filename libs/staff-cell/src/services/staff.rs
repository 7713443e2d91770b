use anyhow::Result;
use serde_json::{json, Map};
use tracing::info;

use shared_config::AppConfig;
use shared_database::Repository;

use crate::models::{Staff, StaffListQuery};

pub struct StaffService {
    staff: Repository<Staff>,
}

impl StaffService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            staff: Repository::new(config),
        }
    }

    pub async fn list(&self, query: &StaffListQuery) -> Result<Vec<Staff>> {
        let filter = if query.active_only.unwrap_or(false) {
            json!({ "active": true })
        } else {
            json!({})
        };
        let paging = query.paging();
        self.staff.list(filter, paging.skip(), paging.limit()).await
    }

    pub async fn deactivate(&self, staff_id: i64) -> Result<Option<Staff>> {
        let mut fields = Map::new();
        fields.insert("active".into(), json!(false));
        let staff = self.staff.update_fields(staff_id, fields).await?;
        if staff.is_some() {
            info!("Deactivated staff {}", staff_id);
        }
        Ok(staff)
    }
}
