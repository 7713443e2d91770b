use anyhow::Result;
use serde_json::json;

use shared_config::AppConfig;
use shared_database::{repository::to_document, Repository};

use crate::models::{CreateAssignmentRequest, StaffAssignment, UpdateAssignmentRequest};

pub struct CoverageService {
    assignments: Repository<StaffAssignment>,
}

impl CoverageService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            assignments: Repository::new(config),
        }
    }

    pub async fn all(&self) -> Result<Vec<StaffAssignment>> {
        self.assignments
            .find_sorted(json!({}), json!({ "day_of_week": 1, "shift": 1, "assignment_id": 1 }), None)
            .await
    }

    pub async fn create(&self, request: CreateAssignmentRequest) -> Result<StaffAssignment> {
        self.assignments.create(request).await
    }

    pub async fn update(
        &self,
        assignment_id: i64,
        request: &UpdateAssignmentRequest,
    ) -> Result<Option<StaffAssignment>> {
        let fields = to_document(request)?;
        if fields.is_empty() {
            return self.assignments.get(assignment_id).await;
        }
        self.assignments.update_fields(assignment_id, fields).await
    }

    pub async fn delete(&self, assignment_id: i64) -> Result<bool> {
        self.assignments.delete(assignment_id).await
    }
}
