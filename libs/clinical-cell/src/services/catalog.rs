use anyhow::Result;
use serde_json::json;

use shared_config::AppConfig;
use shared_database::Repository;

use crate::models::{Diagnosis, Drug};

pub struct CatalogService {
    config: AppConfig,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Diagnoses whose code starts with `code`, ignoring case.
    pub async fn diagnoses_by_code(&self, code: &str) -> Result<Vec<Diagnosis>> {
        let filter = json!({
            "code": { "$regex": format!("^{}", regex::escape(code.trim())), "$options": "i" }
        });
        Repository::<Diagnosis>::new(&self.config).find_by(filter).await
    }

    /// Drugs whose brand name contains `name`, ignoring case.
    pub async fn drugs_by_name(&self, name: &str) -> Result<Vec<Drug>> {
        let filter = json!({
            "brand_name": { "$regex": regex::escape(name.trim()), "$options": "i" }
        });
        Repository::<Drug>::new(&self.config).find_by(filter).await
    }
}
