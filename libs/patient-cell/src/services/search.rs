use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::Repository;

use crate::models::{Patient, PatientNameQuery};

pub struct PatientSearchService {
    patients: Repository<Patient>,
}

impl PatientSearchService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            patients: Repository::new(config),
        }
    }

    /// `None` when neither name was supplied.
    pub fn name_filter(query: &PatientNameQuery) -> Option<Value> {
        let mut filter = Map::new();
        let fields = [("first_name", &query.first_name), ("last_name", &query.last_name)];
        for (field, value) in fields {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                filter.insert(
                    field.to_string(),
                    json!({ "$regex": regex::escape(value), "$options": "i" }),
                );
            }
        }
        (!filter.is_empty()).then(|| Value::Object(filter))
    }

    pub async fn search_by_name(&self, filter: Value) -> Result<Vec<Patient>> {
        debug!("Searching patients with {}", filter);
        self.patients.find_by(filter).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn filter_needs_a_name() {
        assert_matches!(PatientSearchService::name_filter(&PatientNameQuery::default()), None);
        let blank = PatientNameQuery { first_name: Some("  ".into()), last_name: None };
        assert_matches!(PatientSearchService::name_filter(&blank), None);
    }

    #[test]
    fn filter_escapes_and_ignores_case() {
        let query = PatientNameQuery { first_name: None, last_name: Some("O'Neil (Jr.)".into()) };
        let filter = PatientSearchService::name_filter(&query).unwrap();
        assert_eq!(filter, json!({ "last_name": { "$regex": r"O'Neil \(Jr\.\)", "$options": "i" } }));
    }
}
