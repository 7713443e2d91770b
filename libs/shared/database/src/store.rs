use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;

use crate::data_api::DataApi;
use crate::mongo::MongoStore;

pub const HEALTH_COLLECTION: &str = "_health";

/// Options for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Value>,
    pub sort: Option<Value>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl FindOptions {
    pub fn sorted(sort: Value) -> Self {
        Self {
            sort: Some(sort),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    #[serde(default)]
    pub matched_count: u64,
    #[serde(default)]
    pub modified_count: u64,
    #[serde(default)]
    pub upserted_id: Option<Value>,
}

#[derive(Clone)]
enum Backend {
    Mongo(MongoStore),
    DataApi(DataApi),
    Unconfigured,
}

/// Handle on the clinic's document store.
///
/// `MONGO_URI` selects the MongoDB driver; without it the HTTP Data API at
/// `DATA_API_URL` is used. Filters, updates and pipelines are plain JSON with
/// Extended JSON literals (`{"$date": ..}`); every returned document is
/// sanitized.
#[derive(Clone)]
pub struct StoreClient {
    backend: Backend,
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match &$self.backend {
            Backend::Mongo($store) => $call.await,
            Backend::DataApi($store) => $call.await,
            Backend::Unconfigured => Err(anyhow!("Document store is not configured")),
        }
    };
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        let backend = if !config.mongo_uri.is_empty() {
            Backend::Mongo(MongoStore::new(&config.mongo_uri, &config.database))
        } else if !config.data_api_url.is_empty() {
            Backend::DataApi(DataApi::new(config))
        } else {
            Backend::Unconfigured
        };
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Mongo(_) => "mongodb",
            Backend::DataApi(_) => "data-api",
            Backend::Unconfigured => "unconfigured",
        }
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Value,
        options: FindOptions,
    ) -> Result<Vec<Value>> {
        dispatch!(self, store => store.find(collection, filter, options))
    }

    pub async fn find_one(&self, collection: &str, filter: Value) -> Result<Option<Value>> {
        dispatch!(self, store => store.find_one(collection, filter))
    }

    pub async fn insert_one(&self, collection: &str, document: Value) -> Result<()> {
        dispatch!(self, store => store.insert_one(collection, document))
    }

    pub async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        dispatch!(self, store => store.insert_many(collection, documents))
    }

    pub async fn update_one(
        &self,
        collection: &str,
        filter: Value,
        update: Value,
        upsert: bool,
    ) -> Result<UpdateResult> {
        dispatch!(self, store => store.update_one(collection, filter, update, upsert))
    }

    pub async fn delete_one(&self, collection: &str, filter: Value) -> Result<u64> {
        dispatch!(self, store => store.delete_one(collection, filter))
    }

    pub async fn delete_many(&self, collection: &str, filter: Value) -> Result<u64> {
        dispatch!(self, store => store.delete_many(collection, filter))
    }

    pub async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>> {
        dispatch!(self, store => store.aggregate(collection, pipeline))
    }

    pub async fn count(&self, collection: &str, filter: Value) -> Result<u64> {
        let rows = self
            .aggregate(
                collection,
                vec![json!({ "$match": filter }), json!({ "$count": "count" })],
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    pub async fn ping(&self) -> Result<()> {
        dispatch!(self, store => store.ping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mongo_uri: &str, data_api_url: &str) -> AppConfig {
        AppConfig {
            mongo_uri: mongo_uri.to_string(),
            data_api_url: data_api_url.to_string(),
            data_api_key: "key".to_string(),
            data_source: "Cluster0".to_string(),
            database: "GlenmoreWellnessDB".to_string(),
            jwt_secret: String::new(),
            port: 8000,
            view_refresh_interval_secs: 0,
        }
    }

    #[test]
    fn update_result_carries_upserted_id() {
        let result: UpdateResult = serde_json::from_value(json!({
            "matchedCount": 0,
            "modifiedCount": 0,
            "upsertedId": "view_meta-1"
        }))
        .unwrap();

        let kept = result.clone();
        assert_eq!(result.matched_count, 0);
        assert_eq!(kept.upserted_id, Some(json!("view_meta-1")));
    }

    #[test]
    fn mongo_uri_takes_precedence() {
        let client = StoreClient::new(&config("mongodb://localhost:27017", "http://localhost:9000"));
        assert_eq!(client.backend_name(), "mongodb");
    }

    #[test]
    fn data_api_used_without_mongo_uri() {
        assert_eq!(StoreClient::new(&config("", "http://localhost:9000")).backend_name(), "data-api");
        assert_eq!(StoreClient::new(&config("", "")).backend_name(), "unconfigured");
    }

    #[tokio::test]
    async fn unconfigured_store_refuses_calls() {
        let client = StoreClient::new(&config("", ""));
        let err = client.ping().await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
        assert_eq!(client.insert_many("Patient", vec![]).await.unwrap(), 0);
    }
}
