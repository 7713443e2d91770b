//! MongoDB driver backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{anyhow, Result};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    Client, Collection,
};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::ejson::sanitize;
use crate::store::{FindOptions, UpdateResult};

type SharedClient = Arc<OnceCell<Client>>;

/// One driver client per URI for the whole process. The driver pools its
/// own connections, so handles built per request share it.
fn shared_client(uri: &str) -> SharedClient {
    static CLIENTS: OnceLock<Mutex<HashMap<String, SharedClient>>> = OnceLock::new();
    let mut clients = CLIENTS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    clients.entry(uri.to_string()).or_default().clone()
}

/// Parse relaxed or canonical Extended JSON into a BSON document.
pub fn to_document(value: Value) -> Result<Document> {
    match Bson::try_from(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(anyhow!("Expected a document, got {:?}", other.element_type())),
    }
}

/// Render a BSON document as sanitized plain JSON.
pub fn from_document(document: Document) -> Value {
    sanitize(Bson::Document(document).into_relaxed_extjson())
}

fn to_documents(values: Vec<Value>) -> Result<Vec<Document>> {
    values.into_iter().map(to_document).collect()
}

#[derive(Clone)]
pub struct MongoStore {
    uri: String,
    database: String,
    client: SharedClient,
}

impl MongoStore {
    /// Does not connect; the first operation does.
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            client: shared_client(uri),
        }
    }

    async fn client(&self) -> Result<&Client> {
        let client = self
            .client
            .get_or_try_init(|| async {
                info!("Connecting to MongoDB database {}", self.database);
                Client::with_uri_str(&self.uri).await
            })
            .await?;
        Ok(client)
    }

    async fn collection(&self, name: &str) -> Result<Collection<Document>> {
        Ok(self.client().await?.database(&self.database).collection(name))
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Value,
        options: FindOptions,
    ) -> Result<Vec<Value>> {
        debug!("MongoDB find on {}", collection);
        let collection = self.collection(collection).await?;

        let mut find = collection.find(to_document(filter)?);
        if let Some(projection) = options.projection {
            find = find.projection(to_document(projection)?);
        }
        if let Some(sort) = options.sort {
            find = find.sort(to_document(sort)?);
        }
        if let Some(limit) = options.limit {
            find = find.limit(limit);
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }

        let documents: Vec<Document> = find.await?.try_collect().await?;
        Ok(documents.into_iter().map(from_document).collect())
    }

    pub async fn find_one(&self, collection: &str, filter: Value) -> Result<Option<Value>> {
        debug!("MongoDB findOne on {}", collection);
        let document = self
            .collection(collection)
            .await?
            .find_one(to_document(filter)?)
            .await?;
        Ok(document.map(from_document))
    }

    pub async fn insert_one(&self, collection: &str, document: Value) -> Result<()> {
        debug!("MongoDB insertOne on {}", collection);
        self.collection(collection)
            .await?
            .insert_one(to_document(document)?)
            .await?;
        Ok(())
    }

    pub async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
        debug!("MongoDB insertMany of {} on {}", documents.len(), collection);
        let result = self
            .collection(collection)
            .await?
            .insert_many(to_documents(documents)?)
            .await?;
        Ok(result.inserted_ids.len())
    }

    pub async fn update_one(
        &self,
        collection: &str,
        filter: Value,
        update: Value,
        upsert: bool,
    ) -> Result<UpdateResult> {
        debug!("MongoDB updateOne on {}", collection);
        let result = self
            .collection(collection)
            .await?
            .update_one(to_document(filter)?, to_document(update)?)
            .upsert(upsert)
            .await?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(|id| sanitize(id.into_relaxed_extjson())),
        })
    }

    pub async fn delete_one(&self, collection: &str, filter: Value) -> Result<u64> {
        debug!("MongoDB deleteOne on {}", collection);
        let result = self
            .collection(collection)
            .await?
            .delete_one(to_document(filter)?)
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn delete_many(&self, collection: &str, filter: Value) -> Result<u64> {
        debug!("MongoDB deleteMany on {}", collection);
        let result = self
            .collection(collection)
            .await?
            .delete_many(to_document(filter)?)
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>> {
        debug!("MongoDB aggregate on {}", collection);
        let documents: Vec<Document> = self
            .collection(collection)
            .await?
            .aggregate(to_documents(pipeline)?)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(from_document).collect())
    }

    pub async fn ping(&self) -> Result<()> {
        self.client()
            .await?
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{oid::ObjectId, DateTime};
    use serde_json::json;

    use super::*;

    #[test]
    fn date_literals_become_bson_dates() {
        let filter = to_document(json!({
            "invoice_date": { "$gte": { "$date": "2024-05-01T00:00:00.000Z" } },
            "patient_id": 7
        }))
        .unwrap();

        let bound = filter.get_document("invoice_date").unwrap().get("$gte").unwrap();
        assert_eq!(
            bound,
            &Bson::DateTime(DateTime::parse_rfc3339_str("2024-05-01T00:00:00Z").unwrap())
        );
        assert!(matches!(filter.get("patient_id"), Some(Bson::Int32(7)) | Some(Bson::Int64(7))));
    }

    #[test]
    fn non_documents_are_rejected() {
        assert!(to_document(json!([1, 2])).is_err());
    }

    #[test]
    fn documents_come_back_sanitized() {
        let at = DateTime::parse_rfc3339_str("2024-05-01T08:30:00Z").unwrap();
        let value = from_document(doc! {
            "_id": ObjectId::new(),
            "payment_id": 12_i64,
            "amount": 40.5,
            "payment_date": at,
        });

        assert!(value.get("_id").is_none());
        assert_eq!(value["payment_id"], 12);
        assert_eq!(value["amount"], 40.5);
        assert!(value["payment_date"].as_str().unwrap().starts_with("2024-05-01T08:30:00"));
    }

    #[test]
    fn handles_share_one_client_per_uri() {
        let a = MongoStore::new("mongodb://localhost:27017", "GlenmoreWellnessDB");
        let b = MongoStore::new("mongodb://localhost:27017", "GlenmoreWellnessDB");
        let c = MongoStore::new("mongodb://localhost:27018", "GlenmoreWellnessDB");
        assert!(Arc::ptr_eq(&a.client, &b.client));
        assert!(!Arc::ptr_eq(&a.client, &c.client));
    }

    #[tokio::test]
    async fn ping_fails_when_no_server_answers() {
        let store = MongoStore::new(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
            "GlenmoreWellnessDB",
        );
        assert!(store.ping().await.is_err());
    }
}
