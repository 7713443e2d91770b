use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use shared_config::AppConfig;

use crate::store::{FindOptions, StoreClient};

/// A document kept in its own collection under an integer key.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const ID_FIELD: &'static str;
    /// Human readable name used in error messages ("Patient not found").
    const LABEL: &'static str;

    type Create: DeserializeOwned + Send + 'static;

    fn from_create(id: i64, request: Self::Create) -> Self;

    fn id(&self) -> i64;

    fn validate(_request: &Self::Create) -> Result<(), String> {
        Ok(())
    }
}

pub struct Repository<T: Record> {
    client: StoreClient,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(StoreClient::new(config))
    }

    pub fn with_client(client: StoreClient) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }

    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    fn id_filter(id: i64) -> Value {
        json!({ T::ID_FIELD: id })
    }

    pub async fn next_id(&self) -> Result<i64> {
        next_sequence(&self.client, T::COLLECTION, T::ID_FIELD, json!({})).await
    }

    #[instrument(skip(self, request), fields(collection = T::COLLECTION))]
    pub async fn create(&self, request: T::Create) -> Result<T> {
        let id = self.next_id().await?;
        let record = T::from_create(id, request);
        self.insert(&record).await?;
        debug!("Created {} {}", T::LABEL, id);
        Ok(record)
    }

    /// Insert an already keyed record, stamping `created_at`/`updated_at`.
    pub async fn insert(&self, record: &T) -> Result<()> {
        let mut document = to_document(record)?;
        let now = json!(Utc::now().to_rfc3339());
        document.insert("created_at".into(), now.clone());
        document.insert("updated_at".into(), now);
        self.client
            .insert_one(T::COLLECTION, Value::Object(document))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<T>> {
        self.find_one(Self::id_filter(id)).await
    }

    pub async fn find_one(&self, filter: Value) -> Result<Option<T>> {
        self.client
            .find_one(T::COLLECTION, filter)
            .await?
            .map(|document| serde_json::from_value(document).map_err(Into::into))
            .transpose()
    }

    pub async fn list(&self, filter: Value, skip: u64, limit: i64) -> Result<Vec<T>> {
        let options = FindOptions::sorted(json!({ T::ID_FIELD: 1 }))
            .with_skip(skip)
            .with_limit(limit);
        decode_all(self.client.find(T::COLLECTION, filter, options).await?)
    }

    pub async fn find_by(&self, filter: Value) -> Result<Vec<T>> {
        self.find_sorted(filter, json!({ T::ID_FIELD: 1 }), None).await
    }

    pub async fn find_sorted(&self, filter: Value, sort: Value, limit: Option<i64>) -> Result<Vec<T>> {
        let mut options = FindOptions::sorted(sort);
        options.limit = limit;
        decode_all(self.client.find(T::COLLECTION, filter, options).await?)
    }

    /// Overwrite every field of an existing record. `None` when it is missing.
    pub async fn replace(&self, id: i64, request: T::Create) -> Result<Option<T>> {
        let record = T::from_create(id, request);
        let document = to_document(&record)?;
        if self.set_fields(id, document).await? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    pub async fn update_fields(&self, id: i64, fields: Map<String, Value>) -> Result<Option<T>> {
        if !self.set_fields(id, fields).await? {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn set_fields(&self, id: i64, mut fields: Map<String, Value>) -> Result<bool> {
        fields.remove(T::ID_FIELD);
        fields.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
        let result = self
            .client
            .update_one(
                T::COLLECTION,
                Self::id_filter(id),
                json!({ "$set": fields }),
                false,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .client
            .delete_one(T::COLLECTION, Self::id_filter(id))
            .await?;
        Ok(deleted > 0)
    }
}

/// `max(field) + 1` over the documents matching `filter`, starting at 1.
/// Two concurrent writers can receive the same value.
pub async fn next_sequence(
    client: &StoreClient,
    collection: &str,
    field: &str,
    filter: Value,
) -> Result<i64> {
    let rows = client
        .aggregate(
            collection,
            vec![
                json!({ "$match": filter }),
                json!({ "$group": { "_id": null, "max_value": { "$max": format!("${}", field) } } }),
            ],
        )
        .await?;

    let max = rows
        .first()
        .and_then(|row| row.get("max_value"))
        .and_then(|value| value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)))
        .unwrap_or(0);
    Ok(max + 1)
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a JSON object, got {}", other)),
    }
}

pub fn decode_all<T: DeserializeOwned>(documents: Vec<Value>) -> Result<Vec<T>> {
    documents
        .into_iter()
        .map(|document| serde_json::from_value(document).map_err(Into::into))
        .collect()
}
