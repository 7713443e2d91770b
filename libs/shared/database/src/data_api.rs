use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::ejson::sanitize;
use crate::store::{FindOptions, UpdateResult, HEALTH_COLLECTION};

#[derive(Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

#[derive(Deserialize)]
struct DocumentResponse {
    document: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertManyResponse {
    #[serde(default)]
    inserted_ids: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    #[serde(default)]
    deleted_count: u64,
}

/// HTTP Data API backend. Every action is a POST to
/// `{base}/action/{name}` carrying the data source, database and collection.
#[derive(Clone)]
pub struct DataApi {
    client: Client,
    base_url: String,
    api_key: String,
    data_source: String,
    database: String,
}

impl DataApi {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.data_api_url.clone(),
            api_key: config.data_api_key.clone(),
            data_source: config.data_source.clone(),
            database: config.database.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apiKey",
            HeaderValue::from_str(&self.api_key).context("Invalid Data API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// Run a raw action. `extra` is merged into the envelope next to
    /// `dataSource`, `database` and `collection`.
    pub async fn action<T>(&self, action: &str, collection: &str, extra: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/action/{}", self.base_url, action);
        debug!("Data API {} on {}", action, collection);

        let mut body = Map::new();
        body.insert("dataSource".into(), json!(self.data_source));
        body.insert("database".into(), json!(self.database));
        body.insert("collection".into(), json!(collection));
        if let Value::Object(fields) = extra {
            body.extend(fields);
        }

        let response = self
            .client
            .post(&url)
            .headers(self.get_headers()?)
            .json(&Value::Object(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Data API error ({}) on {}/{}: {}", status, collection, action, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Data API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Value,
        options: FindOptions,
    ) -> Result<Vec<Value>> {
        let mut body = json!({ "filter": filter });
        if let Some(projection) = options.projection {
            body["projection"] = projection;
        }
        if let Some(sort) = options.sort {
            body["sort"] = sort;
        }
        if let Some(limit) = options.limit {
            body["limit"] = json!(limit);
        }
        if let Some(skip) = options.skip {
            body["skip"] = json!(skip);
        }

        let response: DocumentsResponse = self.action("find", collection, body).await?;
        Ok(response.documents.into_iter().map(sanitize).collect())
    }

    pub async fn find_one(&self, collection: &str, filter: Value) -> Result<Option<Value>> {
        let response: DocumentResponse = self
            .action("findOne", collection, json!({ "filter": filter }))
            .await?;
        Ok(response.document.map(sanitize))
    }

    pub async fn insert_one(&self, collection: &str, document: Value) -> Result<()> {
        let _: Value = self
            .action("insertOne", collection, json!({ "document": document }))
            .await?;
        Ok(())
    }

    pub async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
        let response: InsertManyResponse = self
            .action("insertMany", collection, json!({ "documents": documents }))
            .await?;
        Ok(response.inserted_ids.len())
    }

    pub async fn update_one(
        &self,
        collection: &str,
        filter: Value,
        update: Value,
        upsert: bool,
    ) -> Result<UpdateResult> {
        self.action(
            "updateOne",
            collection,
            json!({ "filter": filter, "update": update, "upsert": upsert }),
        )
        .await
    }

    pub async fn delete_one(&self, collection: &str, filter: Value) -> Result<u64> {
        let response: DeleteResponse = self
            .action("deleteOne", collection, json!({ "filter": filter }))
            .await?;
        Ok(response.deleted_count)
    }

    pub async fn delete_many(&self, collection: &str, filter: Value) -> Result<u64> {
        let response: DeleteResponse = self
            .action("deleteMany", collection, json!({ "filter": filter }))
            .await?;
        Ok(response.deleted_count)
    }

    pub async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>> {
        let response: DocumentsResponse = self
            .action("aggregate", collection, json!({ "pipeline": pipeline }))
            .await?;
        Ok(response.documents.into_iter().map(sanitize).collect())
    }

    pub async fn ping(&self) -> Result<()> {
        self.find_one(HEALTH_COLLECTION, json!({})).await?;
        Ok(())
    }
}
