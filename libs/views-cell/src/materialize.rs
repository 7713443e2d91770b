use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::{repository::decode_all, FindOptions, StoreClient};

use crate::definitions::{ViewDefinition, VIEWS, VIEW_META};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewMeta {
    pub view: String,
    pub document_count: u64,
    pub refreshed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewStatus {
    pub exists: bool,
    pub document_count: u64,
    pub refreshed_at: Option<String>,
}

pub struct ViewManager {
    client: StoreClient,
}

impl ViewManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: StoreClient::new(config),
        }
    }

    /// Recompute one view and replace its contents.
    #[instrument(skip(self, view), fields(view = view.name))]
    pub async fn refresh(&self, view: &ViewDefinition, now: NaiveDateTime) -> anyhow::Result<u64> {
        let rows = self.client.aggregate(view.base, view.pipeline(now)).await?;

        self.client.delete_many(view.name, json!({})).await?;
        let inserted = self.client.insert_many(view.name, rows).await? as u64;

        let meta = ViewMeta {
            view: view.name.to_string(),
            document_count: inserted,
            refreshed_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        };
        self.client
            .update_one(
                VIEW_META,
                json!({ "view": view.name }),
                json!({ "$set": meta }),
                true,
            )
            .await?;

        info!("Refreshed view {} with {} rows", view.name, inserted);
        Ok(inserted)
    }

    /// Rebuild every view. A failing view is logged and reported as `false`
    /// without stopping the others.
    pub async fn refresh_all(&self) -> BTreeMap<String, bool> {
        let now = Local::now().naive_local();
        let outcomes = join_all(VIEWS.iter().map(|view| self.refresh(view, now))).await;

        VIEWS
            .iter()
            .zip(outcomes)
            .map(|(view, outcome)| {
                if let Err(e) = &outcome {
                    error!("Failed to refresh view {}: {}", view.name, e);
                }
                (view.name.to_string(), outcome.is_ok())
            })
            .collect()
    }

    pub async fn status(&self) -> anyhow::Result<BTreeMap<String, ViewStatus>> {
        let metas: Vec<ViewMeta> = decode_all(
            self.client
                .find(VIEW_META, json!({}), FindOptions::default())
                .await?,
        )?;
        let counts = try_join_all(
            VIEWS
                .iter()
                .map(|view| self.client.count(view.name, json!({}))),
        )
        .await?;

        Ok(VIEWS
            .iter()
            .zip(counts)
            .map(|(view, document_count)| {
                let meta = metas.iter().find(|meta| meta.view == view.name);
                let status = ViewStatus {
                    exists: meta.is_some(),
                    document_count,
                    refreshed_at: meta.map(|meta| meta.refreshed_at.clone()),
                };
                (view.name.to_string(), status)
            })
            .collect())
    }
}

/// Build the views once at startup. Failures are logged; the API still serves.
pub async fn bootstrap(config: &AppConfig) {
    if !config.is_configured() {
        warn!("Document store not configured, skipping view initialization");
        return;
    }
    let results = ViewManager::new(config).refresh_all().await;
    let ready = results.values().filter(|ok| **ok).count();
    info!("Initialized {}/{} views", ready, results.len());
}

/// Rebuild the views every `view_refresh_interval_secs`. Zero disables it.
pub fn spawn_refresher(config: Arc<AppConfig>) -> Option<JoinHandle<()>> {
    if config.view_refresh_interval_secs == 0 || !config.is_configured() {
        return None;
    }
    let period = Duration::from_secs(config.view_refresh_interval_secs);
    info!("Refreshing views every {:?}", period);

    Some(tokio::spawn(async move {
        let manager = ViewManager::new(&config);
        let mut ticker = tokio::time::interval(period);
        // the first tick fires immediately and startup already built the views
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let results = manager.refresh_all().await;
            let failed: Vec<_> = results
                .iter()
                .filter(|(_, ok)| !**ok)
                .map(|(name, _)| name.as_str())
                .collect();
            if !failed.is_empty() {
                warn!("View refresh failed for: {}", failed.join(", "));
            }
        }
    }))
}
