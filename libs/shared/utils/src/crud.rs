//! Handlers shared by every collection that is plain create/read/update/delete.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use shared_config::AppConfig;
use shared_database::{Record, Repository};
use shared_models::{error::AppError, ListQuery};

pub async fn create_record<T: Record>(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<T::Create>,
) -> Result<(StatusCode, Json<T>), AppError> {
    T::validate(&request).map_err(AppError::BadRequest)?;

    let record = Repository::<T>::new(&config)
        .create(request)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_records<T: Record>(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<T>>, AppError> {
    let records = Repository::<T>::new(&config)
        .list(json!({}), query.skip(), query.limit())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(records))
}

pub async fn get_record<T: Record>(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<T>, AppError> {
    Repository::<T>::new(&config)
        .get(id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

pub async fn update_record<T: Record>(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Json(request): Json<T::Create>,
) -> Result<Json<T>, AppError> {
    T::validate(&request).map_err(AppError::BadRequest)?;

    Repository::<T>::new(&config)
        .replace(id, request)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::not_found(T::LABEL))
}

pub async fn delete_record<T: Record>(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = Repository::<T>::new(&config)
        .delete(id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(T::LABEL))
    }
}

/// `POST/GET {base}` and `GET/PUT/DELETE {base}/{id}` for `T`.
pub fn crud_routes<T: Record>(base: &str) -> Router<Arc<AppConfig>> {
    Router::new()
        .route(base, post(create_record::<T>).get(list_records::<T>))
        .route(
            &format!("{}/{{id}}", base),
            get(get_record::<T>)
                .put(update_record::<T>)
                .delete(delete_record::<T>),
        )
}

/// `GET/PUT/DELETE {base}/{id}` only, for collections with a custom create or list.
pub fn item_routes<T: Record>(base: &str) -> Router<Arc<AppConfig>> {
    Router::new().route(
        &format!("{}/{{id}}", base),
        get(get_record::<T>)
            .put(update_record::<T>)
            .delete(delete_record::<T>),
    )
}
