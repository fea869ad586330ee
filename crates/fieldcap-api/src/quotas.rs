//! Handlers for `/quotas` endpoints — the admin surface.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/quotas` | Optional `?active=true` filter |
//! | `POST`  | `/quotas` | Body: [`fieldcap_core::quota::NewQuota`]; returns 201 |
//! | `GET`   | `/quotas/:id` | Single quota |
//! | `PATCH` | `/quotas/:id` | Body: [`fieldcap_core::quota::QuotaEdit`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fieldcap_core::{
  quota::{NewQuota, Quota, QuotaEdit},
  store::QuotaStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If `true`, return only active quotas.
  #[serde(default)]
  pub active: bool,
}

/// `GET /quotas[?active=true]`
pub async fn list<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Quota>>, ApiError> {
  let quotas = store
    .list_quotas(params.active)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(quotas))
}

/// `GET /quotas/:id`
pub async fn get_one<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Quota>, ApiError> {
  let quota = store
    .get_quota(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("quota {id} not found")))?;
  Ok(Json(quota))
}

/// `POST /quotas` — returns 201 + the stored [`Quota`].
pub async fn create<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewQuota>,
) -> Result<impl IntoResponse, ApiError> {
  let quota = store.add_quota(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(quota)))
}

/// `PATCH /quotas/:id` — partial edit; omitted fields are untouched.
pub async fn edit<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<QuotaEdit>,
) -> Result<Json<Quota>, ApiError> {
  let quota = store
    .edit_quota(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(quota))
}
