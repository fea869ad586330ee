//! Handlers for `/cultivations` endpoints — the farmer-facing lifecycle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cultivations` | Optional `?farmer_id` filter |
//! | `POST` | `/cultivations` | Body: [`CultivationRequest`]; returns 201 |
//! | `GET`  | `/cultivations/:id` | Single cultivation |
//! | `POST` | `/cultivations/:id/activate` | planned → active |
//! | `POST` | `/cultivations/:id/cancel` | Releases the allocated area |
//! | `POST` | `/cultivations/:id/fail` | Crop loss; same release as cancel |
//! | `POST` | `/cultivations/:id/harvest` | Body: [`HarvestSubmission`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fieldcap_core::{
  cultivation::{Cultivation, CultivationRequest, HarvestSubmission},
  event::Notification,
  store::QuotaStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Response for admission: the created claim plus any notification events
/// the caller is responsible for delivering.
#[derive(Debug, Serialize)]
pub struct StartResponse {
  pub cultivation:   Cultivation,
  pub notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub farmer_id: Option<Uuid>,
}

/// `GET /cultivations[?farmer_id=<id>]`
pub async fn list<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Cultivation>>, ApiError> {
  let cultivations = store
    .list_cultivations(params.farmer_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cultivations))
}

/// `GET /cultivations/:id`
pub async fn get_one<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Cultivation>, ApiError> {
  let cultivation = store
    .get_cultivation(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("cultivation {id} not found")))?;
  Ok(Json(cultivation))
}

/// `POST /cultivations` — returns 201 + [`StartResponse`].
pub async fn start<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CultivationRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let (cultivation, notifications) = store
    .start_cultivation(body)
    .await
    .map_err(ApiError::from_store)?;
  for n in &notifications {
    tracing::info!(event = ?n, "notification event");
  }
  Ok((StatusCode::CREATED, Json(StartResponse { cultivation, notifications })))
}

/// `POST /cultivations/:id/activate`
pub async fn activate<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Cultivation>, ApiError> {
  let cultivation = store.mark_active(id).await.map_err(ApiError::from_store)?;
  Ok(Json(cultivation))
}

/// `POST /cultivations/:id/cancel`
pub async fn cancel<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Cultivation>, ApiError> {
  let cultivation = store
    .cancel_cultivation(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cultivation))
}

/// `POST /cultivations/:id/fail`
pub async fn fail<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Cultivation>, ApiError> {
  let cultivation = store.mark_failed(id).await.map_err(ApiError::from_store)?;
  Ok(Json(cultivation))
}

/// `POST /cultivations/:id/harvest` — body: [`HarvestSubmission`].
pub async fn harvest<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<HarvestSubmission>,
) -> Result<Json<Cultivation>, ApiError> {
  let cultivation = store
    .submit_harvest(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(cultivation))
}
