//! Handlers for sale endpoints under `/cultivations/:id`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cultivations/:id/sales` | All sales, oldest first |
//! | `POST` | `/cultivations/:id/sales` | Body: `{"quantity": ...}`; returns 201 |
//! | `GET`  | `/cultivations/:id/remaining` | Remaining sellable quantity |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use fieldcap_core::{
  event::Notification,
  sale::{HarvestSale, NewSale},
  store::QuotaStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SaleBody {
  pub quantity: f64,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
  pub sale:          HarvestSale,
  pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct RemainingResponse {
  pub cultivation_id: Uuid,
  pub remaining:      f64,
}

/// `GET /cultivations/:id/sales`
pub async fn list<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HarvestSale>>, ApiError> {
  let sales = store.list_sales(id).await.map_err(ApiError::from_store)?;
  Ok(Json(sales))
}

/// `POST /cultivations/:id/sales` — returns 201 + [`SaleResponse`].
pub async fn create<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SaleBody>,
) -> Result<impl IntoResponse, ApiError> {
  let (sale, notifications) = store
    .record_sale(NewSale { cultivation_id: id, quantity: body.quantity })
    .await
    .map_err(ApiError::from_store)?;
  for n in &notifications {
    tracing::info!(event = ?n, "notification event");
  }
  Ok((StatusCode::CREATED, Json(SaleResponse { sale, notifications })))
}

/// `GET /cultivations/:id/remaining`
pub async fn remaining<S: QuotaStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RemainingResponse>, ApiError> {
  let remaining = store
    .remaining_quantity(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(RemainingResponse { cultivation_id: id, remaining }))
}
