//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every rejection kind in the core taxonomy maps to exactly one HTTP
//! status, and the response body carries the human-readable message
//! rendered by the error itself.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fieldcap_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Domain(#[from] CoreError),
}

impl ApiError {
  /// Normalise a store error into the core taxonomy and wrap it.
  pub fn from_store<E: Into<CoreError>>(e: E) -> Self {
    Self::Domain(e.into())
  }
}

fn domain_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::NoQuota
    | CoreError::QuotaNotFound(_)
    | CoreError::CultivationNotFound(_) => StatusCode::NOT_FOUND,

    CoreError::QuotaInactive(_)
    | CoreError::WindowViolation { .. }
    | CoreError::AreaExceeded { .. }
    | CoreError::PerFarmerLimitExceeded { .. }
    | CoreError::YieldToleranceExceeded { .. }
    | CoreError::SaleExceedsRemaining { .. }
    | CoreError::NonPositiveAmount(_)
    | CoreError::NegativeLimit(_)
    | CoreError::InvalidSeasonWindow { .. } => StatusCode::UNPROCESSABLE_ENTITY,

    CoreError::InvalidStateTransition { .. }
    | CoreError::WouldViolateAllocation { .. }
    | CoreError::ConcurrentModification => StatusCode::CONFLICT,

    CoreError::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,

    CoreError::Serialization(_) | CoreError::Internal(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Domain(e) => (domain_status(e), e.to_string()),
    };
    if status.is_server_error() {
      tracing::error!(%message, "internal error in API handler");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
