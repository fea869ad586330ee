//! Error taxonomy for the quota engine.
//!
//! Every validation failure is a typed variant carrying enough context to
//! render a user-facing message. Storage backends normalise their internal
//! failures into this enum at the trait boundary — a raw constraint
//! violation or I/O error never reaches callers unfiltered.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cultivation::CultivationStatus;

/// Which edge of the harvest window a date fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowBoundary {
  SeasonStart,
  SeasonEnd,
}

impl std::fmt::Display for WindowBoundary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::SeasonStart => write!(f, "on or after the season start"),
      Self::SeasonEnd => write!(f, "on or before the season end"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// No quota covers the request's location and crop. Distinct from
  /// [`Error::QuotaInactive`]: here admission is impossible until an admin
  /// creates a quota.
  #[error("no quota covers this crop at this location")]
  NoQuota,

  /// A quota matched but has been retired by an admin.
  #[error("quota {0} for this crop and location is inactive")]
  QuotaInactive(Uuid),

  #[error("date {date} is outside the harvest window: must be {boundary} ({limit})")]
  WindowViolation {
    boundary: WindowBoundary,
    limit:    NaiveDate,
    date:     NaiveDate,
  },

  #[error("requested area exceeds the quota: only {remaining} acres remain")]
  AreaExceeded { remaining: f64 },

  #[error(
    "per-farmer limit exceeded: {current} acres already held under this \
     quota, limit is {limit}"
  )]
  PerFarmerLimitExceeded { current: f64, limit: f64 },

  #[error("harvest quantity exceeds the estimated yield ceiling of {ceiling}")]
  YieldToleranceExceeded { ceiling: f64 },

  #[error("sale quantity exceeds the remaining sellable quantity ({remaining})")]
  SaleExceedsRemaining { remaining: f64 },

  #[error("cannot {action} a cultivation in status '{status}'")]
  InvalidStateTransition {
    status: CultivationStatus,
    action: &'static str,
  },

  /// Admin edit rejected: the new cap is below what is already committed.
  #[error("new total allowed area is below the currently allocated {allocated} acres")]
  WouldViolateAllocation { allocated: f64 },

  #[error("area or quantity must be positive, got {0}")]
  NonPositiveAmount(f64),

  /// A quota limit (total area or per-farmer cap) may be zero but never
  /// negative.
  #[error("limit must not be negative, got {0}")]
  NegativeLimit(f64),

  #[error("season start {start} is after season end {end}")]
  InvalidSeasonWindow { start: NaiveDate, end: NaiveDate },

  #[error("quota not found: {0}")]
  QuotaNotFound(Uuid),

  #[error("cultivation not found: {0}")]
  CultivationNotFound(Uuid),

  /// Transient: the quota lock could not be acquired in time. The caller
  /// may retry the whole operation from scratch.
  #[error("timed out waiting for the quota lock")]
  LockTimeout,

  /// Transient: the underlying rows changed under us. Retry from scratch —
  /// pre-checks may now be stale.
  #[error("concurrent modification detected, retry the operation")]
  ConcurrentModification,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Normalised storage failure; the raw cause is logged, not surfaced.
  #[error("internal storage error: {0}")]
  Internal(String),
}

impl Error {
  /// Whether retrying the same request (from scratch) may succeed without
  /// any admin intervention.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::LockTimeout | Self::ConcurrentModification)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
