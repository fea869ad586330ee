//! Cultivation — one farmer's claim against one quota for one growing cycle.
//!
//! While a cultivation is planned or active its area is reflected in the
//! quota's `allocated_area`; once cancelled or failed the area must have
//! been released exactly once. `harvested` is terminal for the cultivation
//! but not for sales drawn against it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::Location;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The cultivation state machine:
///
/// ```text
/// planned ──(mark active)──▶ active ──(harvest accepted)──▶ harvested
/// planned | active ──(cancel)──▶ cancelled       (releases area)
/// planned | active ──(crop loss)──▶ failed       (releases area)
/// ```
///
/// `harvested`, `cancelled`, and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CultivationStatus {
  Planned,
  Active,
  Harvested,
  Cancelled,
  Failed,
}

impl CultivationStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Harvested | Self::Cancelled | Self::Failed)
  }

  /// Whether the cultivation's area is currently counted in its quota's
  /// `allocated_area`.
  pub fn holds_allocation(&self) -> bool {
    matches!(self, Self::Planned | Self::Active)
  }
}

impl std::fmt::Display for CultivationStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::Planned => "planned",
      Self::Active => "active",
      Self::Harvested => "harvested",
      Self::Cancelled => "cancelled",
      Self::Failed => "failed",
    };
    write!(f, "{s}")
  }
}

// ─── Cultivation ─────────────────────────────────────────────────────────────

/// A farmer's committed claim against a quota. Created only through a
/// successful [`crate::store::QuotaStore::start_cultivation`] validation,
/// never directly; `quota_id` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cultivation {
  pub cultivation_id:            Uuid,
  /// Opaque authenticated identity; the core requires no behaviour of it.
  pub farmer_id:                 Uuid,
  pub quota_id:                  Uuid,
  pub crop_name:                 String,
  pub requested_area:            f64,
  pub cultivation_start:         NaiveDate,
  pub expected_harvest:          NaiveDate,
  pub estimated_yield:           Option<f64>,
  pub status:                    CultivationStatus,
  /// Set when the harvest submission is accepted.
  pub actual_yield:              Option<f64>,
  /// The basis for sale validation; set to `actual_yield` at harvest.
  pub max_allowed_sale_quantity: Option<f64>,
  pub created_at:                DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::QuotaStore::start_cultivation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CultivationRequest {
  pub farmer_id:         Uuid,
  pub location:          Location,
  pub crop_name:         String,
  pub requested_area:    f64,
  pub cultivation_start: NaiveDate,
  pub expected_harvest:  NaiveDate,
  pub estimated_yield:   Option<f64>,
}

/// Input to [`crate::store::QuotaStore::submit_harvest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HarvestSubmission {
  pub harvest_date: NaiveDate,
  pub quantity:     f64,
}
