//! Harvest sales — transactions drawing down a harvested cultivation's yield.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One accepted sale. Immutable once created; there is no edit or delete
/// path. Remaining-quantity sums are always recomputed over the full row
/// set, never kept as a running counter, so they cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestSale {
  pub sale_id:        Uuid,
  pub cultivation_id: Uuid,
  pub quantity:       f64,
  /// Server-assigned timestamp.
  pub recorded_at:    DateTime<Utc>,
}

/// Input to [`crate::store::QuotaStore::record_sale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
  pub cultivation_id: Uuid,
  pub quantity:       f64,
}
