//! Notification events emitted by the core.
//!
//! The core emits these alongside the entity an operation created; delivery
//! (SMS, dashboard, email) is an external collaborator's responsibility.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Utilization fraction at or above which an allocation emits
/// [`Notification::QuotaNearExhaustion`].
pub const NEAR_EXHAUSTION_THRESHOLD: f64 = 0.90;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
  /// A sale was accepted against a harvested cultivation.
  SaleRecorded {
    sale_id:        Uuid,
    cultivation_id: Uuid,
    farmer_id:      Uuid,
    crop_name:      String,
    quantity:       f64,
    /// Sellable quantity left after this sale.
    remaining:      f64,
  },

  /// An allocation pushed quota utilization across
  /// [`NEAR_EXHAUSTION_THRESHOLD`]. Emitted once per crossing, not on every
  /// subsequent allocation.
  QuotaNearExhaustion {
    quota_id:    Uuid,
    crop_name:   String,
    /// `allocated_area / total_allowed_area` after the allocation.
    utilization: f64,
  },
}
