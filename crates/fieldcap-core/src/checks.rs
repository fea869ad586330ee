//! Pure validation rules shared by every storage backend.
//!
//! Backends call these twice during admission: once unlocked, for a fast
//! friendly failure before paying for a lock, and once more against rows
//! re-read inside the locked transaction. The rules themselves are pure so
//! both passes are guaranteed to apply identical logic.

use chrono::NaiveDate;

use crate::{
  Error, Result,
  cultivation::CultivationStatus,
  quota::Quota,
};

/// Permitted overage of a harvest quantity above `estimated_yield`.
/// A fixed policy constant, not farmer- or crop-configurable.
pub const YIELD_TOLERANCE: f64 = 0.10;

/// Both the cultivation start and the expected harvest must lie inside the
/// quota's season window (inclusive).
pub fn check_window(quota: &Quota, start: NaiveDate, end: NaiveDate) -> Result<()> {
  quota.season.check_contains(start)?;
  quota.season.check_contains(end)?;
  Ok(())
}

/// Non-mutating form of the capacity check; the mutation itself re-enforces
/// this in [`Quota::allocate_area`].
pub fn check_area_available(quota: &Quota, requested: f64) -> Result<()> {
  if requested <= 0.0 {
    return Err(Error::NonPositiveAmount(requested));
  }
  if quota.allocated_area + requested > quota.total_allowed_area {
    return Err(Error::AreaExceeded { remaining: quota.remaining_area() });
  }
  Ok(())
}

/// `existing` is the farmer's summed area across their planned and active
/// cultivations under this specific quota. An unset `max_per_farmer` means
/// unlimited.
pub fn check_per_farmer_limit(quota: &Quota, existing: f64, requested: f64) -> Result<()> {
  let Some(limit) = quota.max_per_farmer else {
    return Ok(());
  };
  if existing + requested > limit {
    return Err(Error::PerFarmerLimitExceeded { current: existing, limit });
  }
  Ok(())
}

/// When an estimate exists, the harvest may exceed it by at most
/// [`YIELD_TOLERANCE`]. No estimate means no ceiling.
pub fn check_yield_tolerance(estimated_yield: Option<f64>, quantity: f64) -> Result<()> {
  if quantity <= 0.0 {
    return Err(Error::NonPositiveAmount(quantity));
  }
  let Some(estimate) = estimated_yield else {
    return Ok(());
  };
  let ceiling = estimate * (1.0 + YIELD_TOLERANCE);
  if quantity > ceiling {
    return Err(Error::YieldToleranceExceeded { ceiling });
  }
  Ok(())
}

/// `remaining` must come from a sum over the current sale rows, read inside
/// the same transaction that will insert the new sale.
pub fn check_sale_quantity(remaining: f64, requested: f64) -> Result<()> {
  if requested <= 0.0 {
    return Err(Error::NonPositiveAmount(requested));
  }
  if requested > remaining {
    return Err(Error::SaleExceedsRemaining { remaining });
  }
  Ok(())
}

// ─── State transitions ───────────────────────────────────────────────────────

fn check_transition(
  status: CultivationStatus,
  allowed: &[CultivationStatus],
  action: &'static str,
) -> Result<()> {
  if allowed.contains(&status) {
    Ok(())
  } else {
    Err(Error::InvalidStateTransition { status, action })
  }
}

/// Only a planned cultivation may be marked active.
pub fn check_activatable(status: CultivationStatus) -> Result<()> {
  check_transition(status, &[CultivationStatus::Planned], "activate")
}

/// Cancel is valid from planned or active only. A second cancel must be
/// rejected here, never silently re-released.
pub fn check_cancellable(status: CultivationStatus) -> Result<()> {
  check_transition(
    status,
    &[CultivationStatus::Planned, CultivationStatus::Active],
    "cancel",
  )
}

/// The externally-triggered failure transition mirrors cancel.
pub fn check_failable(status: CultivationStatus) -> Result<()> {
  check_transition(
    status,
    &[CultivationStatus::Planned, CultivationStatus::Active],
    "fail",
  )
}

pub fn check_harvestable(status: CultivationStatus) -> Result<()> {
  check_transition(
    status,
    &[CultivationStatus::Planned, CultivationStatus::Active],
    "harvest",
  )
}

/// Sales may only draw against a harvested cultivation.
pub fn check_sellable(status: CultivationStatus) -> Result<()> {
  check_transition(status, &[CultivationStatus::Harvested], "sell from")
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    quota::SeasonWindow,
    scope::GeoScope,
  };

  fn quota(total: f64, allocated: f64, max_per_farmer: Option<f64>) -> Quota {
    Quota {
      quota_id: Uuid::new_v4(),
      scope: GeoScope::default(),
      crop_name: "Rice".into(),
      season: SeasonWindow {
        start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        end:   NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
      },
      total_allowed_area: total,
      allocated_area: allocated,
      max_per_farmer,
      allocated_farmer_count: 0,
      is_active: true,
      created_at: Utc::now(),
    }
  }

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn window_rejects_early_start_and_late_harvest() {
    let q = quota(100.0, 0.0, None);
    assert!(check_window(&q, d(2026, 6, 5), d(2026, 9, 15)).is_ok());
    assert!(check_window(&q, d(2026, 5, 5), d(2026, 9, 15)).is_err());
    assert!(check_window(&q, d(2026, 6, 5), d(2026, 10, 15)).is_err());
  }

  #[test]
  fn per_farmer_limit_unset_means_unlimited() {
    let q = quota(1000.0, 0.0, None);
    assert!(check_per_farmer_limit(&q, 500.0, 400.0).is_ok());
  }

  #[test]
  fn per_farmer_limit_counts_existing_holdings() {
    let q = quota(100.0, 0.0, Some(50.0));
    assert!(check_per_farmer_limit(&q, 0.0, 50.0).is_ok());
    match check_per_farmer_limit(&q, 30.0, 25.0) {
      Err(Error::PerFarmerLimitExceeded { current, limit }) => {
        assert_eq!(current, 30.0);
        assert_eq!(limit, 50.0);
      }
      other => panic!("expected PerFarmerLimitExceeded, got {other:?}"),
    }
  }

  #[test]
  fn yield_tolerance_ceiling_is_ten_percent() {
    // estimated 1000 → ceiling 1100
    assert!(check_yield_tolerance(Some(1000.0), 1050.0).is_ok());
    assert!(check_yield_tolerance(Some(1000.0), 1100.0).is_ok());
    match check_yield_tolerance(Some(1000.0), 1150.0) {
      Err(Error::YieldToleranceExceeded { ceiling }) => {
        assert!((ceiling - 1100.0).abs() < 1e-9);
      }
      other => panic!("expected YieldToleranceExceeded, got {other:?}"),
    }
    // No estimate, no ceiling.
    assert!(check_yield_tolerance(None, 99_999.0).is_ok());
  }

  #[test]
  fn sale_check_carries_remaining() {
    assert!(check_sale_quantity(450.0, 450.0).is_ok());
    match check_sale_quantity(450.0, 500.0) {
      Err(Error::SaleExceedsRemaining { remaining }) => assert_eq!(remaining, 450.0),
      other => panic!("expected SaleExceedsRemaining, got {other:?}"),
    }
  }

  #[test]
  fn terminal_statuses_reject_every_transition() {
    for status in [
      CultivationStatus::Harvested,
      CultivationStatus::Cancelled,
      CultivationStatus::Failed,
    ] {
      assert!(check_activatable(status).is_err());
      assert!(check_cancellable(status).is_err());
      assert!(check_failable(status).is_err());
      assert!(check_harvestable(status).is_err());
    }
    assert!(check_sellable(CultivationStatus::Harvested).is_ok());
    assert!(check_sellable(CultivationStatus::Active).is_err());
  }
}
