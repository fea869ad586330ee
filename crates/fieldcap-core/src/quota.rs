//! Quota — an admin-defined cap on cultivated area for one crop within one
//! geographic scope and one season.
//!
//! The quota row is the sole point of contention in the system. Its
//! `allocated_area ≤ total_allowed_area` invariant is enforced at every
//! mutation, never only at read time, and the only code path that moves
//! `allocated_area` upward is [`Quota::allocate_area`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::WindowBoundary,
  scope::GeoScope,
};

// ─── Season window ───────────────────────────────────────────────────────────

/// The season's start and end dates, both inclusive. Cultivation and harvest
/// dates must fall within this window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl SeasonWindow {
  /// A window must not end before it starts. Single-day seasons are fine.
  pub fn validate(&self) -> Result<()> {
    if self.start > self.end {
      return Err(Error::InvalidSeasonWindow { start: self.start, end: self.end });
    }
    Ok(())
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    date >= self.start && date <= self.end
  }

  /// Containment check that reports which boundary was violated.
  pub fn check_contains(&self, date: NaiveDate) -> Result<()> {
    if date < self.start {
      return Err(Error::WindowViolation {
        boundary: WindowBoundary::SeasonStart,
        limit:    self.start,
        date,
      });
    }
    if date > self.end {
      return Err(Error::WindowViolation {
        boundary: WindowBoundary::SeasonEnd,
        limit:    self.end,
        date,
      });
    }
    Ok(())
  }
}

// ─── Quota ───────────────────────────────────────────────────────────────────

/// A cap on cultivated area for one crop, one scope, one season.
///
/// Owned exclusively by the quota registry; cultivations hold a non-owning
/// reference by id. Never physically deleted while any planned or active
/// cultivation references it — deactivation is the retirement path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
  pub quota_id:               Uuid,
  pub scope:                  GeoScope,
  pub crop_name:              String,
  pub season:                 SeasonWindow,
  pub total_allowed_area:     f64,
  pub allocated_area:         f64,
  /// `None` means unlimited.
  pub max_per_farmer:         Option<f64>,
  pub allocated_farmer_count: u32,
  pub is_active:              bool,
  /// Server-assigned; also the tie-breaker when two quotas match a request
  /// at equal specificity (most recent wins).
  pub created_at:             DateTime<Utc>,
}

impl Quota {
  pub fn remaining_area(&self) -> f64 {
    (self.total_allowed_area - self.allocated_area).max(0.0)
  }

  /// Fraction of the cap currently committed, in `[0, 1]` for a healthy
  /// quota. Zero-capacity quotas report full utilization.
  pub fn utilization(&self) -> f64 {
    if self.total_allowed_area > 0.0 {
      self.allocated_area / self.total_allowed_area
    } else {
      1.0
    }
  }

  /// Commit `area` acres against this quota.
  ///
  /// The single site where the allocation invariant is enforced. Callers
  /// must hold the exclusive quota lock (see the storage backend) for the
  /// duration of the enclosing transaction.
  pub fn allocate_area(&mut self, area: f64, increment_farmer_count: bool) -> Result<()> {
    if area <= 0.0 {
      return Err(Error::NonPositiveAmount(area));
    }
    if self.allocated_area + area > self.total_allowed_area {
      return Err(Error::AreaExceeded { remaining: self.remaining_area() });
    }
    self.allocated_area += area;
    if increment_farmer_count {
      self.allocated_farmer_count += 1;
    }
    Ok(())
  }

  /// Release `area` acres back to the quota, floored at zero.
  ///
  /// Underflow indicates a bookkeeping bug upstream (a double release) and
  /// is logged as an invariant violation; the clamp is a last-resort safety
  /// net, not a substitute for the one-time-release rule enforced at the
  /// cultivation level.
  pub fn release_area(&mut self, area: f64, decrement_farmer_count: bool) {
    if area > self.allocated_area {
      tracing::warn!(
        quota_id = %self.quota_id,
        allocated = self.allocated_area,
        release = area,
        "allocation underflow: releasing more area than is allocated"
      );
    }
    self.allocated_area = (self.allocated_area - area).max(0.0);
    if decrement_farmer_count {
      self.allocated_farmer_count = self.allocated_farmer_count.saturating_sub(1);
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::QuotaStore::add_quota`].
/// `quota_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuota {
  pub scope:              GeoScope,
  pub crop_name:          String,
  pub season:             SeasonWindow,
  pub total_allowed_area: f64,
  pub max_per_farmer:     Option<f64>,
  pub is_active:          bool,
}

impl NewQuota {
  /// Field-level checks run before any storage write, so invalid admin
  /// input fails with a legible error rather than a constraint violation.
  pub fn validate(&self) -> Result<()> {
    if self.total_allowed_area < 0.0 {
      return Err(Error::NegativeLimit(self.total_allowed_area));
    }
    if let Some(limit) = self.max_per_farmer
      && limit < 0.0
    {
      return Err(Error::NegativeLimit(limit));
    }
    self.season.validate()
  }
}

/// A partial admin edit; `None` fields are left untouched. Edits never
/// re-validate already-accepted cultivations — they affect future requests
/// only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaEdit {
  pub total_allowed_area: Option<f64>,
  pub season:             Option<SeasonWindow>,
  /// `Some(None)` clears the per-farmer limit.
  pub max_per_farmer:     Option<Option<f64>>,
  pub is_active:          Option<bool>,
}

impl QuotaEdit {
  /// Apply the edit in place. Fails `WouldViolateAllocation` if the new cap
  /// is below what is already committed.
  pub fn apply(&self, quota: &mut Quota) -> Result<()> {
    if let Some(total) = self.total_allowed_area {
      if total < 0.0 {
        return Err(Error::NegativeLimit(total));
      }
      if total < quota.allocated_area {
        return Err(Error::WouldViolateAllocation { allocated: quota.allocated_area });
      }
      quota.total_allowed_area = total;
    }
    if let Some(season) = self.season {
      season.validate()?;
      quota.season = season;
    }
    if let Some(limit) = self.max_per_farmer {
      if let Some(l) = limit
        && l < 0.0
      {
        return Err(Error::NegativeLimit(l));
      }
      quota.max_per_farmer = limit;
    }
    if let Some(active) = self.is_active {
      quota.is_active = active;
    }
    Ok(())
  }
}

// ─── Match result ────────────────────────────────────────────────────────────

/// Outcome of resolving the best quota for a request location and crop.
///
/// "No match at all" and "matched but retired" are distinct: they surface
/// as different rejection reasons to the farmer.
#[derive(Debug, Clone)]
pub enum QuotaMatch {
  Active(Quota),
  /// The most specific match exists but is deactivated.
  InactiveOnly(Quota),
  NoMatch,
}

impl QuotaMatch {
  pub fn into_result(self) -> Result<Quota> {
    match self {
      Self::Active(q) => Ok(q),
      Self::InactiveOnly(q) => Err(Error::QuotaInactive(q.quota_id)),
      Self::NoMatch => Err(Error::NoQuota),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn quota(total: f64, allocated: f64) -> Quota {
    Quota {
      quota_id:               Uuid::new_v4(),
      scope:                  GeoScope::default(),
      crop_name:              "Rice".into(),
      season:                 SeasonWindow {
        start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        end:   NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
      },
      total_allowed_area:     total,
      allocated_area:         allocated,
      max_per_farmer:         None,
      allocated_farmer_count: 0,
      is_active:              true,
      created_at:             Utc::now(),
    }
  }

  #[test]
  fn allocate_within_cap_succeeds() {
    let mut q = quota(100.0, 40.0);
    q.allocate_area(60.0, true).unwrap();
    assert_eq!(q.allocated_area, 100.0);
    assert_eq!(q.allocated_farmer_count, 1);
  }

  #[test]
  fn allocate_over_cap_carries_remaining() {
    let mut q = quota(100.0, 40.0);
    match q.allocate_area(65.0, false) {
      Err(Error::AreaExceeded { remaining }) => assert_eq!(remaining, 60.0),
      other => panic!("expected AreaExceeded, got {other:?}"),
    }
    // Failed allocation must leave the quota untouched.
    assert_eq!(q.allocated_area, 40.0);
  }

  #[test]
  fn allocate_rejects_non_positive_area() {
    let mut q = quota(100.0, 0.0);
    assert!(matches!(
      q.allocate_area(0.0, false),
      Err(Error::NonPositiveAmount(_))
    ));
    assert!(matches!(
      q.allocate_area(-5.0, false),
      Err(Error::NonPositiveAmount(_))
    ));
  }

  #[test]
  fn release_floors_at_zero() {
    let mut q = quota(100.0, 30.0);
    q.release_area(50.0, true);
    assert_eq!(q.allocated_area, 0.0);
    assert_eq!(q.allocated_farmer_count, 0);
  }

  #[test]
  fn season_window_reports_violated_boundary() {
    let q = quota(100.0, 0.0);
    let before = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
    let after = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();

    assert!(matches!(
      q.season.check_contains(before),
      Err(Error::WindowViolation { boundary: WindowBoundary::SeasonStart, .. })
    ));
    assert!(matches!(
      q.season.check_contains(after),
      Err(Error::WindowViolation { boundary: WindowBoundary::SeasonEnd, .. })
    ));
    // Endpoints are inclusive.
    assert!(q.season.check_contains(q.season.start).is_ok());
    assert!(q.season.check_contains(q.season.end).is_ok());
  }

  #[test]
  fn new_quota_rejects_negative_limits_and_inverted_seasons() {
    let base = NewQuota {
      scope:              GeoScope::default(),
      crop_name:          "Rice".into(),
      season:             quota(100.0, 0.0).season,
      total_allowed_area: 100.0,
      max_per_farmer:     None,
      is_active:          true,
    };
    assert!(base.validate().is_ok());

    let negative_total = NewQuota { total_allowed_area: -1.0, ..base.clone() };
    assert!(matches!(
      negative_total.validate(),
      Err(Error::NegativeLimit(l)) if l == -1.0
    ));

    let negative_cap = NewQuota { max_per_farmer: Some(-5.0), ..base.clone() };
    assert!(matches!(
      negative_cap.validate(),
      Err(Error::NegativeLimit(l)) if l == -5.0
    ));

    let inverted = NewQuota {
      season: SeasonWindow {
        start: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        end:   NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
      },
      ..base
    };
    assert!(matches!(
      inverted.validate(),
      Err(Error::InvalidSeasonWindow { .. })
    ));
  }

  #[test]
  fn edit_rejects_negative_limits_and_inverted_seasons() {
    let mut q = quota(100.0, 0.0);

    let edit = QuotaEdit { total_allowed_area: Some(-10.0), ..QuotaEdit::default() };
    assert!(matches!(edit.apply(&mut q), Err(Error::NegativeLimit(_))));

    let edit = QuotaEdit { max_per_farmer: Some(Some(-1.0)), ..QuotaEdit::default() };
    assert!(matches!(edit.apply(&mut q), Err(Error::NegativeLimit(_))));

    let edit = QuotaEdit {
      season: Some(SeasonWindow { start: q.season.end, end: q.season.start }),
      ..QuotaEdit::default()
    };
    assert!(matches!(edit.apply(&mut q), Err(Error::InvalidSeasonWindow { .. })));

    // Nothing was applied.
    assert_eq!(q.total_allowed_area, 100.0);
    assert_eq!(q.max_per_farmer, None);
  }

  #[test]
  fn edit_cannot_shrink_below_allocation() {
    let mut q = quota(100.0, 70.0);
    let edit = QuotaEdit { total_allowed_area: Some(50.0), ..QuotaEdit::default() };
    assert!(matches!(
      edit.apply(&mut q),
      Err(Error::WouldViolateAllocation { allocated }) if allocated == 70.0
    ));
    assert_eq!(q.total_allowed_area, 100.0);

    let edit = QuotaEdit { total_allowed_area: Some(70.0), ..QuotaEdit::default() };
    edit.apply(&mut q).unwrap();
    assert_eq!(q.total_allowed_area, 70.0);
  }
}
