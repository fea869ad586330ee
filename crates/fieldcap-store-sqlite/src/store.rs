//! [`SqliteStore`] — the SQLite implementation of [`QuotaStore`].
//!
//! Admission follows check-then-lock-then-recheck-then-commit: optimistic
//! pre-checks run unlocked for a fast, friendly failure, and every check is
//! re-run against rows re-read inside a `BEGIN IMMEDIATE` transaction
//! before any write. A failure after the lock rolls the whole transaction
//! back, so no partial allocation is ever visible.

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use fieldcap_core::{
  Error as CoreError, checks,
  cultivation::{Cultivation, CultivationRequest, CultivationStatus, HarvestSubmission},
  event::{NEAR_EXHAUSTION_THRESHOLD, Notification},
  quota::{NewQuota, Quota, QuotaEdit, QuotaMatch},
  sale::{HarvestSale, NewSale},
  scope::Location,
  store::QuotaStore,
};

use crate::{
  Error, Result,
  encode::{RawCultivation, RawQuota, RawSale, encode_date, encode_dt, encode_status, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fieldcap quota store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Unlocked read of a farmer's summed planned/active area under a quota,
  /// for the optimistic pre-check only.
  async fn farmer_holdings_unlocked(&self, quota_id: Uuid, farmer_id: Uuid) -> Result<f64> {
    let quota_id_str = encode_uuid(quota_id);
    let farmer_id_str = encode_uuid(farmer_id);
    Ok(
      self
        .conn
        .call(move |conn| farmer_holdings(conn, &quota_id_str, &farmer_id_str))
        .await?,
    )
  }

  /// Shared release path for cancellation and externally-triggered failure.
  /// `check` guards the transition; releasing happens exactly once because
  /// terminal statuses fail that guard.
  async fn release_and_close(
    &self,
    id: Uuid,
    to_status: CultivationStatus,
    check: fn(CultivationStatus) -> fieldcap_core::Result<()>,
  ) -> Result<Cultivation> {
    let cultivation = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_str = encode_uuid(id);
        let mut cultivation = load_cultivation(&tx, &id_str)?
          .ok_or_else(|| reject(CoreError::CultivationNotFound(id)))?;
        check(cultivation.status).map_err(reject)?;

        let quota_id = cultivation.quota_id;
        let quota_id_str = encode_uuid(quota_id);
        let mut quota = load_quota(&tx, &quota_id_str)?
          .ok_or_else(|| reject(CoreError::QuotaNotFound(quota_id)))?;

        quota.release_area(cultivation.requested_area, true);
        cultivation.status = to_status;

        save_quota_counts(&tx, &quota)?;
        save_cultivation_state(&tx, &cultivation)?;
        tx.commit()?;
        Ok(cultivation)
      })
      .await?;

    tracing::debug!(
      cultivation_id = %cultivation.cultivation_id,
      quota_id = %cultivation.quota_id,
      area = cultivation.requested_area,
      status = %cultivation.status,
      "released quota allocation"
    );
    Ok(cultivation)
  }
}

// ─── QuotaStore impl ─────────────────────────────────────────────────────────

impl QuotaStore for SqliteStore {
  type Error = Error;

  // ── Quota registry ────────────────────────────────────────────────────────

  async fn add_quota(&self, input: NewQuota) -> Result<Quota> {
    input.validate().map_err(Error::Core)?;

    let quota = Quota {
      quota_id:               Uuid::new_v4(),
      scope:                  input.scope,
      crop_name:              input.crop_name,
      season:                 input.season,
      total_allowed_area:     input.total_allowed_area,
      allocated_area:         0.0,
      max_per_farmer:         input.max_per_farmer,
      allocated_farmer_count: 0,
      is_active:              input.is_active,
      created_at:             Utc::now(),
    };

    let row = quota.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quotas (
             quota_id, country, state, district, taluk, village, crop_name,
             season_start, season_end, total_allowed_area, allocated_area,
             max_per_farmer, allocated_farmer_count, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
          rusqlite::params![
            encode_uuid(row.quota_id),
            row.scope.country,
            row.scope.state,
            row.scope.district,
            row.scope.taluk,
            row.scope.village,
            row.crop_name,
            encode_date(row.season.start),
            encode_date(row.season.end),
            row.total_allowed_area,
            row.allocated_area,
            row.max_per_farmer,
            row.allocated_farmer_count,
            row.is_active,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(quota)
  }

  async fn get_quota(&self, id: Uuid) -> Result<Option<Quota>> {
    let id_str = encode_uuid(id);
    Ok(
      self
        .conn
        .call(move |conn| load_quota(conn, &id_str))
        .await?,
    )
  }

  async fn list_quotas(&self, active_only: bool) -> Result<Vec<Quota>> {
    let raws: Vec<RawQuota> = self
      .conn
      .call(move |conn| {
        let sql = if active_only {
          format!(
            "SELECT {} FROM quotas WHERE is_active = 1 ORDER BY created_at DESC",
            RawQuota::COLUMNS
          )
        } else {
          format!("SELECT {} FROM quotas ORDER BY created_at DESC", RawQuota::COLUMNS)
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawQuota::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuota::into_quota).collect()
  }

  async fn find_matching_quota<'a>(
    &'a self,
    location: &'a Location,
    crop: &'a str,
    as_of: chrono::NaiveDate,
  ) -> Result<QuotaMatch> {
    let crop_owned = crop.to_owned();
    let as_of_str = encode_date(as_of);

    let raws: Vec<RawQuota> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM quotas
           WHERE crop_name = ?1 COLLATE NOCASE AND season_end >= ?2",
          RawQuota::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![crop_owned, as_of_str], RawQuota::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut candidates = raws
      .into_iter()
      .map(RawQuota::into_quota)
      .collect::<Result<Vec<_>>>()?;
    candidates.retain(|q| q.scope.covers(location));

    // Most specific wins; at equal specificity the most recently created.
    let best_active = candidates
      .iter()
      .filter(|q| q.is_active)
      .max_by_key(|q| (q.scope.specificity(), q.created_at))
      .cloned();
    if let Some(q) = best_active {
      return Ok(QuotaMatch::Active(q));
    }

    let best_inactive = candidates
      .into_iter()
      .max_by_key(|q| (q.scope.specificity(), q.created_at));
    Ok(match best_inactive {
      Some(q) => QuotaMatch::InactiveOnly(q),
      None => QuotaMatch::NoMatch,
    })
  }

  async fn edit_quota(&self, id: Uuid, edit: QuotaEdit) -> Result<Quota> {
    let quota = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_str = encode_uuid(id);
        let mut quota =
          load_quota(&tx, &id_str)?.ok_or_else(|| reject(CoreError::QuotaNotFound(id)))?;

        edit.apply(&mut quota).map_err(reject)?;

        tx.execute(
          "UPDATE quotas SET
             total_allowed_area = ?1, season_start = ?2, season_end = ?3,
             max_per_farmer = ?4, is_active = ?5
           WHERE quota_id = ?6",
          rusqlite::params![
            quota.total_allowed_area,
            encode_date(quota.season.start),
            encode_date(quota.season.end),
            quota.max_per_farmer,
            quota.is_active,
            id_str,
          ],
        )?;
        tx.commit()?;
        Ok(quota)
      })
      .await?;

    Ok(quota)
  }

  // ── Cultivation lifecycle ─────────────────────────────────────────────────

  async fn start_cultivation(
    &self,
    request: CultivationRequest,
  ) -> Result<(Cultivation, Vec<Notification>)> {
    // Optimistic pass, unlocked: exists only to fail fast with a legible
    // error before paying for the lock. Never trusted for the mutation.
    let quota = self
      .find_matching_quota(&request.location, &request.crop_name, request.cultivation_start)
      .await?
      .into_result()?;
    checks::check_window(&quota, request.cultivation_start, request.expected_harvest)?;
    checks::check_area_available(&quota, request.requested_area)?;
    let existing = self
      .farmer_holdings_unlocked(quota.quota_id, request.farmer_id)
      .await?;
    checks::check_per_farmer_limit(&quota, existing, request.requested_area)?;

    // Locked pass: re-read and re-validate everything against current
    // state, then allocate and create — one atomic transaction.
    let quota_id = quota.quota_id;
    let (cultivation, notifications) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let quota_id_str = encode_uuid(quota_id);
        let mut quota = load_quota(&tx, &quota_id_str)?
          .ok_or_else(|| reject(CoreError::QuotaNotFound(quota_id)))?;
        if !quota.is_active {
          return Err(reject(CoreError::QuotaInactive(quota_id)));
        }
        checks::check_window(&quota, request.cultivation_start, request.expected_harvest)
          .map_err(reject)?;
        checks::check_area_available(&quota, request.requested_area).map_err(reject)?;
        let farmer_id_str = encode_uuid(request.farmer_id);
        let existing = farmer_holdings(&tx, &quota_id_str, &farmer_id_str)?;
        checks::check_per_farmer_limit(&quota, existing, request.requested_area)
          .map_err(reject)?;

        let utilization_before = quota.utilization();
        quota
          .allocate_area(request.requested_area, true)
          .map_err(reject)?;
        let utilization_after = quota.utilization();

        let cultivation = Cultivation {
          cultivation_id:            Uuid::new_v4(),
          farmer_id:                 request.farmer_id,
          quota_id,
          crop_name:                 request.crop_name.clone(),
          requested_area:            request.requested_area,
          cultivation_start:         request.cultivation_start,
          expected_harvest:          request.expected_harvest,
          estimated_yield:           request.estimated_yield,
          status:                    CultivationStatus::Planned,
          actual_yield:              None,
          max_allowed_sale_quantity: None,
          created_at:                Utc::now(),
        };

        save_quota_counts(&tx, &quota)?;
        insert_cultivation(&tx, &cultivation)?;
        tx.commit()?;

        let mut notifications = Vec::new();
        if utilization_before < NEAR_EXHAUSTION_THRESHOLD
          && utilization_after >= NEAR_EXHAUSTION_THRESHOLD
        {
          notifications.push(Notification::QuotaNearExhaustion {
            quota_id,
            crop_name: quota.crop_name.clone(),
            utilization: utilization_after,
          });
        }
        Ok((cultivation, notifications))
      })
      .await?;

    tracing::debug!(
      cultivation_id = %cultivation.cultivation_id,
      quota_id = %cultivation.quota_id,
      area = cultivation.requested_area,
      "allocated quota area"
    );
    Ok((cultivation, notifications))
  }

  async fn get_cultivation(&self, id: Uuid) -> Result<Option<Cultivation>> {
    let id_str = encode_uuid(id);
    Ok(
      self
        .conn
        .call(move |conn| load_cultivation(conn, &id_str))
        .await?,
    )
  }

  async fn list_cultivations(&self, farmer_id: Option<Uuid>) -> Result<Vec<Cultivation>> {
    let farmer_str = farmer_id.map(encode_uuid);

    let raws: Vec<RawCultivation> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(f) = farmer_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cultivations WHERE farmer_id = ?1 ORDER BY created_at DESC",
            RawCultivation::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![f], RawCultivation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cultivations ORDER BY created_at DESC",
            RawCultivation::COLUMNS
          ))?;
          stmt
            .query_map([], RawCultivation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCultivation::into_cultivation).collect()
  }

  async fn mark_active(&self, id: Uuid) -> Result<Cultivation> {
    let cultivation = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_str = encode_uuid(id);
        let mut cultivation = load_cultivation(&tx, &id_str)?
          .ok_or_else(|| reject(CoreError::CultivationNotFound(id)))?;
        checks::check_activatable(cultivation.status).map_err(reject)?;

        cultivation.status = CultivationStatus::Active;
        save_cultivation_state(&tx, &cultivation)?;
        tx.commit()?;
        Ok(cultivation)
      })
      .await?;
    Ok(cultivation)
  }

  async fn cancel_cultivation(&self, id: Uuid) -> Result<Cultivation> {
    self
      .release_and_close(id, CultivationStatus::Cancelled, checks::check_cancellable)
      .await
  }

  async fn mark_failed(&self, id: Uuid) -> Result<Cultivation> {
    self
      .release_and_close(id, CultivationStatus::Failed, checks::check_failable)
      .await
  }

  async fn submit_harvest(
    &self,
    id: Uuid,
    submission: HarvestSubmission,
  ) -> Result<Cultivation> {
    let cultivation = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_str = encode_uuid(id);
        let mut cultivation = load_cultivation(&tx, &id_str)?
          .ok_or_else(|| reject(CoreError::CultivationNotFound(id)))?;
        checks::check_harvestable(cultivation.status).map_err(reject)?;

        let quota_id = cultivation.quota_id;
        let quota_id_str = encode_uuid(quota_id);
        let quota = load_quota(&tx, &quota_id_str)?
          .ok_or_else(|| reject(CoreError::QuotaNotFound(quota_id)))?;

        quota.season.check_contains(submission.harvest_date).map_err(reject)?;
        checks::check_yield_tolerance(cultivation.estimated_yield, submission.quantity)
          .map_err(reject)?;

        cultivation.actual_yield = Some(submission.quantity);
        cultivation.max_allowed_sale_quantity = Some(submission.quantity);
        cultivation.status = CultivationStatus::Harvested;

        save_cultivation_state(&tx, &cultivation)?;
        tx.commit()?;
        Ok(cultivation)
      })
      .await?;
    Ok(cultivation)
  }

  // ── Sales ─────────────────────────────────────────────────────────────────

  async fn record_sale(&self, input: NewSale) -> Result<(HarvestSale, Vec<Notification>)> {
    let out = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cultivation_id = input.cultivation_id;
        let id_str = encode_uuid(cultivation_id);
        let cultivation = load_cultivation(&tx, &id_str)?
          .ok_or_else(|| reject(CoreError::CultivationNotFound(cultivation_id)))?;
        checks::check_sellable(cultivation.status).map_err(reject)?;

        // Remaining quantity is recomputed over the sale rows inside this
        // same transaction — never a cached counter, never a stale read.
        let cap = cultivation.max_allowed_sale_quantity.unwrap_or(0.0);
        let sold = sales_total(&tx, &id_str)?;
        let remaining = cap - sold;
        checks::check_sale_quantity(remaining, input.quantity).map_err(reject)?;

        let sale = HarvestSale {
          sale_id:        Uuid::new_v4(),
          cultivation_id,
          quantity:       input.quantity,
          recorded_at:    Utc::now(),
        };
        tx.execute(
          "INSERT INTO harvest_sales (sale_id, cultivation_id, quantity, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            encode_uuid(sale.sale_id),
            id_str,
            sale.quantity,
            encode_dt(sale.recorded_at),
          ],
        )?;
        tx.commit()?;

        let notifications = vec![Notification::SaleRecorded {
          sale_id:        sale.sale_id,
          cultivation_id,
          farmer_id:      cultivation.farmer_id,
          crop_name:      cultivation.crop_name.clone(),
          quantity:       sale.quantity,
          remaining:      remaining - sale.quantity,
        }];
        Ok((sale, notifications))
      })
      .await?;
    Ok(out)
  }

  async fn remaining_quantity(&self, cultivation_id: Uuid) -> Result<f64> {
    let id_str = encode_uuid(cultivation_id);
    Ok(
      self
        .conn
        .call(move |conn| {
          let cultivation = load_cultivation(conn, &id_str)?
            .ok_or_else(|| reject(CoreError::CultivationNotFound(cultivation_id)))?;
          let cap = cultivation.max_allowed_sale_quantity.unwrap_or(0.0);
          let sold = sales_total(conn, &id_str)?;
          Ok(cap - sold)
        })
        .await?,
    )
  }

  async fn list_sales(&self, cultivation_id: Uuid) -> Result<Vec<HarvestSale>> {
    let id_str = encode_uuid(cultivation_id);

    let raws: Vec<RawSale> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM harvest_sales WHERE cultivation_id = ?1 ORDER BY recorded_at",
          RawSale::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawSale::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSale::into_sale).collect()
  }
}

// ─── Closure-side helpers ────────────────────────────────────────────────────
//
// These run on the database thread, inside `conn.call` closures, and so
// return `tokio_rusqlite::Error`. Domain failures travel out boxed as
// `Other` and are unwrapped by the normalisation in `error.rs`.

/// Wrap a domain failure for transport out of a `conn.call` closure.
fn reject(e: impl Into<CoreError>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

fn load_quota(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> std::result::Result<Option<Quota>, tokio_rusqlite::Error> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM quotas WHERE quota_id = ?1", RawQuota::COLUMNS),
      rusqlite::params![id_str],
      RawQuota::from_row,
    )
    .optional()?;
  raw
    .map(|r| r.into_quota().map_err(|e| reject(CoreError::from(e))))
    .transpose()
}

fn load_cultivation(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> std::result::Result<Option<Cultivation>, tokio_rusqlite::Error> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM cultivations WHERE cultivation_id = ?1",
        RawCultivation::COLUMNS
      ),
      rusqlite::params![id_str],
      RawCultivation::from_row,
    )
    .optional()?;
  raw
    .map(|r| r.into_cultivation().map_err(|e| reject(CoreError::from(e))))
    .transpose()
}

/// A farmer's summed area across their planned/active cultivations under a
/// specific quota.
fn farmer_holdings(
  conn: &rusqlite::Connection,
  quota_id_str: &str,
  farmer_id_str: &str,
) -> std::result::Result<f64, tokio_rusqlite::Error> {
  let sum: f64 = conn.query_row(
    "SELECT COALESCE(SUM(requested_area), 0)
     FROM cultivations
     WHERE quota_id = ?1 AND farmer_id = ?2 AND status IN ('planned', 'active')",
    rusqlite::params![quota_id_str, farmer_id_str],
    |row| row.get(0),
  )?;
  Ok(sum)
}

/// Sum over all sale rows for a cultivation.
fn sales_total(
  conn: &rusqlite::Connection,
  cultivation_id_str: &str,
) -> std::result::Result<f64, tokio_rusqlite::Error> {
  let sum: f64 = conn.query_row(
    "SELECT COALESCE(SUM(quantity), 0) FROM harvest_sales WHERE cultivation_id = ?1",
    rusqlite::params![cultivation_id_str],
    |row| row.get(0),
  )?;
  Ok(sum)
}

/// Persist the allocation counters after an allocate or release.
fn save_quota_counts(
  conn: &rusqlite::Connection,
  quota: &Quota,
) -> std::result::Result<(), tokio_rusqlite::Error> {
  conn.execute(
    "UPDATE quotas SET allocated_area = ?1, allocated_farmer_count = ?2
     WHERE quota_id = ?3",
    rusqlite::params![
      quota.allocated_area,
      quota.allocated_farmer_count,
      encode_uuid(quota.quota_id),
    ],
  )?;
  Ok(())
}

/// Persist the mutable cultivation fields (status and harvest outcome).
fn save_cultivation_state(
  conn: &rusqlite::Connection,
  cultivation: &Cultivation,
) -> std::result::Result<(), tokio_rusqlite::Error> {
  conn.execute(
    "UPDATE cultivations SET status = ?1, actual_yield = ?2,
       max_allowed_sale_quantity = ?3
     WHERE cultivation_id = ?4",
    rusqlite::params![
      encode_status(cultivation.status),
      cultivation.actual_yield,
      cultivation.max_allowed_sale_quantity,
      encode_uuid(cultivation.cultivation_id),
    ],
  )?;
  Ok(())
}

fn insert_cultivation(
  conn: &rusqlite::Connection,
  cultivation: &Cultivation,
) -> std::result::Result<(), tokio_rusqlite::Error> {
  conn.execute(
    "INSERT INTO cultivations (
       cultivation_id, farmer_id, quota_id, crop_name, requested_area,
       cultivation_start, expected_harvest, estimated_yield, status,
       actual_yield, max_allowed_sale_quantity, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      encode_uuid(cultivation.cultivation_id),
      encode_uuid(cultivation.farmer_id),
      encode_uuid(cultivation.quota_id),
      cultivation.crop_name,
      cultivation.requested_area,
      encode_date(cultivation.cultivation_start),
      encode_date(cultivation.expected_harvest),
      cultivation.estimated_yield,
      encode_status(cultivation.status),
      cultivation.actual_yield,
      cultivation.max_allowed_sale_quantity,
      encode_dt(cultivation.created_at),
    ],
  )?;
  Ok(())
}
