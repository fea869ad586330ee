//! The `QuotaStore` trait — the contract between the quota engine and its
//! storage backends.
//!
//! Backends must provide transactional semantics with an exclusive lease on
//! a quota for the duration of a transaction: any mutation of
//! `allocated_area` or `allocated_farmer_count`, and any sale insert, runs
//! inside such a transaction, with every validation re-run against the
//! locked state before the write. Any backend offering serializable
//! transactions or optimistic concurrency with retry can satisfy this.
//!
//! Higher layers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  cultivation::{Cultivation, CultivationRequest, HarvestSubmission},
  event::Notification,
  quota::{NewQuota, Quota, QuotaEdit, QuotaMatch},
  sale::{HarvestSale, NewSale},
  scope::Location,
};

/// Abstraction over a fieldcap storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes. Errors must convert into the core
/// [`Error`](crate::Error) taxonomy; backends normalise raw storage
/// failures (busy locks, constraint violations) rather than leaking them.
pub trait QuotaStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Quota registry ────────────────────────────────────────────────────

  /// Create a quota. `quota_id` and `created_at` are assigned by the store.
  fn add_quota(
    &self,
    input: NewQuota,
  ) -> impl Future<Output = Result<Quota, Self::Error>> + Send + '_;

  /// Retrieve a quota by id. Returns `None` if not found.
  fn get_quota(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Quota>, Self::Error>> + Send + '_;

  /// List quotas, optionally restricted to active ones.
  fn list_quotas(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Quota>, Self::Error>> + Send + '_;

  /// Resolve the single best quota for a request: the most specific active
  /// match over the geographic hierarchy, tie-broken by most recent
  /// creation. Quotas whose season already ended before `as_of` are not
  /// considered. An inactive-only match is reported distinctly.
  fn find_matching_quota<'a>(
    &'a self,
    location: &'a Location,
    crop: &'a str,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<QuotaMatch, Self::Error>> + Send + 'a;

  /// Apply an admin edit under the quota lock. Fails
  /// [`WouldViolateAllocation`](crate::Error::WouldViolateAllocation) if the
  /// new cap is below the current allocation. Never re-validates existing
  /// cultivations.
  fn edit_quota(
    &self,
    id: Uuid,
    edit: QuotaEdit,
  ) -> impl Future<Output = Result<Quota, Self::Error>> + Send + '_;

  // ── Cultivation lifecycle ─────────────────────────────────────────────

  /// The central admission path. Resolves the quota, validates the window,
  /// capacity, and per-farmer limit, then — inside one transaction holding
  /// the quota lock — re-validates against current state, allocates, and
  /// creates the cultivation with status `planned`. Any failure after lock
  /// acquisition rolls the whole transaction back.
  fn start_cultivation(
    &self,
    request: CultivationRequest,
  ) -> impl Future<Output = Result<(Cultivation, Vec<Notification>), Self::Error>> + Send + '_;

  fn get_cultivation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Cultivation>, Self::Error>> + Send + '_;

  /// List cultivations, optionally restricted to one farmer.
  fn list_cultivations(
    &self,
    farmer_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Cultivation>, Self::Error>> + Send + '_;

  /// `planned → active`.
  fn mark_active(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Cultivation, Self::Error>> + Send + '_;

  /// Cancel a planned or active cultivation, releasing its area exactly
  /// once. Not idempotent: a second cancel fails the state check.
  fn cancel_cultivation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Cultivation, Self::Error>> + Send + '_;

  /// Externally-triggered failure (crop loss, disaster); same release
  /// contract as cancellation.
  fn mark_failed(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Cultivation, Self::Error>> + Send + '_;

  /// Validate a harvest submission against the quota window and the yield
  /// tolerance; on success sets `actual_yield`, `max_allowed_sale_quantity`
  /// and moves to `harvested`.
  fn submit_harvest(
    &self,
    id: Uuid,
    submission: HarvestSubmission,
  ) -> impl Future<Output = Result<Cultivation, Self::Error>> + Send + '_;

  // ── Sales ─────────────────────────────────────────────────────────────

  /// Check the requested quantity against the remaining sellable quantity
  /// and insert the sale, both inside one transaction, so two concurrent
  /// sales cannot both pass against a stale read.
  fn record_sale(
    &self,
    input: NewSale,
  ) -> impl Future<Output = Result<(HarvestSale, Vec<Notification>), Self::Error>> + Send + '_;

  /// `max_allowed_sale_quantity` minus the sum over all existing sale rows.
  /// Always recomputed, never cached.
  fn remaining_quantity(
    &self,
    cultivation_id: Uuid,
  ) -> impl Future<Output = Result<f64, Self::Error>> + Send + '_;

  fn list_sales(
    &self,
    cultivation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<HarvestSale>, Self::Error>> + Send + '_;
}
