//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, agronomic dates as ISO 8601
//! calendar dates, UUIDs as hyphenated lowercase strings, and statuses as
//! their lowercase discriminants.

use chrono::{DateTime, NaiveDate, Utc};
use fieldcap_core::{
  cultivation::{Cultivation, CultivationStatus},
  quota::{Quota, SeasonWindow},
  sale::HarvestSale,
  scope::GeoScope,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps and dates ────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── CultivationStatus ───────────────────────────────────────────────────────

pub fn encode_status(s: CultivationStatus) -> &'static str {
  match s {
    CultivationStatus::Planned => "planned",
    CultivationStatus::Active => "active",
    CultivationStatus::Harvested => "harvested",
    CultivationStatus::Cancelled => "cancelled",
    CultivationStatus::Failed => "failed",
  }
}

pub fn decode_status(s: &str) -> Result<CultivationStatus> {
  match s {
    "planned" => Ok(CultivationStatus::Planned),
    "active" => Ok(CultivationStatus::Active),
    "harvested" => Ok(CultivationStatus::Harvested),
    "cancelled" => Ok(CultivationStatus::Cancelled),
    "failed" => Ok(CultivationStatus::Failed),
    other => Err(Error::Decode(format!("unknown cultivation status: {other:?}"))),
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `quotas` row as read from SQLite, before decoding.
pub struct RawQuota {
  pub quota_id:               String,
  pub country:                Option<String>,
  pub state:                  Option<String>,
  pub district:               Option<String>,
  pub taluk:                  Option<String>,
  pub village:                Option<String>,
  pub crop_name:              String,
  pub season_start:           String,
  pub season_end:             String,
  pub total_allowed_area:     f64,
  pub allocated_area:         f64,
  pub max_per_farmer:         Option<f64>,
  pub allocated_farmer_count: i64,
  pub is_active:              bool,
  pub created_at:             String,
}

impl RawQuota {
  /// Column list matching the field order of [`RawQuota::from_row`].
  pub const COLUMNS: &'static str = "quota_id, country, state, district, taluk, \
     village, crop_name, season_start, season_end, total_allowed_area, \
     allocated_area, max_per_farmer, allocated_farmer_count, is_active, \
     created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      quota_id:               row.get(0)?,
      country:                row.get(1)?,
      state:                  row.get(2)?,
      district:               row.get(3)?,
      taluk:                  row.get(4)?,
      village:                row.get(5)?,
      crop_name:              row.get(6)?,
      season_start:           row.get(7)?,
      season_end:             row.get(8)?,
      total_allowed_area:     row.get(9)?,
      allocated_area:         row.get(10)?,
      max_per_farmer:         row.get(11)?,
      allocated_farmer_count: row.get(12)?,
      is_active:              row.get(13)?,
      created_at:             row.get(14)?,
    })
  }

  pub fn into_quota(self) -> Result<Quota> {
    Ok(Quota {
      quota_id:               decode_uuid(&self.quota_id)?,
      scope:                  GeoScope {
        country:  self.country,
        state:    self.state,
        district: self.district,
        taluk:    self.taluk,
        village:  self.village,
      },
      crop_name:              self.crop_name,
      season:                 SeasonWindow {
        start: decode_date(&self.season_start)?,
        end:   decode_date(&self.season_end)?,
      },
      total_allowed_area:     self.total_allowed_area,
      allocated_area:         self.allocated_area,
      max_per_farmer:         self.max_per_farmer,
      allocated_farmer_count: self.allocated_farmer_count.max(0) as u32,
      is_active:              self.is_active,
      created_at:             decode_dt(&self.created_at)?,
    })
  }
}

/// A `cultivations` row as read from SQLite, before decoding.
pub struct RawCultivation {
  pub cultivation_id:            String,
  pub farmer_id:                 String,
  pub quota_id:                  String,
  pub crop_name:                 String,
  pub requested_area:            f64,
  pub cultivation_start:         String,
  pub expected_harvest:          String,
  pub estimated_yield:           Option<f64>,
  pub status:                    String,
  pub actual_yield:              Option<f64>,
  pub max_allowed_sale_quantity: Option<f64>,
  pub created_at:                String,
}

impl RawCultivation {
  pub const COLUMNS: &'static str = "cultivation_id, farmer_id, quota_id, \
     crop_name, requested_area, cultivation_start, expected_harvest, \
     estimated_yield, status, actual_yield, max_allowed_sale_quantity, \
     created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      cultivation_id:            row.get(0)?,
      farmer_id:                 row.get(1)?,
      quota_id:                  row.get(2)?,
      crop_name:                 row.get(3)?,
      requested_area:            row.get(4)?,
      cultivation_start:         row.get(5)?,
      expected_harvest:          row.get(6)?,
      estimated_yield:           row.get(7)?,
      status:                    row.get(8)?,
      actual_yield:              row.get(9)?,
      max_allowed_sale_quantity: row.get(10)?,
      created_at:                row.get(11)?,
    })
  }

  pub fn into_cultivation(self) -> Result<Cultivation> {
    Ok(Cultivation {
      cultivation_id:            decode_uuid(&self.cultivation_id)?,
      farmer_id:                 decode_uuid(&self.farmer_id)?,
      quota_id:                  decode_uuid(&self.quota_id)?,
      crop_name:                 self.crop_name,
      requested_area:            self.requested_area,
      cultivation_start:         decode_date(&self.cultivation_start)?,
      expected_harvest:          decode_date(&self.expected_harvest)?,
      estimated_yield:           self.estimated_yield,
      status:                    decode_status(&self.status)?,
      actual_yield:              self.actual_yield,
      max_allowed_sale_quantity: self.max_allowed_sale_quantity,
      created_at:                decode_dt(&self.created_at)?,
    })
  }
}

/// A `harvest_sales` row as read from SQLite, before decoding.
pub struct RawSale {
  pub sale_id:        String,
  pub cultivation_id: String,
  pub quantity:       f64,
  pub recorded_at:    String,
}

impl RawSale {
  pub const COLUMNS: &'static str = "sale_id, cultivation_id, quantity, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sale_id:        row.get(0)?,
      cultivation_id: row.get(1)?,
      quantity:       row.get(2)?,
      recorded_at:    row.get(3)?,
    })
  }

  pub fn into_sale(self) -> Result<HarvestSale> {
    Ok(HarvestSale {
      sale_id:        decode_uuid(&self.sale_id)?,
      cultivation_id: decode_uuid(&self.cultivation_id)?,
      quantity:       self.quantity,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}
