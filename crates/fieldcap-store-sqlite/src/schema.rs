//! SQL schema for the fieldcap SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The CHECK constraints are a backstop only: the allocation invariant is
/// enforced in code under the quota lock, and a CHECK firing in production
/// indicates a bug, surfaced to callers as `ConcurrentModification`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS quotas (
    quota_id               TEXT PRIMARY KEY,
    country                TEXT,            -- NULL at any level = wildcard
    state                  TEXT,
    district               TEXT,
    taluk                  TEXT,
    village                TEXT,
    crop_name              TEXT NOT NULL,
    season_start           TEXT NOT NULL,   -- ISO 8601 date, inclusive
    season_end             TEXT NOT NULL,   -- ISO 8601 date, inclusive
    total_allowed_area     REAL NOT NULL CHECK (total_allowed_area >= 0),
    allocated_area         REAL NOT NULL DEFAULT 0 CHECK (allocated_area >= 0),
    max_per_farmer         REAL CHECK (max_per_farmer IS NULL OR max_per_farmer >= 0),
    allocated_farmer_count INTEGER NOT NULL DEFAULT 0,
    is_active              INTEGER NOT NULL DEFAULT 1,
    created_at             TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    CHECK (allocated_area <= total_allowed_area)
);

CREATE TABLE IF NOT EXISTS cultivations (
    cultivation_id            TEXT PRIMARY KEY,
    farmer_id                 TEXT NOT NULL,
    quota_id                  TEXT NOT NULL REFERENCES quotas(quota_id),
    crop_name                 TEXT NOT NULL,
    requested_area            REAL NOT NULL CHECK (requested_area > 0),
    cultivation_start         TEXT NOT NULL,
    expected_harvest          TEXT NOT NULL,
    estimated_yield           REAL,
    status                    TEXT NOT NULL, -- 'planned'|'active'|'harvested'|'cancelled'|'failed'
    actual_yield              REAL,
    max_allowed_sale_quantity REAL,
    created_at                TEXT NOT NULL
);

-- Sales are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS harvest_sales (
    sale_id        TEXT PRIMARY KEY,
    cultivation_id TEXT NOT NULL REFERENCES cultivations(cultivation_id),
    quantity       REAL NOT NULL CHECK (quantity > 0),
    recorded_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS quotas_crop_idx         ON quotas(crop_name);
CREATE INDEX IF NOT EXISTS cultivations_quota_idx  ON cultivations(quota_id);
CREATE INDEX IF NOT EXISTS cultivations_farmer_idx ON cultivations(farmer_id);
CREATE INDEX IF NOT EXISTS sales_cultivation_idx   ON harvest_sales(cultivation_id);

PRAGMA user_version = 1;
";
