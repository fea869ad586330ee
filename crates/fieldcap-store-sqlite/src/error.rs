//! Error type for `fieldcap-store-sqlite`, and its normalisation into the
//! core taxonomy.
//!
//! The core contract says no raw storage error may surface unfiltered to
//! callers: the `From<Error> for fieldcap_core::Error` impl is that
//! boundary. Busy locks become `LockTimeout`, constraint violations become
//! `ConcurrentModification`, everything else is wrapped as `Internal`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] fieldcap_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("decode error: {0}")]
  Decode(String),
}

impl From<Error> for fieldcap_core::Error {
  fn from(e: Error) -> Self {
    use fieldcap_core::Error as Core;
    match e {
      Error::Core(inner) => inner,
      Error::Database(db) => normalize_db(db),
      Error::Uuid(e) => Core::Internal(e.to_string()),
      Error::DateParse(msg) => Core::Internal(msg),
      Error::Decode(msg) => Core::Internal(msg),
    }
  }
}

fn normalize_db(e: tokio_rusqlite::Error) -> fieldcap_core::Error {
  use fieldcap_core::Error as Core;
  match e {
    // Domain failures raised inside a `conn.call` closure travel out as
    // boxed `Other` errors; unwrap them back into the taxonomy.
    tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Core>() {
      Ok(core) => *core,
      Err(other) => Core::Internal(other.to_string()),
    },
    tokio_rusqlite::Error::Rusqlite(sql) => normalize_sqlite(sql),
    other => Core::Internal(other.to_string()),
  }
}

fn normalize_sqlite(e: rusqlite::Error) -> fieldcap_core::Error {
  use fieldcap_core::Error as Core;
  use rusqlite::ErrorCode;

  match &e {
    rusqlite::Error::SqliteFailure(f, _) => match f.code {
      ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Core::LockTimeout,
      ErrorCode::ConstraintViolation => Core::ConcurrentModification,
      _ => Core::Internal(e.to_string()),
    },
    _ => Core::Internal(e.to_string()),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
