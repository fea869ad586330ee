//! SQLite backend for the fieldcap quota engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every allocation-mutating
//! operation runs inside a `BEGIN IMMEDIATE` transaction, which takes the
//! database write lock up front — a strictly stronger lease than the
//! per-quota row lock the core contract requires.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
