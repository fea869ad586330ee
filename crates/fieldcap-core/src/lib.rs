//! Core types and trait definitions for the fieldcap quota engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It owns the domain model (quotas, cultivations, harvest sales), the
//! validation rules that enforce the allocation invariants, and the
//! [`store::QuotaStore`] trait that storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod checks;
pub mod cultivation;
pub mod error;
pub mod event;
pub mod quota;
pub mod sale;
pub mod scope;
pub mod store;

pub use error::{Error, Result};
