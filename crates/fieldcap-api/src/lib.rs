//! JSON REST API for fieldcap.
//!
//! Exposes an axum [`Router`] backed by any [`fieldcap_core::store::QuotaStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility — the
//! handlers assume an already-authenticated farmer/admin identity arrives
//! in the request body.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", fieldcap_api::api_router(store.clone()))
//! ```

pub mod cultivations;
pub mod error;
pub mod quotas;
pub mod sales;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use fieldcap_core::store::QuotaStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: QuotaStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Quotas (admin surface)
    .route("/quotas", get(quotas::list::<S>).post(quotas::create::<S>))
    .route("/quotas/{id}", get(quotas::get_one::<S>).patch(quotas::edit::<S>))
    // Cultivation lifecycle
    .route(
      "/cultivations",
      get(cultivations::list::<S>).post(cultivations::start::<S>),
    )
    .route("/cultivations/{id}", get(cultivations::get_one::<S>))
    .route("/cultivations/{id}/activate", post(cultivations::activate::<S>))
    .route("/cultivations/{id}/cancel", post(cultivations::cancel::<S>))
    .route("/cultivations/{id}/fail", post(cultivations::fail::<S>))
    .route("/cultivations/{id}/harvest", post(cultivations::harvest::<S>))
    // Sales
    .route(
      "/cultivations/{id}/sales",
      get(sales::list::<S>).post(sales::create::<S>),
    )
    .route("/cultivations/{id}/remaining", get(sales::remaining::<S>))
    .with_state(store)
}
