//! JSON API for the oifind query engine.
//!
//! Exposes an axum [`Router`] backed by any [`oifind_core::backend::Backend`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", oifind_api::api_router(store.clone(), Finder::new()))
//! ```

pub mod error;
pub mod query;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use oifind_core::{backend::Backend, finder::Finder};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handler state: the store plus the engine settings.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub finder: Finder,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), finder: self.finder.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, finder: Finder) -> Router<()>
where
  S: Backend + 'static,
{
  Router::new()
    .route("/query", post(query::handler::<S>))
    .route("/health", get(health))
    .layer(TraceLayer::new_for_http())
    .with_state(ApiState { store, finder })
}

/// `GET /health`
async fn health() -> &'static str { "ok" }

#[cfg(test)]
mod tests;
