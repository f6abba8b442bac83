//! JSON REST API for the phrase of the day.
//!
//! Exposes axum [`Router`]s backed by a [`RotationEngine`] over any
//! [`PhraseStore`]. The public router serves today's phrase and health; the
//! admin router manages the collection behind HTTP Basic auth. Public routes
//! may be rate limited per client address ([`rate_limit`]); browser access is
//! governed by [`cors::layer`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = potd_api::router(state, "/api/v1", "/admin");
//! ```

pub mod admin;
pub mod auth;
pub mod cors;
pub mod error;
pub mod extract;
pub mod health;
pub mod phrases;
pub mod rate_limit;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  middleware,
  routing::{get, post},
};
use potd_core::{
  clock::{Clock, SystemClock},
  rotation::RotationEngine,
  store::PhraseStore,
};

pub use auth::AuthConfig;
pub use error::ApiError;
pub use rate_limit::RateLimit;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, C = SystemClock> {
  pub engine:            RotationEngine<S, C>,
  pub auth:              Arc<AuthConfig>,
  /// Upper bound on one `GET /phrases` selection.
  pub selection_timeout: Duration,
  /// Applied to the public routes only.
  pub rate_limit:        Option<Arc<RateLimit>>,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      engine:            self.engine.clone(),
      auth:              Arc::clone(&self.auth),
      selection_timeout: self.selection_timeout,
      rate_limit:        self.rate_limit.clone(),
    }
  }
}

// ─── Routers ─────────────────────────────────────────────────────────────────

/// Unauthenticated routes: today's phrase, phrase by id, health.
///
/// Wrapped in [`rate_limit::enforce`] when the state carries a limit.
pub fn public_router<S, C>(state: AppState<S, C>) -> Router<()>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let mut router = Router::new()
    .route("/phrases", get(phrases::today::<S, C>))
    .route("/phrases/{id}", get(phrases::get_one::<S, C>))
    .route("/health", get(health::handler::<S, C>));
  if let Some(limit) = state.rate_limit.clone() {
    router = router.layer(middleware::from_fn_with_state(limit, rate_limit::enforce));
  }
  router.with_state(state)
}

/// Collection management. Every handler requires [`auth::Authenticated`].
pub fn admin_router<S, C>(state: AppState<S, C>) -> Router<()>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    .route("/phrases", get(admin::list::<S, C>).post(admin::create::<S, C>))
    .route(
      "/phrases/{id}",
      get(admin::get_one::<S, C>)
        .put(admin::update::<S, C>)
        .delete(admin::soft_delete::<S, C>),
    )
    .route("/phrases/{id}/restore", post(admin::restore::<S, C>))
    .route("/phrases/{id}/reset-usage", post(admin::reset_usage::<S, C>))
    .route("/stats", get(admin::stats::<S, C>))
    .with_state(state)
}

/// Both routers mounted under their base paths.
///
/// A base of `""` or `"/"` merges the routes at the root.
pub fn router<S, C>(
  state: AppState<S, C>,
  api_base: &str,
  admin_base: &str,
) -> Router<()>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let app = mount(Router::new(), api_base, public_router(state.clone()));
  mount(app, admin_base, admin_router(state))
}

fn mount(parent: Router, base: &str, child: Router) -> Router {
  match base.trim_end_matches('/') {
    "" => parent.merge(child),
    base => parent.nest(base, child),
  }
}
