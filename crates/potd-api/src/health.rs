//! `GET /health`: service liveness plus store connectivity.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use potd_core::{clock::Clock, store::PhraseStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
  Ok,
  Degraded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHealth {
  pub connected: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:     Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
  pub status:    HealthStatus,
  pub service:   String,
  pub version:   String,
  pub timestamp: DateTime<Utc>,
  pub store:     StoreHealth,
}

/// Always answers 200; a failing store shows up as `DEGRADED`.
pub async fn handler<S, C>(State(state): State<AppState<S, C>>) -> Json<HealthResponse>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let (status, store) = match state.engine.ping().await {
    Ok(()) => (HealthStatus::Ok, StoreHealth { connected: true, error: None }),
    Err(e) => {
      warn!(error = %e, "store ping failed");
      (
        HealthStatus::Degraded,
        StoreHealth { connected: false, error: Some(e.to_string()) },
      )
    }
  };

  Json(HealthResponse {
    status,
    service: env!("CARGO_PKG_NAME").to_owned(),
    version: env!("CARGO_PKG_VERSION").to_owned(),
    timestamp: state.engine.now(),
    store,
  })
}
