//! Public phrase endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/phrases` | `?level` (default `beginner`); today's phrase for the tier |
//! | `GET`  | `/phrases/{id}` | Active phrase by id |

use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use potd_core::{
  clock::Clock,
  phrase::{Difficulty, Phrase},
  store::PhraseStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  extract::{Path, Query},
};

// ─── Today ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TodayParams {
  /// Difficulty tier name. Defaults to `beginner`.
  pub level: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
  pub level:     Difficulty,
  /// The calendar day this phrase was selected for.
  pub date:      NaiveDate,
  pub timestamp: DateTime<Utc>,
  pub phrase:    Phrase,
}

/// `GET /phrases[?level=beginner|intermediate|advanced]`
pub async fn today<S, C>(
  State(state): State<AppState<S, C>>,
  Query(params): Query<TodayParams>,
) -> Result<Json<TodayResponse>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let level = match params.level.as_deref() {
    None | Some("") => Difficulty::default(),
    Some(s) => Difficulty::parse(s)?,
  };

  let phrase = state
    .engine
    .select_todays_within(level, state.selection_timeout)
    .await?;

  let timestamp = state.engine.now();
  let date = state
    .engine
    .boundary()
    .date(phrase.used_on.unwrap_or(timestamp));

  Ok(Json(TodayResponse { level, date, timestamp, phrase }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct PhraseResponse {
  pub phrase: Phrase,
}

/// `GET /phrases/{id}`
pub async fn get_one<S, C>(
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PhraseResponse>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let phrase = state.engine.get_by_id(id).await?;
  Ok(Json(PhraseResponse { phrase }))
}
