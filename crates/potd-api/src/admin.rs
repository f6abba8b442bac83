//! Admin endpoints. All require HTTP Basic auth.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/phrases` | `?include_inactive=true` adds soft-deleted phrases |
//! | `POST`   | `/phrases` | Body: [`NewPhrase`]; returns 201 + stored phrase |
//! | `GET`    | `/phrases/{id}` | Any phrase, soft-deleted or not |
//! | `PUT`    | `/phrases/{id}` | Body: [`PhraseUpdate`] |
//! | `DELETE` | `/phrases/{id}` | Soft delete |
//! | `POST`   | `/phrases/{id}/restore` | Undo soft delete |
//! | `POST`   | `/phrases/{id}/reset-usage` | Return to the fresh pool |
//! | `GET`    | `/stats` | Usage counts over active phrases |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use potd_core::{
  clock::Clock,
  phrase::{NewPhrase, Phrase, PhraseUpdate},
  store::{PhraseStats, PhraseStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{self, Path, Query},
};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_inactive: bool,
}

/// `GET /phrases[?include_inactive=true]`
pub async fn list<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Phrase>>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let phrases = if params.include_inactive {
    state.engine.list_all().await?
  } else {
    state.engine.list_active().await?
  };
  Ok(Json(phrases))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /phrases`
pub async fn create<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  extract::Json(body): extract::Json<NewPhrase>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  let phrase = state.engine.create(body).await?;
  Ok((StatusCode::CREATED, Json(phrase)))
}

// ─── Single phrase ───────────────────────────────────────────────────────────

/// `GET /phrases/{id}`
pub async fn get_one<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Phrase>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.get_any(id).await?))
}

/// `PUT /phrases/{id}`
pub async fn update<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
  extract::Json(body): extract::Json<PhraseUpdate>,
) -> Result<Json<Phrase>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.update(id, body).await?))
}

/// `DELETE /phrases/{id}`
pub async fn soft_delete<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Phrase>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.soft_delete(id).await?))
}

/// `POST /phrases/{id}/restore`
pub async fn restore<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Phrase>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.restore(id).await?))
}

/// `POST /phrases/{id}/reset-usage`
pub async fn reset_usage<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Phrase>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.reset_usage(id).await?))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /stats`
pub async fn stats<S, C>(
  _auth: Authenticated,
  State(state): State<AppState<S, C>>,
) -> Result<Json<PhraseStats>, ApiError>
where
  S: PhraseStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(state.engine.stats().await?))
}
