//! The `PhraseStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `potd-store-sqlite`).
//! The rotation engine depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  clock::DayWindow,
  phrase::{Difficulty, NewPhrase, Phrase, PhraseUpdate},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which phrases a query may see. Every read takes one explicitly so the
/// soft-delete filter cannot be forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  /// Only phrases with `active = true`.
  ActiveOnly,
  /// Soft-deleted phrases too; admin views only.
  IncludeInactive,
}

/// A conditional write marking a phrase as today's selection.
///
/// Backends must apply it as one atomic operation that succeeds only when
/// - the phrase is still active and of `difficulty`,
/// - its `used_on` still equals `expected_used_on` (both `None` included), and
/// - no other active phrase of `difficulty` has `used_on` inside `window`, and
/// - `at` itself lies inside `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
  pub phrase_id:        Uuid,
  pub difficulty:       Difficulty,
  pub expected_used_on: Option<DateTime<Utc>>,
  pub window:           DayWindow,
  /// The new `used_on` value.
  pub at:               DateTime<Utc>,
}

/// Usage counts for one difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
  pub difficulty: Difficulty,
  pub total:      u64,
  pub used:       u64,
  pub unused:     u64,
}

/// Usage counts across the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseStats {
  pub total:         u64,
  pub used:          u64,
  pub unused:        u64,
  /// One entry per tier, in tier order, including empty tiers.
  pub by_difficulty: Vec<TierStats>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a phrase collection backend.
///
/// Lookups return `Ok(None)` when nothing matches; by-id mutations return
/// `Ok(None)` when the id is unknown (or not visible).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PhraseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── CRUD ──────────────────────────────────────────────────────────────

  /// Persist a new, active, never-used phrase. The store assigns the id;
  /// `created_at` and `updated_at` are both set to `at`.
  fn insert(
    &self,
    input: NewPhrase,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Phrase, Self::Error>> + Send + '_;

  fn get(
    &self,
    id: Uuid,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// All visible phrases, newest `created_at` first.
  fn list(
    &self,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Vec<Phrase>, Self::Error>> + Send + '_;

  /// Apply an admin edit. Never touches `used_on` or `active`.
  fn update(
    &self,
    id: Uuid,
    visibility: Visibility,
    update: PhraseUpdate,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// Set the soft-delete flag.
  fn set_active(
    &self,
    id: Uuid,
    active: bool,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// Set `used_on` back to `None`.
  fn clear_usage(
    &self,
    id: Uuid,
    visibility: Visibility,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  // ── Rotation lookups ──────────────────────────────────────────────────

  /// A phrase of `difficulty` whose `used_on` lies in `window`.
  fn find_used_within(
    &self,
    difficulty: Difficulty,
    window: DayWindow,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// The never-used phrase of `difficulty` with the oldest `created_at`,
  /// ties broken by ascending id. Only phrases created before
  /// `created_before` qualify.
  fn find_oldest_fresh(
    &self,
    difficulty: Difficulty,
    created_before: DateTime<Utc>,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// The phrase of `difficulty` with the oldest `used_on`, ties broken by
  /// ascending id. Only phrases created before `created_before` qualify.
  fn find_least_recently_used(
    &self,
    difficulty: Difficulty,
    created_before: DateTime<Utc>,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// Atomically apply `claim`. Returns the updated phrase, or `None` if any
  /// of the claim's conditions no longer held.
  fn claim(
    &self,
    claim: Claim,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  // ── Observability ─────────────────────────────────────────────────────

  fn stats(
    &self,
    visibility: Visibility,
  ) -> impl Future<Output = Result<PhraseStats, Self::Error>> + Send + '_;

  /// Cheap round trip used by health checks.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
