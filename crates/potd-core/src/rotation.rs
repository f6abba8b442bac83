//! [`RotationEngine`] selects and marks each tier's phrase of the day.
//!
//! Selection runs three lookups in order, stopping at the first hit:
//!
//! 1. a phrase already selected today (returned untouched),
//! 2. the oldest never-used phrase,
//! 3. the least recently used phrase.
//!
//! Steps 2 and 3 end in a [`Claim`], a conditional write that only succeeds if
//! nobody else has claimed a phrase for the tier today. A caller that loses
//! the claim re-runs step 1 and returns the winner's phrase.
//!
//! The engine keeps no state of its own between calls; today's pick is
//! derived entirely from `used_on` in the store.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::{Clock, DayBoundary, DayWindow, SystemClock},
  phrase::{Difficulty, NewPhrase, Phrase, PhraseUpdate},
  store::{Claim, PhraseStats, PhraseStore, Visibility},
};

// ─── Candidate ───────────────────────────────────────────────────────────────

/// Which lookup produced a phrase that still has to be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
  Fresh,
  Recycled,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The phrase rotation service.
///
/// Cloning is cheap; the store and clock are reference-counted.
pub struct RotationEngine<S, C = SystemClock> {
  store:    Arc<S>,
  clock:    Arc<C>,
  boundary: DayBoundary,
}

impl<S, C> Clone for RotationEngine<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      clock:    Arc::clone(&self.clock),
      boundary: self.boundary,
    }
  }
}

impl<S: PhraseStore> RotationEngine<S> {
  /// An engine on the system clock.
  pub fn with_system_clock(store: Arc<S>, boundary: DayBoundary) -> Self {
    Self::new(store, Arc::new(SystemClock), boundary)
  }
}

impl<S, C> RotationEngine<S, C>
where
  S: PhraseStore,
  C: Clock,
{
  pub fn new(store: Arc<S>, clock: Arc<C>, boundary: DayBoundary) -> Self {
    Self { store, clock, boundary }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn boundary(&self) -> DayBoundary { self.boundary }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// The calendar date selections are currently being made for.
  pub fn today(&self) -> NaiveDate { self.boundary.date(self.clock.now()) }

  // ── Selection ───────────────────────────────────────────────────────────

  /// Return today's phrase for `difficulty`, selecting one if none has been
  /// picked yet. Repeated calls on the same day return the same phrase.
  pub async fn select_todays(&self, difficulty: Difficulty) -> Result<Phrase> {
    let now = self.clock.now();
    let window = self.boundary.window(now);

    if let Some(phrase) = self.selected_within(difficulty, window).await? {
      debug!(%difficulty, id = %phrase.id, "already selected today");
      return Ok(phrase);
    }

    let (source, candidate) = match self.next_candidate(difficulty, window).await? {
      Some(found) => found,
      None => return Err(Error::NoContentAvailable(difficulty)),
    };

    let claim = Claim {
      phrase_id: candidate.id,
      difficulty,
      expected_used_on: candidate.used_on,
      window,
      // Keeps `used_on >= created_at` even if the clock lags the writer's.
      // Candidates are created before `window.end`, so this stays in today.
      at: now.max(candidate.created_at),
    };

    if let Some(phrase) = self.store.claim(claim).await.map_err(Error::store)? {
      match source {
        Source::Fresh => info!(%difficulty, id = %phrase.id, "selected fresh phrase"),
        Source::Recycled => info!(
          %difficulty,
          id = %phrase.id,
          previously_used_on = ?candidate.used_on,
          "recycled least recently used phrase"
        ),
      }
      return Ok(phrase);
    }

    warn!(%difficulty, id = %candidate.id, "lost claim, re-checking today's selection");
    self
      .selected_within(difficulty, window)
      .await?
      .ok_or(Error::SelectionConflict(difficulty))
  }

  /// [`Self::select_todays`] bounded by `deadline`.
  ///
  /// The claim is a single atomic write, so an abandoned selection has either
  /// been fully applied or not at all.
  pub async fn select_todays_within(
    &self,
    difficulty: Difficulty,
    deadline: Duration,
  ) -> Result<Phrase> {
    match tokio::time::timeout(deadline, self.select_todays(difficulty)).await {
      Ok(result) => result,
      Err(_) => {
        warn!(%difficulty, ?deadline, "selection timed out");
        Err(Error::Timeout(deadline))
      }
    }
  }

  async fn selected_within(
    &self,
    difficulty: Difficulty,
    window: DayWindow,
  ) -> Result<Option<Phrase>> {
    self
      .store
      .find_used_within(difficulty, window, Visibility::ActiveOnly)
      .await
      .map_err(Error::store)
  }

  /// Phrases created after today (by a writer whose clock runs ahead) are
  /// not eligible yet; claiming one would stamp a `used_on` outside today.
  async fn next_candidate(
    &self,
    difficulty: Difficulty,
    window: DayWindow,
  ) -> Result<Option<(Source, Phrase)>> {
    if let Some(p) = self
      .store
      .find_oldest_fresh(difficulty, window.end, Visibility::ActiveOnly)
      .await
      .map_err(Error::store)?
    {
      return Ok(Some((Source::Fresh, p)));
    }

    Ok(
      self
        .store
        .find_least_recently_used(difficulty, window.end, Visibility::ActiveOnly)
        .await
        .map_err(Error::store)?
        .map(|p| (Source::Recycled, p)),
    )
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// An active phrase by id.
  pub async fn get_by_id(&self, id: Uuid) -> Result<Phrase> {
    self
      .store
      .get(id, Visibility::ActiveOnly)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))
  }

  /// A phrase by id, soft-deleted or not.
  pub async fn get_any(&self, id: Uuid) -> Result<Phrase> {
    self
      .store
      .get(id, Visibility::IncludeInactive)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))
  }

  /// All active phrases, newest first.
  pub async fn list_active(&self) -> Result<Vec<Phrase>> {
    self
      .store
      .list(Visibility::ActiveOnly)
      .await
      .map_err(Error::store)
  }

  /// Every phrase including soft-deleted ones, newest first.
  pub async fn list_all(&self) -> Result<Vec<Phrase>> {
    self
      .store
      .list(Visibility::IncludeInactive)
      .await
      .map_err(Error::store)
  }

  /// Usage counts over active phrases.
  pub async fn stats(&self) -> Result<PhraseStats> {
    self
      .store
      .stats(Visibility::ActiveOnly)
      .await
      .map_err(Error::store)
  }

  pub async fn ping(&self) -> Result<()> {
    self.store.ping().await.map_err(Error::store)
  }

  // ── Admin writes ────────────────────────────────────────────────────────

  pub async fn create(&self, input: NewPhrase) -> Result<Phrase> {
    input.validate()?;
    let phrase = self
      .store
      .insert(input, self.clock.now())
      .await
      .map_err(Error::store)?;
    info!(id = %phrase.id, difficulty = %phrase.difficulty, "created phrase");
    Ok(phrase)
  }

  /// Edit content and/or difficulty. Rotation state is left alone.
  pub async fn update(&self, id: Uuid, update: PhraseUpdate) -> Result<Phrase> {
    update.validate()?;
    let phrase = self
      .store
      .update(id, Visibility::IncludeInactive, update, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    debug!(%id, "updated phrase");
    Ok(phrase)
  }

  /// Exclude a phrase from rotation without deleting it.
  pub async fn soft_delete(&self, id: Uuid) -> Result<Phrase> {
    let phrase = self.set_active(id, false).await?;
    info!(%id, "soft-deleted phrase");
    Ok(phrase)
  }

  /// Undo [`Self::soft_delete`].
  pub async fn restore(&self, id: Uuid) -> Result<Phrase> {
    let phrase = self.set_active(id, true).await?;
    info!(%id, "restored phrase");
    Ok(phrase)
  }

  async fn set_active(&self, id: Uuid, active: bool) -> Result<Phrase> {
    self
      .store
      .set_active(id, active, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))
  }

  /// Forget when a phrase was last selected, returning it to the fresh pool.
  pub async fn reset_usage(&self, id: Uuid) -> Result<Phrase> {
    let phrase = self
      .store
      .clear_usage(id, Visibility::IncludeInactive, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    info!(%id, "reset phrase usage");
    Ok(phrase)
  }
}
