//! Error types for `potd-core`.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::phrase::Difficulty;

#[derive(Debug, Error)]
pub enum Error {
  /// The requested tier has no active phrases at all.
  #[error("no phrases available for difficulty {0}")]
  NoContentAvailable(Difficulty),

  #[error("phrase not found: {0}")]
  NotFound(Uuid),

  #[error("invalid phrase: {0}")]
  Validation(String),

  #[error("unknown difficulty: {0:?}")]
  UnknownDifficulty(String),

  #[error("invalid time zone: {0:?}")]
  InvalidTimeZone(String),

  /// Another caller's claim was undone before ours could observe it.
  #[error("today's {0} selection changed concurrently")]
  SelectionConflict(Difficulty),

  #[error("selection did not complete within {0:?}")]
  Timeout(Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
