//! Phrase types: the rotated content items.
//!
//! A phrase carries two kinds of state: rotation state (`difficulty`,
//! `active`, `used_on`, timestamps) owned by the engine and the store, and an
//! opaque [`PhraseContent`] payload that rotation never inspects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result, clock::DayWindow};

// ─── Difficulty ──────────────────────────────────────────────────────────────

/// The difficulty tier. Each tier is an independent rotation pool.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  /// Parse a tier name, mapping failures to [`Error::UnknownDifficulty`].
  pub fn parse(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| Error::UnknownDifficulty(s.to_owned()))
  }
}

// ─── Content payload ─────────────────────────────────────────────────────────

/// A string in English and Spanish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
  pub en: String,
  pub es: String,
}

impl Localized {
  fn is_blank(&self) -> bool {
    self.en.trim().is_empty() || self.es.trim().is_empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
  Formal,
  Informal,
  Neutral,
}

/// How a phrase is used in one region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionNote {
  pub usage: Option<Localized>,
  pub notes: Option<Localized>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regions {
  pub spain:         Option<RegionNote>,
  pub latin_america: Option<RegionNote>,
}

/// A reference to a pre-rendered audio file; no binary data is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
  pub url:    String,
  pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
  pub spanish: String,
  pub english: String,
  pub context: Option<Localized>,
  pub audio:   Option<AudioRef>,
}

/// Upper bound on answer options per quiz question.
pub const MAX_QUIZ_OPTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub id:             u32,
  pub question:       Localized,
  pub options:        Vec<Localized>,
  /// Index into `options`.
  pub correct_answer: u8,
  pub explanation:    Option<Localized>,
}

/// Everything about a phrase that rotation does not care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseContent {
  pub phrase:          String,
  pub pronunciation:   String,
  pub meaning:         Localized,
  pub context:         Localized,
  pub formality:       Formality,
  #[serde(default)]
  pub regions:         Regions,
  #[serde(default)]
  pub examples:        Vec<Example>,
  #[serde(default)]
  pub similar_phrases: Vec<String>,
  #[serde(default)]
  pub tags:            Vec<String>,
  pub audio:           Option<AudioRef>,
  #[serde(default)]
  pub quiz:            Vec<QuizQuestion>,
}

impl PhraseContent {
  /// Reject payloads that would be unusable once surfaced.
  pub fn validate(&self) -> Result<()> {
    if self.phrase.trim().is_empty() {
      return Err(invalid("phrase text is required"));
    }
    if self.pronunciation.trim().is_empty() {
      return Err(invalid("pronunciation is required"));
    }
    if self.meaning.is_blank() {
      return Err(invalid("meaning needs both en and es"));
    }
    if self.context.is_blank() {
      return Err(invalid("context needs both en and es"));
    }

    for (i, ex) in self.examples.iter().enumerate() {
      if ex.spanish.trim().is_empty() || ex.english.trim().is_empty() {
        return Err(invalid(format!("example {i} needs spanish and english")));
      }
    }

    for q in &self.quiz {
      if q.options.is_empty() || q.options.len() > MAX_QUIZ_OPTIONS {
        return Err(invalid(format!(
          "quiz question {} must have 1 to {MAX_QUIZ_OPTIONS} options",
          q.id
        )));
      }
      if usize::from(q.correct_answer) >= q.options.len() {
        return Err(invalid(format!(
          "quiz question {} answer {} is out of range",
          q.id, q.correct_answer
        )));
      }
    }

    Ok(())
  }
}

fn invalid(msg: impl Into<String>) -> Error { Error::Validation(msg.into()) }

// ─── Phrase ──────────────────────────────────────────────────────────────────

/// A stored phrase together with its rotation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
  pub id:         Uuid,
  pub difficulty: Difficulty,
  /// Soft-delete flag; inactive phrases are never selected.
  pub active:     bool,
  /// When rotation last selected this phrase. `None` means never.
  pub used_on:    Option<DateTime<Utc>>,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub content:    PhraseContent,
}

impl Phrase {
  /// Never selected by rotation.
  pub fn is_fresh(&self) -> bool { self.used_on.is_none() }

  /// Whether this phrase was selected during `window`.
  pub fn used_within(&self, window: &DayWindow) -> bool {
    self.used_on.is_some_and(|at| window.contains(at))
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::rotation::RotationEngine::create`].
///
/// Rotation state is not accepted from callers: new phrases always start
/// active and fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPhrase {
  pub difficulty: Difficulty,
  pub content:    PhraseContent,
}

impl NewPhrase {
  pub fn validate(&self) -> Result<()> { self.content.validate() }
}

/// Input to [`crate::rotation::RotationEngine::update`].
///
/// There is deliberately no `used_on` field; only rotation and the explicit
/// usage reset may touch it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhraseUpdate {
  pub difficulty: Option<Difficulty>,
  pub content:    Option<PhraseContent>,
}

impl PhraseUpdate {
  pub fn validate(&self) -> Result<()> {
    if self.difficulty.is_none() && self.content.is_none() {
      return Err(invalid("update changes nothing"));
    }
    if let Some(content) = &self.content {
      content.validate()?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn content(text: &str) -> PhraseContent {
    PhraseContent {
      phrase:          text.into(),
      pronunciation:   "mahs teh VAH-leh".into(),
      meaning:         Localized { en: "You better!".into(), es: "¡Tienes que hacerlo!".into() },
      context:         Localized { en: "A warning".into(), es: "Una advertencia".into() },
      formality:       Formality::Informal,
      regions:         Regions::default(),
      examples:        Vec::new(),
      similar_phrases: Vec::new(),
      tags:            Vec::new(),
      audio:           None,
      quiz:            Vec::new(),
    }
  }

  fn question(options: usize, answer: u8) -> QuizQuestion {
    QuizQuestion {
      id:             1,
      question:       Localized { en: "?".into(), es: "¿?".into() },
      options:        (0..options)
        .map(|i| Localized { en: i.to_string(), es: i.to_string() })
        .collect(),
      correct_answer: answer,
      explanation:    None,
    }
  }

  #[test]
  fn difficulty_parses_lowercase_names() {
    assert_eq!(Difficulty::parse("beginner").unwrap(), Difficulty::Beginner);
    assert_eq!(Difficulty::parse("advanced").unwrap(), Difficulty::Advanced);
    assert!(matches!(
      Difficulty::parse("expert"),
      Err(Error::UnknownDifficulty(s)) if s == "expert"
    ));
  }

  #[test]
  fn every_difficulty_parses_its_display_name() {
    use strum::IntoEnumIterator as _;
    for d in Difficulty::iter() {
      assert_eq!(Difficulty::parse(&d.to_string()).unwrap(), d);
    }
  }

  #[test]
  fn valid_content_passes() {
    assert!(content("¡Más te vale!").validate().is_ok());
  }

  #[test]
  fn blank_phrase_is_rejected() {
    let err = content("   ").validate().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn half_translated_meaning_is_rejected() {
    let mut c = content("Hola");
    c.meaning.es = String::new();
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn quiz_answer_must_index_an_option() {
    let mut c = content("Hola");
    c.quiz = vec![question(4, 3)];
    assert!(c.validate().is_ok());

    c.quiz = vec![question(3, 3)];
    assert!(matches!(c.validate(), Err(Error::Validation(_))));

    c.quiz = vec![question(5, 0)];
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn empty_update_is_rejected() {
    assert!(matches!(
      PhraseUpdate::default().validate(),
      Err(Error::Validation(_))
    ));
    let update = PhraseUpdate {
      difficulty: Some(Difficulty::Advanced),
      content:    None,
    };
    assert!(update.validate().is_ok());
  }
}
