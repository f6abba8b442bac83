//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that SQL
//! text comparison matches chronological order. The content payload is
//! stored as compact JSON. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use potd_core::{
  phrase::{Difficulty, Phrase, PhraseContent},
  store::Visibility,
};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_opt_dt(dt: Option<DateTime<Utc>>) -> Value {
  dt.map_or(Value::Null, |dt| Value::Text(encode_dt(dt)))
}

// ─── Difficulty ──────────────────────────────────────────────────────────────

pub fn encode_difficulty(d: Difficulty) -> &'static str {
  match d {
    Difficulty::Beginner => "beginner",
    Difficulty::Intermediate => "intermediate",
    Difficulty::Advanced => "advanced",
  }
}

pub fn decode_difficulty(s: &str) -> Result<Difficulty> {
  Difficulty::parse(s)
    .map_err(|_| Error::Decode(format!("unknown difficulty: {s:?}")))
}

// ─── Content ─────────────────────────────────────────────────────────────────

pub fn encode_content(c: &PhraseContent) -> Result<String> {
  Ok(serde_json::to_string(c)?)
}

pub fn decode_content(s: &str) -> Result<PhraseContent> {
  Ok(serde_json::from_str(s)?)
}

// ─── Visibility ──────────────────────────────────────────────────────────────

/// SQL predicate for a [`Visibility`]; spliced into every `WHERE` clause.
pub fn visibility_clause(v: Visibility) -> &'static str {
  match v {
    Visibility::ActiveOnly => "active = 1",
    Visibility::IncludeInactive => "1 = 1",
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column list matching [`RawPhrase::from_row`].
pub const PHRASE_COLUMNS: &str =
  "phrase_id, difficulty, active, used_on, created_at, updated_at, content_json";

/// Raw values read directly from a `phrases` row.
pub struct RawPhrase {
  pub phrase_id:    String,
  pub difficulty:   String,
  pub active:       bool,
  pub used_on:      Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
  pub content_json: String,
}

impl RawPhrase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      phrase_id:    row.get(0)?,
      difficulty:   row.get(1)?,
      active:       row.get(2)?,
      used_on:      row.get(3)?,
      created_at:   row.get(4)?,
      updated_at:   row.get(5)?,
      content_json: row.get(6)?,
    })
  }

  pub fn into_phrase(self) -> Result<Phrase> {
    Ok(Phrase {
      id:         decode_uuid(&self.phrase_id)?,
      difficulty: decode_difficulty(&self.difficulty)?,
      active:     self.active,
      used_on:    self.used_on.as_deref().map(decode_dt).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      content:    decode_content(&self.content_json)?,
    })
  }
}
