//! [`SqliteStore`], the SQLite implementation of [`PhraseStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use potd_core::{
  clock::DayWindow,
  phrase::{Difficulty, NewPhrase, Phrase, PhraseUpdate},
  store::{Claim, PhraseStats, PhraseStore, TierStats, Visibility},
};
use rusqlite::{OptionalExtension as _, types::Value};
use strum::IntoEnumIterator as _;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    PHRASE_COLUMNS, RawPhrase, decode_difficulty, encode_content, encode_dt,
    encode_difficulty, encode_opt_dt, encode_uuid, visibility_clause,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A phrase store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a statement yielding at most one `phrases` row.
  async fn fetch_optional(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Option<Phrase>> {
    let raw: Option<RawPhrase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params_from_iter(params),
              RawPhrase::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPhrase::into_phrase).transpose()
  }

  async fn fetch_all(&self, sql: String, params: Vec<Value>) -> Result<Vec<Phrase>> {
    let raws: Vec<RawPhrase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawPhrase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPhrase::into_phrase).collect()
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

// ─── PhraseStore impl ────────────────────────────────────────────────────────

impl PhraseStore for SqliteStore {
  type Error = crate::Error;

  // ── CRUD ──────────────────────────────────────────────────────────────────

  async fn insert(&self, input: NewPhrase, at: DateTime<Utc>) -> Result<Phrase> {
    let sql = format!(
      "INSERT INTO phrases (
         phrase_id, difficulty, active, used_on, created_at, updated_at, content_json
       ) VALUES (?1, ?2, 1, NULL, ?3, ?3, ?4)
       RETURNING {PHRASE_COLUMNS}"
    );
    let params = vec![
      text(encode_uuid(Uuid::new_v4())),
      text(encode_difficulty(input.difficulty)),
      text(encode_dt(at)),
      text(encode_content(&input.content)?),
    ];

    self
      .fetch_optional(sql, params)
      .await?
      .ok_or_else(|| Error::Decode("insert returned no row".to_owned()))
  }

  async fn get(&self, id: Uuid, visibility: Visibility) -> Result<Option<Phrase>> {
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases WHERE phrase_id = ?1 AND {}",
      visibility_clause(visibility)
    );
    self.fetch_optional(sql, vec![text(encode_uuid(id))]).await
  }

  async fn list(&self, visibility: Visibility) -> Result<Vec<Phrase>> {
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases
       WHERE {}
       ORDER BY created_at DESC, phrase_id ASC",
      visibility_clause(visibility)
    );
    self.fetch_all(sql, Vec::new()).await
  }

  async fn update(
    &self,
    id: Uuid,
    visibility: Visibility,
    update: PhraseUpdate,
    at: DateTime<Utc>,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "UPDATE phrases
          SET difficulty   = COALESCE(?2, difficulty),
              content_json = COALESCE(?3, content_json),
              updated_at   = ?4
        WHERE phrase_id = ?1 AND {}
       RETURNING {PHRASE_COLUMNS}",
      visibility_clause(visibility)
    );
    let params = vec![
      text(encode_uuid(id)),
      update
        .difficulty
        .map_or(Value::Null, |d| text(encode_difficulty(d))),
      match &update.content {
        Some(c) => text(encode_content(c)?),
        None => Value::Null,
      },
      text(encode_dt(at)),
    ];
    self.fetch_optional(sql, params).await
  }

  async fn set_active(
    &self,
    id: Uuid,
    active: bool,
    at: DateTime<Utc>,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "UPDATE phrases SET active = ?2, updated_at = ?3
        WHERE phrase_id = ?1
       RETURNING {PHRASE_COLUMNS}"
    );
    let params = vec![
      text(encode_uuid(id)),
      Value::Integer(i64::from(active)),
      text(encode_dt(at)),
    ];
    self.fetch_optional(sql, params).await
  }

  async fn clear_usage(
    &self,
    id: Uuid,
    visibility: Visibility,
    at: DateTime<Utc>,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "UPDATE phrases SET used_on = NULL, updated_at = ?2
        WHERE phrase_id = ?1 AND {}
       RETURNING {PHRASE_COLUMNS}",
      visibility_clause(visibility)
    );
    let params = vec![text(encode_uuid(id)), text(encode_dt(at))];
    self.fetch_optional(sql, params).await
  }

  // ── Rotation lookups ──────────────────────────────────────────────────────

  async fn find_used_within(
    &self,
    difficulty: Difficulty,
    window: DayWindow,
    visibility: Visibility,
  ) -> Result<Option<Phrase>> {
    // Earliest first: if a restore ever leaves two picks in one day, the
    // original one keeps winning.
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases
       WHERE difficulty = ?1 AND {}
         AND used_on >= ?2 AND used_on < ?3
       ORDER BY used_on ASC, phrase_id ASC
       LIMIT 1",
      visibility_clause(visibility)
    );
    let params = vec![
      text(encode_difficulty(difficulty)),
      text(encode_dt(window.start)),
      text(encode_dt(window.end)),
    ];
    self.fetch_optional(sql, params).await
  }

  async fn find_oldest_fresh(
    &self,
    difficulty: Difficulty,
    created_before: DateTime<Utc>,
    visibility: Visibility,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases
       WHERE difficulty = ?1 AND {} AND used_on IS NULL AND created_at < ?2
       ORDER BY created_at ASC, phrase_id ASC
       LIMIT 1",
      visibility_clause(visibility)
    );
    let params = vec![
      text(encode_difficulty(difficulty)),
      text(encode_dt(created_before)),
    ];
    self.fetch_optional(sql, params).await
  }

  async fn find_least_recently_used(
    &self,
    difficulty: Difficulty,
    created_before: DateTime<Utc>,
    visibility: Visibility,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases
       WHERE difficulty = ?1 AND {} AND created_at < ?2
       ORDER BY used_on ASC, phrase_id ASC
       LIMIT 1",
      visibility_clause(visibility)
    );
    let params = vec![
      text(encode_difficulty(difficulty)),
      text(encode_dt(created_before)),
    ];
    self.fetch_optional(sql, params).await
  }

  async fn claim(&self, claim: Claim) -> Result<Option<Phrase>> {
    // One statement, so SQLite's write lock makes the check-and-set atomic.
    // `IS` compares NULL to NULL as equal.
    let sql = format!(
      "UPDATE phrases
          SET used_on = ?1, updated_at = ?1
        WHERE phrase_id = ?2
          AND difficulty = ?3
          AND active = 1
          AND used_on IS ?4
          AND ?1 >= ?5 AND ?1 < ?6
          AND NOT EXISTS (
            SELECT 1 FROM phrases
             WHERE difficulty = ?3
               AND active = 1
               AND used_on >= ?5 AND used_on < ?6
          )
       RETURNING {PHRASE_COLUMNS}"
    );
    let params = vec![
      text(encode_dt(claim.at)),
      text(encode_uuid(claim.phrase_id)),
      text(encode_difficulty(claim.difficulty)),
      encode_opt_dt(claim.expected_used_on),
      text(encode_dt(claim.window.start)),
      text(encode_dt(claim.window.end)),
    ];

    let claimed = self.fetch_optional(sql, params).await?;
    if claimed.is_none() {
      debug!(id = %claim.phrase_id, "claim matched no row");
    }
    Ok(claimed)
  }

  // ── Observability ─────────────────────────────────────────────────────────

  async fn stats(&self, visibility: Visibility) -> Result<PhraseStats> {
    let sql = format!(
      "SELECT difficulty, COUNT(*), COALESCE(SUM(used_on IS NOT NULL), 0)
         FROM phrases
        WHERE {}
        GROUP BY difficulty",
      visibility_clause(visibility)
    );

    let rows: Vec<(String, i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = Vec::with_capacity(rows.len());
    for (difficulty, total, used) in rows {
      counts.push((decode_difficulty(&difficulty)?, total, used));
    }

    let mut stats = PhraseStats::default();
    for difficulty in Difficulty::iter() {
      let (total, used) = counts
        .iter()
        .find(|(d, ..)| *d == difficulty)
        .map(|&(_, total, used)| (total as u64, used as u64))
        .unwrap_or_default();
      stats.total += total;
      stats.used += used;
      stats.unused += total - used;
      stats.by_difficulty.push(TierStats {
        difficulty,
        total,
        used,
        unused: total - used,
      });
    }
    Ok(stats)
  }

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
