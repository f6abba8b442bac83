//! Bulk import of phrases from a JSON file.

use std::path::Path;

use anyhow::Context as _;
use potd_core::{
  clock::Clock, phrase::NewPhrase, rotation::RotationEngine, store::PhraseStore,
};
use tracing::info;

/// What a [`seed`] run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub retired:  usize,
  pub imported: usize,
}

/// Import the JSON array of [`NewPhrase`] documents at `path`.
///
/// Every document is validated before anything is written. With `replace`,
/// the phrases that were active beforehand are soft-deleted after the import
/// succeeds.
pub async fn seed<S, C>(
  engine: &RotationEngine<S, C>,
  path: &Path,
  replace: bool,
) -> anyhow::Result<SeedReport>
where
  S: PhraseStore,
  C: Clock,
{
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read seed file {path:?}"))?;
  let phrases: Vec<NewPhrase> = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse seed file {path:?}"))?;

  for (i, phrase) in phrases.iter().enumerate() {
    phrase
      .validate()
      .with_context(|| format!("seed entry {i} is invalid"))?;
  }

  // Retire only what was active before the import, and only once the new
  // phrases are in, so a failed import leaves the old collection serving.
  let previous = if replace { engine.list_active().await? } else { Vec::new() };

  let mut report = SeedReport::default();
  for phrase in phrases {
    engine.create(phrase).await?;
    report.imported += 1;
  }

  for existing in previous {
    engine.soft_delete(existing.id).await?;
    report.retired += 1;
  }

  info!(retired = report.retired, imported = report.imported, "seed complete");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::{io::Write as _, sync::Arc};

  use potd_core::clock::DayBoundary;
  use potd_store_sqlite::SqliteStore;
  use serde_json::json;

  use super::*;

  fn entry(text: &str, difficulty: &str) -> serde_json::Value {
    json!({
      "difficulty": difficulty,
      "content": {
        "phrase": text,
        "pronunciation": "oh-LAH",
        "meaning": { "en": "hello", "es": "hola" },
        "context": { "en": "greeting", "es": "saludo" },
        "formality": "neutral"
      }
    })
  }

  fn seed_file(entries: serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(entries.to_string().as_bytes()).unwrap();
    file
  }

  async fn engine() -> RotationEngine<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    RotationEngine::with_system_clock(Arc::new(store), DayBoundary::utc())
  }

  #[tokio::test]
  async fn imports_every_entry() {
    let e = engine().await;
    let file = seed_file(json!([entry("Hola", "beginner"), entry("¡Más te vale!", "advanced")]));

    let report = seed(&e, file.path(), false).await.unwrap();
    assert_eq!(report, SeedReport { retired: 0, imported: 2 });
    assert_eq!(e.list_active().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn bundled_seed_file_is_valid() {
    let e = engine().await;
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("seed/phrases.json");

    let report = seed(&e, &path, false).await.unwrap();
    assert_eq!(report.imported, 3);
  }

  #[tokio::test]
  async fn replace_retires_existing_phrases() {
    let e = engine().await;
    let first = seed_file(json!([entry("Hola", "beginner")]));
    seed(&e, first.path(), false).await.unwrap();

    let second = seed_file(json!([entry("Adiós", "beginner")]));
    let report = seed(&e, second.path(), true).await.unwrap();
    assert_eq!(report, SeedReport { retired: 1, imported: 1 });

    let active = e.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].content.phrase, "Adiós");
    assert_eq!(e.list_all().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn failed_replace_keeps_existing_phrases_active() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("phrases.db");
    let store = SqliteStore::open(&db).await.unwrap();
    let e = RotationEngine::with_system_clock(Arc::new(store), DayBoundary::utc());
    let first = seed_file(json!([entry("Hola", "beginner")]));
    seed(&e, first.path(), false).await.unwrap();

    // Make the second insert of the next import fail at the database.
    rusqlite::Connection::open(&db)
      .unwrap()
      .execute_batch(
        "CREATE TRIGGER reject_adios BEFORE INSERT ON phrases
           WHEN NEW.content_json LIKE '%Adiós%'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
      )
      .unwrap();

    let second = seed_file(json!([entry("Buenas", "beginner"), entry("Adiós", "beginner")]));
    assert!(seed(&e, second.path(), true).await.is_err());

    let active: Vec<_> = e
      .list_active()
      .await
      .unwrap()
      .into_iter()
      .map(|p| p.content.phrase)
      .collect();
    assert!(active.contains(&"Hola".to_string()));
    assert!(active.contains(&"Buenas".to_string()));
  }

  #[tokio::test]
  async fn invalid_entry_writes_nothing() {
    let e = engine().await;
    let file = seed_file(json!([entry("Hola", "beginner"), entry("", "beginner")]));

    assert!(seed(&e, file.path(), true).await.is_err());
    assert!(e.list_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn unknown_difficulty_fails_to_parse() {
    let e = engine().await;
    let file = seed_file(json!([entry("Hola", "expert")]));
    assert!(seed(&e, file.path(), false).await.is_err());
  }
}
