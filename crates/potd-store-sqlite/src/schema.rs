//! SQL schema for the phrase store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 strings (microseconds, `Z` suffix), so
/// text comparison orders them chronologically.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS phrases (
    phrase_id    TEXT PRIMARY KEY,
    difficulty   TEXT NOT NULL,            -- 'beginner' | 'intermediate' | 'advanced'
    active       INTEGER NOT NULL DEFAULT 1,
    used_on      TEXT,                     -- last rotation pick; NULL = never
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    content_json TEXT NOT NULL,            -- PhraseContent; opaque to rotation
    CHECK (difficulty IN ('beginner', 'intermediate', 'advanced')),
    CHECK (used_on IS NULL OR used_on >= created_at)
);

-- Today's pick and least-recently-used lookups.
CREATE INDEX IF NOT EXISTS phrases_rotation_idx
    ON phrases(difficulty, active, used_on);
-- Oldest fresh lookup.
CREATE INDEX IF NOT EXISTS phrases_fresh_idx
    ON phrases(difficulty, active, created_at);

PRAGMA user_version = 1;
";
