//! SQL schema for the noteshelf SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE COLLATE NOCASE,  -- stored lower-cased
    password_hash TEXT NOT NULL,                         -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- session_id is a digest of the cookie token; the token itself is not kept.
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    expires_at TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, sorts lexically
    payload    TEXT NOT NULL    -- JSON SessionPayload
);

-- AUTOINCREMENT guarantees ids are never reused, even after deletes.
CREATE TABLE IF NOT EXISTS subjects (
    subject_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    topic_order TEXT NOT NULL DEFAULT '[]'   -- JSON array of topic ids
);

CREATE TABLE IF NOT EXISTS topics (
    topic_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id   TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    subject_id INTEGER NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    note_order TEXT NOT NULL DEFAULT '[]'    -- JSON array of note ids
);

CREATE TABLE IF NOT EXISTS notes (
    note_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    topic_id INTEGER NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    text     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_expiry_idx ON sessions(expires_at);
CREATE INDEX IF NOT EXISTS subjects_owner_idx  ON subjects(owner_id);
CREATE INDEX IF NOT EXISTS topics_subject_idx  ON topics(subject_id);
CREATE INDEX IF NOT EXISTS notes_topic_idx     ON notes(topic_id);

PRAGMA user_version = 1;
";
