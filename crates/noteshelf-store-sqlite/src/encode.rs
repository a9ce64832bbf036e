//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (millisecond
//! precision, `Z` suffix) so that they compare correctly as text. User ids
//! are hyphenated lowercase UUIDs. Order columns hold compact JSON arrays.

use chrono::{DateTime, SecondsFormat, Utc};
use noteshelf_core::{
  hierarchy::{Note, NoteOrder, Subject, Topic, TopicOrder},
  id::{NoteId, SubjectId, TopicId, UserId},
  user::{Session, SessionPayload, User},
};
use rusqlite::{Connection, OptionalExtension as _, Row, params};
use uuid::Uuid;

use crate::{Error, Result};

// ─── UserId ───────────────────────────────────────────────────────────────────

pub fn encode_user_id(id: UserId) -> String { id.0.hyphenated().to_string() }

pub fn decode_user_id(s: &str) -> Result<UserId> { Ok(UserId(Uuid::parse_str(s)?)) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp(e.to_string()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Intermediate representation of a `users` row before decoding.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, name, password_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      password_hash: row.get(2)?,
      created_at:    row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_user_id(&self.user_id)?,
      name:          self.name,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSession {
  pub session_id: String,
  pub expires_at: String,
  pub payload:    String,
}

impl RawSession {
  /// The user id is taken from the serialised payload.
  pub fn into_session(self) -> Result<Session> {
    let payload: SessionPayload = serde_json::from_str(&self.payload)?;
    Ok(Session {
      session_id: self.session_id,
      user_id:    payload.user_id,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

pub struct RawSubject {
  pub subject_id:  i64,
  pub name:        String,
  pub topic_order: String,
}

impl RawSubject {
  pub const COLUMNS: &'static str = "s.subject_id, s.name, s.topic_order";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:  row.get(0)?,
      name:        row.get(1)?,
      topic_order: row.get(2)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:          SubjectId(self.subject_id),
      name:        self.name,
      topic_order: TopicOrder::from_json(&self.topic_order)?,
    })
  }
}

pub struct RawTopic {
  pub topic_id:   i64,
  pub subject_id: i64,
  pub name:       String,
  pub note_order: String,
}

impl RawTopic {
  pub const COLUMNS: &'static str = "t.topic_id, t.subject_id, t.name, t.note_order";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:   row.get(0)?,
      subject_id: row.get(1)?,
      name:       row.get(2)?,
      note_order: row.get(3)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      id:         TopicId(self.topic_id),
      subject_id: SubjectId(self.subject_id),
      name:       self.name,
      note_order: NoteOrder::from_json(&self.note_order)?,
    })
  }
}

pub const NOTE_COLUMNS: &str = "n.note_id, n.topic_id, n.text";

pub fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
  Ok(Note {
    id:       NoteId(row.get(0)?),
    topic_id: TopicId(row.get(1)?),
    text:     row.get(2)?,
  })
}

// ─── Order columns (used inside `Connection::call`) ───────────────────────────

fn other<E>(e: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Read the topic order of a subject owned by `owner`; `None` if there is no
/// such subject for that owner.
pub fn load_topic_order(
  conn:    &Connection,
  owner:   &str,
  subject: i64,
) -> tokio_rusqlite::Result<Option<TopicOrder>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT topic_order FROM subjects WHERE subject_id = ?1 AND owner_id = ?2",
      params![subject, owner],
      |r| r.get(0),
    )
    .optional()?;
  raw.map(|s| TopicOrder::from_json(&s).map_err(other)).transpose()
}

pub fn store_topic_order(
  conn:    &Connection,
  subject: i64,
  order:   &TopicOrder,
) -> tokio_rusqlite::Result<()> {
  let json = order.to_json().map_err(other)?;
  conn.execute(
    "UPDATE subjects SET topic_order = ?1 WHERE subject_id = ?2",
    params![json, subject],
  )?;
  Ok(())
}

/// Read the note order of a topic owned by `owner`; `None` if there is no
/// such topic for that owner.
pub fn load_note_order(
  conn:  &Connection,
  owner: &str,
  topic: i64,
) -> tokio_rusqlite::Result<Option<NoteOrder>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT note_order FROM topics WHERE topic_id = ?1 AND owner_id = ?2",
      params![topic, owner],
      |r| r.get(0),
    )
    .optional()?;
  raw.map(|s| NoteOrder::from_json(&s).map_err(other)).transpose()
}

pub fn store_note_order(
  conn:  &Connection,
  topic: i64,
  order: &NoteOrder,
) -> tokio_rusqlite::Result<()> {
  let json = order.to_json().map_err(other)?;
  conn.execute(
    "UPDATE topics SET note_order = ?1 WHERE topic_id = ?2",
    params![json, topic],
  )?;
  Ok(())
}

/// Current child ids of a parent, read from the foreign keys.
pub fn child_ids(
  conn:   &Connection,
  sql:    &str,
  owner:  &str,
  parent: i64,
) -> tokio_rusqlite::Result<Vec<i64>> {
  let mut stmt = conn.prepare(sql)?;
  let ids = stmt
    .query_map(params![parent, owner], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}
