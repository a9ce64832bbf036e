//! [`SqliteStore`], the SQLite implementation of [`NoteStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, OptionalExtension as _, params};

use noteshelf_core::{
  hierarchy::{Note, NoteOrder, Subject, SubjectTree, Topic, TopicOrder, TopicTree},
  id::{NoteId, SubjectId, TopicId, UserId},
  order::OrderPolicy,
  store::{NoteStore, Reorder},
  user::{Session, SessionPayload, User},
};

use crate::{
  Result,
  encode::{
    NOTE_COLUMNS, RawSession, RawSubject, RawTopic, RawUser, child_ids, encode_dt,
    encode_user_id, load_note_order, load_topic_order, note_from_row,
    store_note_order, store_topic_order,
  },
  schema::SCHEMA,
};

const TOPICS_OF_SUBJECT: &str =
  "SELECT topic_id FROM topics WHERE subject_id = ?1 AND owner_id = ?2";
const NOTES_OF_TOPIC: &str =
  "SELECT note_id FROM notes WHERE topic_id = ?1 AND owner_id = ?2";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A noteshelf store backed by a single SQLite file.
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

  /// Open an in-memory store, for tests.
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

  /// Load a flat snapshot of subjects, topics and notes for `owner`,
  /// optionally restricted to one subject.
  async fn load_hierarchy(
    &self,
    owner: UserId,
    subject: Option<SubjectId>,
  ) -> Result<(Vec<Subject>, Vec<Topic>, Vec<Note>)> {
    let owner_str = encode_user_id(owner);
    let subject_id = subject.map(|s| s.0);

    let (subjects, topics, notes) = self
      .conn
      .call(move |conn| {
        // `?2 IS NULL` turns the subject filter off.
        let subjects = conn
          .prepare(&format!(
            "SELECT {} FROM subjects s
             WHERE s.owner_id = ?1 AND (?2 IS NULL OR s.subject_id = ?2)
             ORDER BY s.subject_id",
            RawSubject::COLUMNS
          ))?
          .query_map(params![owner_str, subject_id], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let topics = conn
          .prepare(&format!(
            "SELECT {} FROM topics t
             WHERE t.owner_id = ?1 AND (?2 IS NULL OR t.subject_id = ?2)
             ORDER BY t.topic_id",
            RawTopic::COLUMNS
          ))?
          .query_map(params![owner_str, subject_id], RawTopic::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let notes = conn
          .prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes n
             JOIN topics t ON t.topic_id = n.topic_id
             WHERE n.owner_id = ?1 AND (?2 IS NULL OR t.subject_id = ?2)
             ORDER BY n.note_id"
          ))?
          .query_map(params![owner_str, subject_id], note_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((subjects, topics, notes))
      })
      .await?;

    let subjects = subjects
      .into_iter()
      .map(RawSubject::into_subject)
      .collect::<Result<Vec<_>>>()?;
    let topics = topics
      .into_iter()
      .map(RawTopic::into_topic)
      .collect::<Result<Vec<_>>>()?;
    Ok((subjects, topics, notes))
  }
}

// ─── NoteStore impl ──────────────────────────────────────────────────────────

impl NoteStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, name: String, password_hash: String) -> Result<Option<User>> {
    let user = User {
      id: UserId::new_v4(),
      name,
      password_hash,
      created_at: Utc::now(),
    };

    let id_str   = encode_user_id(user.id);
    let name_str = user.name.clone();
    let hash_str = user.password_hash.clone();
    let at_str   = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO users (user_id, name, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![id_str, name_str, hash_str, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  async fn find_user_by_name(&self, name: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE name = ?1", RawUser::COLUMNS),
              params![name],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
    let id_str = encode_user_id(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
              params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: UserId) -> Result<u64> {
    let id_str = encode_user_id(id);
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", params![id_str])?)
      })
      .await?;
    Ok(affected as u64)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    let payload = serde_json::to_string(&SessionPayload { user_id: session.user_id })?;
    let user_str = encode_user_id(session.user_id);
    let exp_str  = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, user_id, expires_at, payload)
           VALUES (?1, ?2, ?3, ?4)",
          params![session.session_id, user_str, exp_str, payload],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_session(
    &self,
    session_id: String,
    now:        DateTime<Utc>,
  ) -> Result<Option<Session>> {
    let now_str = encode_dt(now);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, expires_at, payload FROM sessions
               WHERE session_id = ?1 AND expires_at > ?2",
              params![session_id, now_str],
              |row| {
                Ok(RawSession {
                  session_id: row.get(0)?,
                  expires_at: row.get(1)?,
                  payload:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, session_id: String) -> Result<u64> {
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn sweep_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
    let now_str = encode_dt(now);
    let swept = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now_str])?)
      })
      .await?;
    if swept > 0 {
      tracing::debug!(swept, "removed expired sessions");
    }
    Ok(swept as u64)
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn list_subjects(&self, owner: UserId) -> Result<Vec<Subject>> {
    let (subjects, _, _) = self.load_hierarchy(owner, None).await?;
    Ok(subjects)
  }

  async fn get_subject(&self, owner: UserId, id: SubjectId) -> Result<Option<Subject>> {
    let owner_str = encode_user_id(owner);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM subjects s WHERE s.subject_id = ?1 AND s.owner_id = ?2",
                RawSubject::COLUMNS
              ),
              params![id.0, owner_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn subject_tree(&self, owner: UserId, id: SubjectId) -> Result<Option<SubjectTree>> {
    let (subjects, topics, notes) = self.load_hierarchy(owner, Some(id)).await?;
    Ok(
      subjects
        .into_iter()
        .next()
        .map(|subject| SubjectTree::assemble(subject, topics, &notes)),
    )
  }

  async fn all_subject_trees(&self, owner: UserId) -> Result<Vec<SubjectTree>> {
    let (subjects, topics, notes) = self.load_hierarchy(owner, None).await?;
    Ok(
      subjects
        .into_iter()
        .map(|subject| SubjectTree::assemble(subject, topics.clone(), &notes))
        .collect(),
    )
  }

  async fn create_subject(&self, owner: UserId, name: String) -> Result<SubjectId> {
    let owner_str = encode_user_id(owner);
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (owner_id, name, topic_order) VALUES (?1, ?2, '[]')",
          params![owner_str, name],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(SubjectId(id))
  }

  async fn rename_subject(&self, owner: UserId, id: SubjectId, name: String) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE subjects SET name = ?1 WHERE subject_id = ?2 AND owner_id = ?3",
          params![name, id.0, owner_str],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn reorder_topics(
    &self,
    owner:  UserId,
    id:     SubjectId,
    order:  TopicOrder,
    policy: OrderPolicy,
  ) -> Result<Reorder<TopicId>> {
    let owner_str = encode_user_id(owner);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if load_topic_order(&tx, &owner_str, id.0)?.is_none() {
          return Ok(Reorder::NoSuchParent);
        }
        if policy == OrderPolicy::Strict {
          let children: Vec<TopicId> = child_ids(&tx, TOPICS_OF_SUBJECT, &owner_str, id.0)?
            .into_iter()
            .map(TopicId)
            .collect();
          if let Err(mismatch) = order.check_permutation(&children) {
            return Ok(Reorder::Rejected(mismatch));
          }
        }
        store_topic_order(&tx, id.0, &order)?;
        tx.commit()?;
        Ok(Reorder::Applied)
      })
      .await?;

    if let Reorder::Rejected(mismatch) = &outcome {
      tracing::debug!(subject = %id, %mismatch, "topic reorder rejected");
    }
    Ok(outcome)
  }

  async fn delete_subject(&self, owner: UserId, id: SubjectId) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subjects WHERE subject_id = ?1 AND owner_id = ?2",
          params![id.0, owner_str],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  async fn get_topic(&self, owner: UserId, id: TopicId) -> Result<Option<Topic>> {
    let owner_str = encode_user_id(owner);

    let raw: Option<RawTopic> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM topics t WHERE t.topic_id = ?1 AND t.owner_id = ?2",
                RawTopic::COLUMNS
              ),
              params![id.0, owner_str],
              RawTopic::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTopic::into_topic).transpose()
  }

  async fn topic_tree(&self, owner: UserId, id: TopicId) -> Result<Option<TopicTree>> {
    let Some(topic) = self.get_topic(owner, id).await? else {
      return Ok(None);
    };
    let owner_str = encode_user_id(owner);

    let notes = self
      .conn
      .call(move |conn| {
        let notes = conn
          .prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes n
             WHERE n.topic_id = ?1 AND n.owner_id = ?2
             ORDER BY n.note_id"
          ))?
          .query_map(params![id.0, owner_str], note_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
      })
      .await?;

    Ok(Some(TopicTree::assemble(topic, notes)))
  }

  async fn create_topic(
    &self,
    owner:   UserId,
    subject: SubjectId,
    name:    String,
  ) -> Result<Option<TopicId>> {
    let owner_str = encode_user_id(owner);
    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut order) = load_topic_order(&tx, &owner_str, subject.0)? else {
          return Ok(None);
        };
        tx.execute(
          "INSERT INTO topics (owner_id, subject_id, name, note_order)
           VALUES (?1, ?2, ?3, '[]')",
          params![owner_str, subject.0, name],
        )?;
        let id = TopicId(tx.last_insert_rowid());
        order.prepend(id);
        store_topic_order(&tx, subject.0, &order)?;
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;
    Ok(id)
  }

  async fn rename_topic(&self, owner: UserId, id: TopicId, name: String) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topics SET name = ?1 WHERE topic_id = ?2 AND owner_id = ?3",
          params![name, id.0, owner_str],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn reorder_notes(
    &self,
    owner:  UserId,
    id:     TopicId,
    order:  NoteOrder,
    policy: OrderPolicy,
  ) -> Result<Reorder<NoteId>> {
    let owner_str = encode_user_id(owner);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if load_note_order(&tx, &owner_str, id.0)?.is_none() {
          return Ok(Reorder::NoSuchParent);
        }
        if policy == OrderPolicy::Strict {
          let children: Vec<NoteId> = child_ids(&tx, NOTES_OF_TOPIC, &owner_str, id.0)?
            .into_iter()
            .map(NoteId)
            .collect();
          if let Err(mismatch) = order.check_permutation(&children) {
            return Ok(Reorder::Rejected(mismatch));
          }
        }
        store_note_order(&tx, id.0, &order)?;
        tx.commit()?;
        Ok(Reorder::Applied)
      })
      .await?;

    if let Reorder::Rejected(mismatch) = &outcome {
      tracing::debug!(topic = %id, %mismatch, "note reorder rejected");
    }
    Ok(outcome)
  }

  async fn delete_topic(&self, owner: UserId, id: TopicId) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let subject: Option<i64> = tx
          .query_row(
            "SELECT subject_id FROM topics WHERE topic_id = ?1 AND owner_id = ?2",
            params![id.0, owner_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(subject) = subject else {
          return Ok(0);
        };

        tx.execute("DELETE FROM topics WHERE topic_id = ?1", params![id.0])?;
        if let Some(mut order) = load_topic_order(&tx, &owner_str, subject)? {
          order.remove(id);
          store_topic_order(&tx, subject, &order)?;
        }
        tx.commit()?;
        Ok(1)
      })
      .await?;
    Ok(affected)
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  async fn get_note(&self, owner: UserId, id: NoteId) -> Result<Option<Note>> {
    let owner_str = encode_user_id(owner);
    let note = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {NOTE_COLUMNS} FROM notes n WHERE n.note_id = ?1 AND n.owner_id = ?2"
              ),
              params![id.0, owner_str],
              note_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(note)
  }

  async fn create_note(
    &self,
    owner: UserId,
    topic: TopicId,
    text:  String,
  ) -> Result<Option<NoteId>> {
    let owner_str = encode_user_id(owner);
    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut order) = load_note_order(&tx, &owner_str, topic.0)? else {
          return Ok(None);
        };
        tx.execute(
          "INSERT INTO notes (owner_id, topic_id, text) VALUES (?1, ?2, ?3)",
          params![owner_str, topic.0, text],
        )?;
        let id = NoteId(tx.last_insert_rowid());
        order.prepend(id);
        store_note_order(&tx, topic.0, &order)?;
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;
    Ok(id)
  }

  async fn update_note(&self, owner: UserId, id: NoteId, text: String) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notes SET text = ?1 WHERE note_id = ?2 AND owner_id = ?3",
          params![text, id.0, owner_str],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn move_note(
    &self,
    owner:    UserId,
    id:       NoteId,
    dest:     TopicId,
    position: Option<usize>,
  ) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let position  = position.unwrap_or(0);

    let affected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let source: Option<i64> = tx
          .query_row(
            "SELECT topic_id FROM notes WHERE note_id = ?1 AND owner_id = ?2",
            params![id.0, owner_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(source) = source else {
          return Ok(0);
        };
        // Ownership of the destination is checked, not just of the note.
        let Some(mut dest_order) = load_note_order(&tx, &owner_str, dest.0)? else {
          return Ok(0);
        };

        if source != dest.0 {
          tx.execute(
            "UPDATE notes SET topic_id = ?1 WHERE note_id = ?2 AND owner_id = ?3",
            params![dest.0, id.0, owner_str],
          )?;
          if let Some(mut source_order) = load_note_order(&tx, &owner_str, source)? {
            source_order.remove(id);
            store_note_order(&tx, source, &source_order)?;
          }
        }
        dest_order.insert_at(id, position);
        store_note_order(&tx, dest.0, &dest_order)?;
        tx.commit()?;
        Ok(1)
      })
      .await?;
    Ok(affected)
  }

  async fn delete_note(&self, owner: UserId, id: NoteId) -> Result<u64> {
    let owner_str = encode_user_id(owner);
    let affected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let topic: Option<i64> = tx
          .query_row(
            "SELECT topic_id FROM notes WHERE note_id = ?1 AND owner_id = ?2",
            params![id.0, owner_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(topic) = topic else {
          return Ok(0);
        };

        tx.execute("DELETE FROM notes WHERE note_id = ?1", params![id.0])?;
        if let Some(mut order) = load_note_order(&tx, &owner_str, topic)? {
          order.remove(id);
          store_note_order(&tx, topic, &order)?;
        }
        tx.commit()?;
        Ok(1)
      })
      .await?;
    Ok(affected)
  }
}
