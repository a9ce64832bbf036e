//! The `NoteStore` trait and its outcome types.
//!
//! The trait is implemented by storage backends (e.g. `noteshelf-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.
//!
//! Every hierarchy method takes the caller's [`UserId`] as `owner`. Rows that
//! belong to someone else are treated exactly like rows that do not exist:
//! reads return `None`, writes affect zero rows.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  hierarchy::{Note, NoteOrder, Subject, SubjectTree, Topic, TopicOrder, TopicTree},
  id::{NoteId, SubjectId, TopicId, UserId},
  order::{OrderMismatch, OrderPolicy},
  user::{Session, User},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of replacing a parent's child order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reorder<I> {
  /// The new order was stored.
  Applied,
  /// The parent does not exist or is not owned by the caller.
  NoSuchParent,
  /// [`OrderPolicy::Strict`] rejected the order; nothing was written.
  Rejected(OrderMismatch<I>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a noteshelf storage backend.
///
/// Operations that touch a row and its parent's order (create, delete, move,
/// strict reorder) must be atomic: either both the row and the order change,
/// or neither does.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NoteStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. `name` must already be normalised. Returns `None` if
  /// the name is taken.
  fn create_user(
    &self,
    name: String,
    password_hash: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_id(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Delete a user and, by cascade, everything they own. Returns the number
  /// of users removed (0 or 1).
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look up an unexpired session by its id.
  fn find_session(
    &self,
    session_id: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    session_id: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove every session that expired at or before `now`.
  fn sweep_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn list_subjects(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    owner: UserId,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// A subject with its topics and notes, arranged by their order arrays.
  fn subject_tree(
    &self,
    owner: UserId,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<SubjectTree>, Self::Error>> + Send + '_;

  /// Every subject of `owner` as a tree.
  fn all_subject_trees(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<SubjectTree>, Self::Error>> + Send + '_;

  /// Create a subject with an empty topic order.
  fn create_subject(
    &self,
    owner: UserId,
    name: String,
  ) -> impl Future<Output = Result<SubjectId, Self::Error>> + Send + '_;

  fn rename_subject(
    &self,
    owner: UserId,
    id: SubjectId,
    name: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Replace the subject's topic order, checked according to `policy`.
  fn reorder_topics(
    &self,
    owner: UserId,
    id: SubjectId,
    order: TopicOrder,
    policy: OrderPolicy,
  ) -> impl Future<Output = Result<Reorder<TopicId>, Self::Error>> + Send + '_;

  /// Delete a subject; its topics and notes go with it.
  fn delete_subject(
    &self,
    owner: UserId,
    id: SubjectId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Topics ────────────────────────────────────────────────────────────

  fn get_topic(
    &self,
    owner: UserId,
    id: TopicId,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  fn topic_tree(
    &self,
    owner: UserId,
    id: TopicId,
  ) -> impl Future<Output = Result<Option<TopicTree>, Self::Error>> + Send + '_;

  /// Create a topic under `subject` and prepend it to the subject's topic
  /// order. Returns `None` if the subject is not the caller's.
  fn create_topic(
    &self,
    owner: UserId,
    subject: SubjectId,
    name: String,
  ) -> impl Future<Output = Result<Option<TopicId>, Self::Error>> + Send + '_;

  fn rename_topic(
    &self,
    owner: UserId,
    id: TopicId,
    name: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn reorder_notes(
    &self,
    owner: UserId,
    id: TopicId,
    order: NoteOrder,
    policy: OrderPolicy,
  ) -> impl Future<Output = Result<Reorder<NoteId>, Self::Error>> + Send + '_;

  /// Delete a topic and remove it from its subject's topic order.
  fn delete_topic(
    &self,
    owner: UserId,
    id: TopicId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Notes ─────────────────────────────────────────────────────────────

  fn get_note(
    &self,
    owner: UserId,
    id: NoteId,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send + '_;

  /// Create a note under `topic` and prepend it to the topic's note order.
  /// Returns `None` if the topic is not the caller's.
  fn create_note(
    &self,
    owner: UserId,
    topic: TopicId,
    text: String,
  ) -> impl Future<Output = Result<Option<NoteId>, Self::Error>> + Send + '_;

  fn update_note(
    &self,
    owner: UserId,
    id: NoteId,
    text: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Reparent a note and splice it out of the source topic's order and into
  /// the destination's at `position` (front when `None`).
  ///
  /// Affects zero rows unless the caller owns both the note and `dest`.
  fn move_note(
    &self,
    owner: UserId,
    id: NoteId,
    dest: TopicId,
    position: Option<usize>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete a note and remove it from its topic's note order.
  fn delete_note(
    &self,
    owner: UserId,
    id: NoteId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
