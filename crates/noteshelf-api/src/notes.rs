//! Handlers for `/note` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/note/:id` | |
//! | `POST`   | `/note` | Body: `{"topicId":10,"note":"..."}`; prepended to the topic's order |
//! | `PATCH`  | `/note/:id` | Body: `{"note":"..."}` |
//! | `PATCH`  | `/note/move/:id` | Body: `{"topicId":11,"position":0}`; both orders are updated |
//! | `DELETE` | `/note/:id` | Removed from the topic's order |

use axum::{Json, extract::State};
use noteshelf_core::{
  hierarchy::Note,
  id::{NoteId, TopicId},
  store::NoteStore,
};
use serde::Deserialize;

use crate::{
  ApiState,
  body::{Created, IdInput, Ident, JsonBody, PathId, required_id, required_text},
  error::ApiError,
  session::CurrentUser,
};

const ENTITY: &str = "note";

/// `GET /note/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<Note>, ApiError>
where
  S: NoteStore,
{
  let note = state
    .store
    .get_note(user.id, NoteId(id))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity(ENTITY))?;
  Ok(Json(note))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub topic_id: Option<IdInput>,
  pub note:     Option<String>,
}

/// `POST /note`, body: `{"topicId":10,"note":"..."}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<Created<NoteId>, ApiError>
where
  S: NoteStore,
{
  let text = required_text(body.note, "No note provided.")?;
  let topic = TopicId(required_id(body.topic_id, "No topic ID provided.")?);
  let id = state
    .store
    .create_note(user.id, topic, text)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity("topic"))?;
  Ok(Created(id))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub note: Option<String>,
}

/// `PATCH /note/:id`, body: `{"note":"..."}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<UpdateBody>,
) -> Result<Json<Ident<NoteId>>, ApiError>
where
  S: NoteStore,
{
  let text = required_text(body.note, "No new note provided.")?;
  let id = NoteId(id);
  let affected = state
    .store
    .update_note(user.id, id, text)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
  pub topic_id: Option<IdInput>,
  /// Index in the destination's order; the front when absent.
  pub position: Option<usize>,
}

/// `PATCH /note/move/:id`, body: `{"topicId":11[,"position":0]}`
pub async fn move_to<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<MoveBody>,
) -> Result<Json<Ident<NoteId>>, ApiError>
where
  S: NoteStore,
{
  let dest = TopicId(required_id(body.topic_id, "No topic ID provided.")?);
  let id = NoteId(id);
  let affected = state
    .store
    .move_note(user.id, id, dest, body.position)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}

/// `DELETE /note/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<Ident<NoteId>>, ApiError>
where
  S: NoteStore,
{
  let id = NoteId(id);
  let affected = state
    .store
    .delete_note(user.id, id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}
