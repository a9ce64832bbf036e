//! Handlers for `/topic` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/topic/:id` | The topic with its notes in stored order |
//! | `POST`   | `/topic` | Body: `{"subId":1,"topic":"Algebra"}`; prepended to the subject's order |
//! | `PATCH`  | `/topic/:id` | Body: `{"name":"..."}` |
//! | `PATCH`  | `/topic/order/:id` | Body: `{"order":[...]}` |
//! | `DELETE` | `/topic/:id` | Removed from the subject's order |

use axum::{Json, extract::State};
use noteshelf_core::{
  hierarchy::TopicTree,
  id::{NoteId, SubjectId, TopicId},
  store::{NoteStore, Reorder},
};
use serde::Deserialize;

use crate::{
  ApiState,
  body::{
    Created, IdInput, Ident, JsonBody, OrderInput, PathId, required_id, required_order,
    required_text,
  },
  error::ApiError,
  session::CurrentUser,
};

const ENTITY: &str = "topic";

/// `GET /topic/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<TopicTree>, ApiError>
where
  S: NoteStore,
{
  let tree = state
    .store
    .topic_tree(user.id, TopicId(id))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity(ENTITY))?;
  Ok(Json(tree))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub sub_id: Option<IdInput>,
  pub topic:  Option<String>,
}

/// `POST /topic`, body: `{"subId":1,"topic":"Algebra"}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<Created<TopicId>, ApiError>
where
  S: NoteStore,
{
  let name = required_text(body.topic, "Enter name for new topic.")?;
  let subject = SubjectId(required_id(body.sub_id, "No subject ID provided.")?);
  let id = state
    .store
    .create_topic(user.id, subject, name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity("subject"))?;
  Ok(Created(id))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name: Option<String>,
}

/// `PATCH /topic/:id`, body: `{"name":"..."}`
pub async fn rename<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<RenameBody>,
) -> Result<Json<Ident<TopicId>>, ApiError>
where
  S: NoteStore,
{
  let name = required_text(body.name, "No name provided.")?;
  let id = TopicId(id);
  let affected = state
    .store
    .rename_topic(user.id, id, name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  pub order: Option<OrderInput<NoteId>>,
}

/// `PATCH /topic/order/:id`, body: `{"order":[...]}` or `{"order":"[...]"}`
pub async fn reorder<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<ReorderBody>,
) -> Result<Json<Ident<TopicId>>, ApiError>
where
  S: NoteStore,
{
  let order = required_order(body.order)?;
  let id = TopicId(id);
  let outcome = state
    .store
    .reorder_notes(user.id, id, order, state.settings.order_policy)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  match outcome {
    Reorder::Applied => Ok(Json(Ident { id })),
    Reorder::NoSuchParent => Err(ApiError::NoSuchEntity(ENTITY)),
    Reorder::Rejected(mismatch) => Err(ApiError::bad_request(mismatch.to_string())),
  }
}

/// `DELETE /topic/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<Ident<TopicId>>, ApiError>
where
  S: NoteStore,
{
  let id = TopicId(id);
  let affected = state
    .store
    .delete_topic(user.id, id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}
