//! Handlers for `/subject` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subject/all` | Caller's subjects |
//! | `GET`    | `/subject/:id` | |
//! | `GET`    | `/subject/:id/with-notes` | Topics and notes nested, in stored order |
//! | `POST`   | `/subject` | Body: `{"subject":"Math"}`; 201 `[{"id":1}]` |
//! | `PATCH`  | `/subject/:id` | Body: `{"name":"..."}` |
//! | `PATCH`  | `/subject/order/:id` | Body: `{"order":[3,1,2]}` |
//! | `DELETE` | `/subject/:id` | Topics and notes go with it |

use axum::{Json, extract::State};
use noteshelf_core::{
  hierarchy::{Subject, SubjectTree},
  id::{SubjectId, TopicId},
  store::{NoteStore, Reorder},
};
use serde::Deserialize;

use crate::{
  ApiState,
  body::{Created, Ident, JsonBody, OrderInput, PathId, required_order, required_text},
  error::ApiError,
  session::CurrentUser,
};

const ENTITY: &str = "subject";

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /subject/all`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: NoteStore,
{
  let subjects = state
    .store
    .list_subjects(user.id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(subjects))
}

/// `GET /subject/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<Subject>, ApiError>
where
  S: NoteStore,
{
  let subject = state
    .store
    .get_subject(user.id, SubjectId(id))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity(ENTITY))?;
  Ok(Json(subject))
}

/// `GET /subject/:id/with-notes`
pub async fn tree<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<SubjectTree>, ApiError>
where
  S: NoteStore,
{
  let tree = state
    .store
    .subject_tree(user.id, SubjectId(id))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::NoSuchEntity(ENTITY))?;
  Ok(Json(tree))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub subject: Option<String>,
}

/// `POST /subject`, body: `{"subject":"Math"}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<Created<SubjectId>, ApiError>
where
  S: NoteStore,
{
  let name = required_text(body.subject, "Enter name for new subject.")?;
  let id = state
    .store
    .create_subject(user.id, name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Created(id))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name: Option<String>,
}

/// `PATCH /subject/:id`, body: `{"name":"..."}`
pub async fn rename<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<RenameBody>,
) -> Result<Json<Ident<SubjectId>>, ApiError>
where
  S: NoteStore,
{
  let name = required_text(body.name, "New name required.")?;
  let id = SubjectId(id);
  let affected = state
    .store
    .rename_subject(user.id, id, name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  pub order: Option<OrderInput<TopicId>>,
}

/// `PATCH /subject/order/:id`, body: `{"order":[...]}` or `{"order":"[...]"}`
pub async fn reorder<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
  JsonBody(body): JsonBody<ReorderBody>,
) -> Result<Json<Ident<SubjectId>>, ApiError>
where
  S: NoteStore,
{
  let order = required_order(body.order)?;
  let id = SubjectId(id);
  let outcome = state
    .store
    .reorder_topics(user.id, id, order, state.settings.order_policy)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  match outcome {
    Reorder::Applied => Ok(Json(Ident { id })),
    Reorder::NoSuchParent => Err(ApiError::NoSuchEntity(ENTITY)),
    Reorder::Rejected(mismatch) => Err(ApiError::bad_request(mismatch.to_string())),
  }
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /subject/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
  PathId(id): PathId,
) -> Result<Json<Ident<SubjectId>>, ApiError>
where
  S: NoteStore,
{
  let id = SubjectId(id);
  let affected = state
    .store
    .delete_subject(user.id, id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::NoSuchEntity(ENTITY));
  }
  Ok(Json(Ident { id }))
}
