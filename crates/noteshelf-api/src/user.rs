//! Handlers for `/user` endpoints.

use axum::{
  Json,
  extract::State,
  http::header,
  response::{AppendHeaders, IntoResponse},
};
use noteshelf_core::{
  hierarchy::SubjectTree,
  id::UserId,
  store::NoteStore,
};
use serde::Serialize;

use crate::{ApiState, body::Ident, error::ApiError, session::CurrentUser};

#[derive(Debug, Serialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /user` → `{"name":"alice"}`
pub async fn name<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
) -> Result<Json<NameBody>, ApiError>
where
  S: NoteStore,
{
  let found = state
    .store
    .find_user_by_id(user.id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(ApiError::login_required)?;
  Ok(Json(NameBody { name: found.name }))
}

/// `GET /user/data`: every subject with its topics and notes.
pub async fn data<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<SubjectTree>>, ApiError>
where
  S: NoteStore,
{
  let trees = state
    .store
    .all_subject_trees(user.id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(trees))
}

/// `DELETE /user` removes the account and everything it owns, and drops
/// the session cookie.
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let affected = state
    .store
    .delete_user(user.id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if affected == 0 {
    return Err(ApiError::login_required());
  }
  tracing::info!(user = %user.id, "account deleted");
  let cookie = state.settings.session.clear_cookie();
  Ok((
    AppendHeaders([(header::SET_COOKIE, cookie)]),
    Json(Ident::<UserId> { id: user.id }),
  ))
}
