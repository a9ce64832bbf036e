//! Account and session endpoints under `/auth`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | JSON `{"username","password"}`; 201 `{"id","name"}` |
//! | `POST` | `/auth/login` | Form `username=..&password=..`; sets the session cookie |
//! | `POST` | `/auth/logout` | 400 when not logged in |
//! | `GET`  | `/auth/status` | `true` or `false` |

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json, Router,
  extract::{Form, State, rejection::FormRejection},
  http::{HeaderMap, StatusCode, header},
  response::{AppendHeaders, IntoResponse},
  routing::{get, post},
};
use chrono::Utc;
use noteshelf_api::{ApiError, ApiState, body::JsonBody, session};
use noteshelf_core::{id::UserId, store::NoteStore, user::normalize_username};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BOTH_REQUIRED: &str = "Both username and password required.";
const BAD_CREDENTIALS: &str = "Invalid username or password.";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Password(e.to_string()))
}

/// `false` for a wrong password and for an unparsable stored hash alike.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

async fn hash_off_thread(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

async fn verify_off_thread(password: String, hash: String) -> Result<bool> {
  Ok(tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?)
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn auth_router<S>(state: ApiState<S>) -> Router<()>
where
  S: NoteStore + 'static,
{
  Router::new()
    .route("/auth/signup", post(signup::<S>))
    .route("/auth/login", post(login::<S>))
    .route("/auth/logout", post(logout::<S>))
    .route("/auth/status", get(status::<S>))
    .with_state(state)
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub username: Option<String>,
  pub password: Option<String>,
}

impl Credentials {
  /// Both fields, non-empty, with the username normalised.
  fn require(self) -> std::result::Result<(String, String), ApiError> {
    match (self.username, self.password) {
      (Some(name), Some(password)) if !name.trim().is_empty() && !password.is_empty() => {
        Ok((normalize_username(name.trim()), password))
      }
      _ => Err(ApiError::bad_request(BOTH_REQUIRED)),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct Account {
  pub id:   UserId,
  pub name: String,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /auth/signup`
pub async fn signup<S>(
  State(state): State<ApiState<S>>,
  JsonBody(body): JsonBody<Credentials>,
) -> std::result::Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let (name, password) = body.require()?;
  let hash = hash_off_thread(password)
    .await
    .map_err(|e| ApiError::Internal(Box::new(e)))?;
  let user = state
    .store
    .create_user(name, hash)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::bad_request("User already exists."))?;

  tracing::info!(user = %user.id, name = %user.name, "account created");
  Ok((StatusCode::CREATED, Json(Account { id: user.id, name: user.name })))
}

/// `POST /auth/login`
///
/// Replaces any session the request already carries and sweeps expired
/// sessions before issuing a new one.
pub async fn login<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  form: std::result::Result<Form<Credentials>, FormRejection>,
) -> std::result::Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let Form(credentials) = form.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
  let (name, password) = credentials.require()?;
  let store = state.store.as_ref();
  let settings = &state.settings.session;

  let Some(user) = store
    .find_user_by_name(name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
  else {
    return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
  };
  let valid = verify_off_thread(password, user.password_hash.clone())
    .await
    .map_err(|e| ApiError::Internal(Box::new(e)))?;
  if !valid {
    tracing::warn!(user = %user.id, "login rejected");
    return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
  }

  if let Some(previous) = session::token_from_headers(&headers, &settings.cookie_name) {
    store
      .delete_session(session::hash_token(&previous))
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
  }
  store
    .sweep_sessions(Utc::now())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let token = session::open_session(store, settings, user.id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  tracing::info!(user = %user.id, "logged in");
  Ok((
    AppendHeaders([(header::SET_COOKIE, settings.set_cookie(&token))]),
    Json(Account { id: user.id, name: user.name }),
  ))
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
) -> std::result::Result<impl IntoResponse, ApiError>
where
  S: NoteStore,
{
  let settings = &state.settings.session;
  let current = session::resolve_session(state.store.as_ref(), settings, &headers)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::bad_request("Not logged in."))?;
  state
    .store
    .delete_session(current.session_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  tracing::info!(user = %current.user_id, "logged out");
  Ok((AppendHeaders([(header::SET_COOKIE, settings.clear_cookie())]), StatusCode::OK))
}

/// `GET /auth/status`
pub async fn status<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
) -> std::result::Result<Json<bool>, ApiError>
where
  S: NoteStore,
{
  let current = session::resolve_session(state.store.as_ref(), &state.settings.session, &headers)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(current.is_some()))
}
