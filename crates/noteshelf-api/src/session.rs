//! Cookie sessions.
//!
//! The cookie carries an opaque random token; the store only ever sees its
//! SHA-256 digest.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use noteshelf_core::{id::UserId, store::NoteStore, user::Session};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{ApiState, error::ApiError};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Cookie and lifetime settings, read from the `[session]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
  pub cookie_name:   String,
  pub ttl_hours:     i64,
  /// Add `Secure` to the cookie. Enable when served over HTTPS.
  pub secure_cookie: bool,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self {
      cookie_name:   "noteshelf_session".to_owned(),
      ttl_hours:     24 * 14,
      secure_cookie: false,
    }
  }
}

impl SessionSettings {
  pub fn ttl(&self) -> Duration { Duration::hours(self.ttl_hours) }

  /// `Set-Cookie` value carrying `token`.
  pub fn set_cookie(&self, token: &str) -> String {
    let mut cookie = format!(
      "{}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
      self.cookie_name,
      self.ttl().num_seconds(),
    );
    if self.secure_cookie {
      cookie.push_str("; Secure");
    }
    cookie
  }

  /// `Set-Cookie` value that makes the browser drop the cookie.
  pub fn clear_cookie(&self) -> String {
    let mut cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", self.cookie_name);
    if self.secure_cookie {
      cookie.push_str("; Secure");
    }
    cookie
  }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// 32 random bytes, base64url without padding.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The session id stored for `token`.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The value of cookie `name`, if the request carries one.
pub fn token_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(key, value)| *key == name && !value.is_empty())
    .map(|(_, value)| value.to_owned())
}

/// Start a session for `user_id`. Returns the cookie token.
pub async fn open_session<S: NoteStore>(
  store: &S,
  settings: &SessionSettings,
  user_id: UserId,
) -> Result<String, S::Error> {
  let token = new_token();
  store
    .create_session(Session {
      session_id: hash_token(&token),
      user_id,
      expires_at: Utc::now() + settings.ttl(),
    })
    .await?;
  Ok(token)
}

/// The unexpired session the request's cookie points at.
pub async fn resolve_session<S: NoteStore>(
  store: &S,
  settings: &SessionSettings,
  headers: &HeaderMap,
) -> Result<Option<Session>, S::Error> {
  let Some(token) = token_from_headers(headers, &settings.cookie_name) else {
    return Ok(None);
  };
  store.find_session(hash_token(&token), Utc::now()).await
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The logged-in user. Rejects with `401` when there is no valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub id:         UserId,
  pub session_id: String,
}

impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
  S: NoteStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let session = resolve_session(state.store.as_ref(), &state.settings.session, &parts.headers)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .ok_or_else(ApiError::login_required)?;
    Ok(CurrentUser { id: session.user_id, session_id: session.session_id })
  }
}
