//! User accounts and login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            UserId,
  pub name:          String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Usernames are compared case-insensitively; they are lower-cased before
/// storage and before every lookup.
pub fn normalize_username(name: &str) -> String { name.to_lowercase() }

/// A login session as persisted by the store.
///
/// `session_id` is a digest of the cookie token, never the token itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub session_id: String,
  pub user_id:    UserId,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Serialised session data stored alongside the session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
  pub user_id: UserId,
}
