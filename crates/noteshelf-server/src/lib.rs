//! HTTP server for noteshelf.
//!
//! Combines the `/auth` endpoints (signup, login, logout) with the hierarchy
//! API from [`noteshelf_api`] and wraps the whole router in request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, time::Duration};

use axum::Router;
use config::{Config, ConfigError, Environment, FileFormat};
use noteshelf_api::{ApiSettings, ApiState, SessionSettings, api_router};
use noteshelf_core::{order::OrderPolicy, store::NoteStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `NOTESHELF_*` environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  /// SQLite database file. A leading `~/` is expanded by the binary.
  pub store_path:           PathBuf,
  /// Give up on opening the store after this many seconds.
  pub connect_timeout_secs: u64,
  pub order_policy:         OrderPolicy,
  pub session:              SessionSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 3000,
      store_path:           PathBuf::from("~/.local/share/noteshelf/noteshelf.db"),
      connect_timeout_secs: 10,
      order_policy:         OrderPolicy::default(),
      session:              SessionSettings::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) and layer the environment on top.
  ///
  /// Nested keys use `__`: `NOTESHELF_SESSION__TTL_HOURS=48`.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(config::File::from(path.into()).required(false))
      .add_source(environment())
      .build()?
      .try_deserialize()
  }

  /// Parse a TOML document, without consulting the environment.
  pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(config::File::from_str(toml, FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }

  pub fn api_settings(&self) -> ApiSettings {
    ApiSettings { order_policy: self.order_policy, session: self.session.clone() }
  }
}

fn environment() -> Environment {
  Environment::with_prefix("NOTESHELF")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: NoteStore + 'static,
{
  Router::new()
    .merge(auth::auth_router(state.clone()))
    .merge(api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
