//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or malformed input.
  #[error("{0}")]
  BadRequest(String),

  /// The entity does not exist or belongs to someone else.
  #[error("No such {0}.")]
  NoSuchEntity(&'static str),

  #[error("{0}")]
  Unauthorized(&'static str),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Any other server-side failure (password hashing, task joins).
  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::BadRequest(message.into())
  }

  pub fn login_required() -> Self { Self::Unauthorized("Login required.") }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) | ApiError::NoSuchEntity(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store operation failed");
        "Internal server error.".to_owned()
      }
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        "Internal server error.".to_owned()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
