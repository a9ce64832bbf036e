//! Error type for `noteshelf-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An order column did not hold a JSON array of ids.
  #[error(transparent)]
  Core(#[from] noteshelf_core::Error),

  #[error("sqlite error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The session payload column could not be encoded or decoded.
  #[error("session payload error: {0}")]
  Payload(#[from] serde_json::Error),

  #[error("stored user id is not a uuid: {0}")]
  UserId(#[from] uuid::Error),

  #[error("stored timestamp is not RFC 3339: {0}")]
  Timestamp(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
