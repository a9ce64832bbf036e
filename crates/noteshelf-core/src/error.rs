//! Error types for `noteshelf-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("order is not a JSON array of ids: {0}")]
  MalformedOrder(#[source] serde_json::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
