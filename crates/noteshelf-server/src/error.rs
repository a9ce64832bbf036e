//! Errors raised by the server's own handlers (outside the store).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("password hashing failed: {0}")]
  Password(String),

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
