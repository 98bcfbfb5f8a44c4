//! Error type for `newsrag-store`.
//!
//! Every variant means the session backend could not serve the request.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] newsrag_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("redis error: {0}")]
  Redis(#[from] redis::RedisError),

  /// The Upstash REST API answered with an error payload or status.
  #[error("upstash error: {0}")]
  Upstash(String),

  #[error("store call timed out after {0:?}")]
  Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
