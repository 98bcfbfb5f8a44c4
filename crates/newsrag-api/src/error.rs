//! Chat pipeline errors and their HTTP mapping.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every 400 from `POST /api/chat`.
pub const INVALID_REQUEST: &str = "sessionId & message required";

/// A terminal failure of a chat turn.
///
/// Generation failures never appear here: they degrade to a sources-only
/// answer inside the pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
  #[error("{}", INVALID_REQUEST)]
  InvalidRequest,

  #[error("session store unavailable: {0}")]
  StoreUnavailable(#[source] BoxError),

  #[error("retrieval unavailable: {0}")]
  RetrievalUnavailable(#[source] BoxError),
}

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Chat(#[from] ChatError),

  #[error("vector index unavailable: {0}")]
  IndexUnavailable(#[source] BoxError),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ChatError::StoreUnavailable(Box::new(e)).into()
  }

  /// The short tag sent to clients. Provider error text stays in the logs.
  fn tag(&self) -> &'static str {
    match self {
      ApiError::Chat(ChatError::InvalidRequest) => INVALID_REQUEST,
      ApiError::Chat(ChatError::StoreUnavailable(_)) => "store_unavailable",
      ApiError::Chat(ChatError::RetrievalUnavailable(_)) => {
        "retrieval_unavailable"
      }
      ApiError::IndexUnavailable(_) => "index_unavailable",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Chat(ChatError::InvalidRequest) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.tag() }))).into_response()
  }
}
