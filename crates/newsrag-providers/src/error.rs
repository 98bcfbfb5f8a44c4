//! Error types for `newsrag-providers`.

use thiserror::Error;

/// The embedding provider or vector index could not produce passages.
///
/// Retrieval failures are never degraded into an ungrounded answer.
#[derive(Debug, Error)]
pub enum RetrievalError {
  #[error("retrieval is not configured: {0} is missing")]
  NotConfigured(&'static str),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("embedding provider returned {status}: {body}")]
  Embedding { status: u16, body: String },

  #[error("embedding provider returned no vectors")]
  EmptyEmbedding,

  #[error("vector index returned {status}: {body}")]
  Index { status: u16, body: String },
}

/// The generation model did not produce an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation is not configured: {0} is missing")]
  NotConfigured(&'static str),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The model endpoint answered with an error.
  #[error("model returned {status}: {message}")]
  Upstream {
    status:     u16,
    /// `error.code` from the payload, when present.
    code:       Option<i64>,
    /// `error.status` from the payload, e.g. `RESOURCE_EXHAUSTED`.
    api_status: Option<String>,
    message:    String,
  },

  #[error("malformed model response: {0}")]
  Decode(#[from] serde_json::Error),

  /// Every attempt hit a retryable failure.
  #[error("model unavailable after {attempts} attempts: {last}")]
  Unavailable {
    attempts: u32,
    last:     Box<GenerationError>,
  },
}

impl GenerationError {
  /// Rate limiting and transient unavailability (HTTP 429/503, or the
  /// equivalent codes in the error payload). Nothing else is retried.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Upstream { status, code, api_status, .. } => {
        matches!(status, 429 | 503)
          || matches!(code, Some(429 | 503))
          || matches!(
            api_status.as_deref(),
            Some("RESOURCE_EXHAUSTED" | "UNAVAILABLE")
          )
      }
      _ => false,
    }
  }
}
