//! Capability traits for the two external dependencies of a chat turn:
//! grounding retrieval and text generation.
//!
//! Implemented by `newsrag-providers`; faked in tests.

use std::future::Future;

use crate::passage::Passage;

/// Number of passages retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Embedding + vector search behind a single call.
pub trait Retriever: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Up to `k` passages for `query`, ordered by descending relevance.
  fn retrieve<'a>(
    &'a self,
    query: &'a str,
    k: usize,
  ) -> impl Future<Output = Result<Vec<Passage>, Self::Error>> + Send + 'a;

  /// Number of indexed chunks in the collection.
  fn document_count(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

/// A remote text-generation model.
pub trait Generator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Complete `prompt`. Transient upstream failures are retried internally;
  /// an `Err` means the model is unavailable for this request.
  fn complete<'a>(
    &'a self,
    prompt: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
