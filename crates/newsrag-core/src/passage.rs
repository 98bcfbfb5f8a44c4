//! Passages: scored chunks of source text returned by retrieval.
//!
//! Passages are produced per request and never persisted.

use serde::{Deserialize, Serialize};

/// A retrieved chunk with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
  /// Similarity score as reported by the vector index; higher is better.
  pub score: f32,
  pub title: String,
  pub url:   String,
  pub chunk: String,
}
