//! Query embeddings from the Jina embeddings API via [`JinaEmbedder`].

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

pub const DEFAULT_JINA_URL: &str = "https://api.jina.ai";
pub const DEFAULT_JINA_MODEL: &str = "jina-embeddings-v3";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
}

/// Embeds one query at a time with the same model the ingest tooling used
/// to index the collection.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct JinaEmbedder {
  client:   Client,
  base_url: String,
  api_key:  Option<String>,
  model:    String,
}

impl JinaEmbedder {
  /// A missing `api_key` is reported on first use, not here.
  pub fn new(
    api_key: Option<String>,
    timeout: Duration,
  ) -> Result<Self, RetrievalError> {
    Ok(Self {
      client: Client::builder().timeout(timeout).build()?,
      base_url: DEFAULT_JINA_URL.to_owned(),
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      model: DEFAULT_JINA_MODEL.to_owned(),
    })
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_owned();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  /// Embed `text` as a single-item batch and return its vector.
  pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or(RetrievalError::NotConfigured("JINA_API_KEY"))?;

    let response = self
      .client
      .post(format!("{}/v1/embeddings", self.base_url))
      .bearer_auth(api_key)
      .json(&EmbeddingRequest { model: &self.model, input: [text] })
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(RetrievalError::Embedding { status, body });
    }

    let result: EmbeddingResponse = response.json().await?;
    result
      .data
      .into_iter()
      .next()
      .map(|d| d.embedding)
      .filter(|v| !v.is_empty())
      .ok_or(RetrievalError::EmptyEmbedding)
  }
}
