//! Similarity search over the news collection through the Qdrant REST API.
//!
//! Points carry a payload of `{title, url, chunk}` written at ingest time.

use std::time::Duration;

use newsrag_core::passage::Passage;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::RetrievalError;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
  vector:       &'a [f32],
  limit:        usize,
  with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
  score:   f32,
  #[serde(default)]
  payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
  #[serde(default)]
  title: String,
  #[serde(default)]
  url:   String,
  #[serde(default)]
  chunk: String,
}

#[derive(Debug, Deserialize)]
struct CountResult {
  count: u64,
}

impl From<ScoredPoint> for Passage {
  fn from(point: ScoredPoint) -> Self {
    let payload = point.payload.unwrap_or_default();
    Passage {
      score: point.score,
      title: payload.title,
      url:   payload.url,
      chunk: payload.chunk,
    }
  }
}

/// A Qdrant collection reached over HTTP.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct QdrantIndex {
  client:     Client,
  url:        Option<String>,
  api_key:    Option<String>,
  collection: String,
}

impl QdrantIndex {
  /// A missing `url` is reported on first use, not here. The API key is
  /// optional for unauthenticated local instances.
  pub fn new(
    url: Option<String>,
    api_key: Option<String>,
    collection: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, RetrievalError> {
    Ok(Self {
      client: Client::builder().timeout(timeout).build()?,
      url: url
        .map(|u| u.trim().trim_end_matches('/').to_owned())
        .filter(|u| !u.is_empty()),
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      collection: collection.into(),
    })
  }

  pub fn collection(&self) -> &str { &self.collection }

  fn post(&self, path: &str) -> Result<RequestBuilder, RetrievalError> {
    let base = self
      .url
      .as_deref()
      .ok_or(RetrievalError::NotConfigured("QDRANT_URL"))?;
    let req = self
      .client
      .post(format!("{base}/collections/{}/{path}", self.collection));
    Ok(match &self.api_key {
      Some(key) => req.header("api-key", key),
      None => req,
    })
  }

  async fn send<T: DeserializeOwned>(
    &self,
    req: RequestBuilder,
  ) -> Result<T, RetrievalError> {
    let response = req.send().await?;
    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(RetrievalError::Index { status, body });
    }
    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.result)
  }

  /// The `limit` nearest points to `vector`, in the order Qdrant ranks them
  /// (descending score).
  pub async fn search(
    &self,
    vector: &[f32],
    limit: usize,
  ) -> Result<Vec<Passage>, RetrievalError> {
    let req = self.post("points/search")?.json(&SearchRequest {
      vector,
      limit,
      with_payload: true,
    });
    let points: Vec<ScoredPoint> = self.send(req).await?;
    Ok(points.into_iter().map(Passage::from).collect())
  }

  /// Exact number of points in the collection.
  pub async fn count(&self) -> Result<u64, RetrievalError> {
    let req = self
      .post("points/count")?
      .json(&serde_json::json!({ "exact": true }));
    let result: CountResult = self.send(req).await?;
    Ok(result.count)
  }
}
