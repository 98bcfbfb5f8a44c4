//! Text generation through the Gemini `generateContent` endpoint.

use std::time::Duration;

use newsrag_core::provider::Generator;
use reqwest::Client;
use serde_json::{Value, json};

use crate::{
  error::GenerationError,
  retry::{RetryError, RetryPolicy},
};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// A Gemini model. Rate limiting and transient unavailability are retried
/// according to the configured [`RetryPolicy`].
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClient {
  client:   Client,
  base_url: String,
  api_key:  Option<String>,
  model:    String,
  retry:    RetryPolicy,
}

impl GeminiClient {
  /// A missing `api_key` is reported on first use, not here.
  pub fn new(
    api_key: Option<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, GenerationError> {
    Ok(Self {
      client: Client::builder().timeout(timeout).build()?,
      base_url: DEFAULT_GEMINI_URL.to_owned(),
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      model: model.into(),
      retry: RetryPolicy::default(),
    })
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_owned();
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn model(&self) -> &str { &self.model }

  /// One `generateContent` call, no retries.
  async fn attempt(
    &self,
    api_key: &str,
    prompt: &str,
  ) -> Result<String, GenerationError> {
    let url = format!(
      "{}/v1beta/models/{}:generateContent",
      self.base_url, self.model
    );
    let response = self
      .client
      .post(url)
      .header("x-goog-api-key", api_key)
      .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    let value: Value = match serde_json::from_str(&body) {
      Ok(value) => value,
      Err(e) if status.is_success() => return Err(e.into()),
      Err(_) => {
        return Err(GenerationError::Upstream {
          status:     status.as_u16(),
          code:       None,
          api_status: None,
          message:    body,
        });
      }
    };

    // Gemini can report an error envelope alongside a 200.
    if let Some(err) = value.get("error") {
      return Err(GenerationError::Upstream {
        status:     status.as_u16(),
        code:       err.get("code").and_then(Value::as_i64),
        api_status: err
          .get("status")
          .and_then(Value::as_str)
          .map(str::to_owned),
        message:    err
          .get("message")
          .and_then(Value::as_str)
          .unwrap_or_default()
          .to_owned(),
      });
    }
    if !status.is_success() {
      return Err(GenerationError::Upstream {
        status:     status.as_u16(),
        code:       None,
        api_status: None,
        message:    body,
      });
    }

    Ok(candidate_text(&value))
  }
}

/// Concatenated text parts of the first candidate; empty when there are
/// none.
fn candidate_text(response: &Value) -> String {
  response
    .pointer("/candidates/0/content/parts")
    .and_then(Value::as_array)
    .map(|parts| {
      parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect()
    })
    .unwrap_or_default()
}

impl Generator for GeminiClient {
  type Error = GenerationError;

  async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or(GenerationError::NotConfigured("GEMINI_API_KEY"))?;

    let result = self
      .retry
      .run(GenerationError::is_retryable, |_| self.attempt(api_key, prompt))
      .await;

    match result {
      Ok(text) => Ok(text),
      Err(RetryError::Exhausted { attempts, last }) => {
        Err(GenerationError::Unavailable { attempts, last: Box::new(last) })
      }
      Err(RetryError::Aborted(err)) => Err(err),
    }
  }
}
