//! Runtime configuration: an optional TOML file overlaid with the process
//! environment.
//!
//! Environment variables are matched case-insensitively against the field
//! names, so `QDRANT_URL` sets `qdrant_url` and `LLM_RETRIES` sets
//! `llm_retries`.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use newsrag_providers::RetryPolicy;
use newsrag_store::StoreSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub collection_name:          String,
  pub top_k:                    usize,
  pub llm_retries:              u32,
  pub llm_retry_base_ms:        u64,
  pub qdrant_url:               Option<String>,
  pub qdrant_api_key:           Option<String>,
  pub jina_api_key:             Option<String>,
  pub jina_base_url:            Option<String>,
  pub gemini_api_key:           Option<String>,
  pub gemini_model:             String,
  pub gemini_base_url:          Option<String>,
  pub upstash_redis_rest_url:   Option<String>,
  pub upstash_redis_rest_token: Option<String>,
  pub redis_url:                Option<String>,
  pub cors_origin:              Option<String>,
  pub http_timeout_secs:        u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "0.0.0.0".to_owned(),
      port:                     3001,
      collection_name:          "news".to_owned(),
      top_k:                    5,
      llm_retries:              3,
      llm_retry_base_ms:        800,
      qdrant_url:               None,
      qdrant_api_key:           None,
      jina_api_key:             None,
      jina_base_url:            None,
      gemini_api_key:           None,
      gemini_model:             "gemini-1.5-flash".to_owned(),
      gemini_base_url:          None,
      upstash_redis_rest_url:   None,
      upstash_redis_rest_token: None,
      redis_url:                None,
      cors_origin:              None,
      http_timeout_secs:        30,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists), then the environment on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::default())
      .build()
      .context("failed to read configuration")?;
    Self::from_config(settings)
  }

  pub fn from_config(settings: config::Config) -> anyhow::Result<Self> {
    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    Ok(cfg.without_blanks())
  }

  /// Unset variables often arrive as empty strings; treat them as absent.
  fn without_blanks(mut self) -> Self {
    for value in [
      &mut self.qdrant_url,
      &mut self.qdrant_api_key,
      &mut self.jina_api_key,
      &mut self.jina_base_url,
      &mut self.gemini_api_key,
      &mut self.gemini_base_url,
      &mut self.upstash_redis_rest_url,
      &mut self.upstash_redis_rest_token,
      &mut self.redis_url,
      &mut self.cors_origin,
    ] {
      if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
      }
    }
    self
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn http_timeout(&self) -> Duration {
    Duration::from_secs(self.http_timeout_secs.max(1))
  }

  pub fn store_settings(&self) -> StoreSettings {
    StoreSettings {
      upstash_url:   self.upstash_redis_rest_url.clone(),
      upstash_token: self.upstash_redis_rest_token.clone(),
      redis_url:     self.redis_url.clone(),
      timeout:       self.http_timeout(),
    }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.llm_retries,
      base_delay: Duration::from_millis(self.llm_retry_base_ms),
      ..RetryPolicy::default()
    }
  }
}
