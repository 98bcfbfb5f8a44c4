//! Startup selection between the three session store backends.

use std::time::Duration;

use newsrag_core::{message::Message, store::SessionStore};

use crate::{MemoryStore, RedisStore, Result, UpstashStore};

/// Connection settings gathered from configuration.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
  pub upstash_url:   Option<String>,
  pub upstash_token: Option<String>,
  pub redis_url:     Option<String>,
  /// Bound on every outbound store call.
  pub timeout:       Duration,
}

fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Whichever backend configuration made available.
///
/// Handlers only ever see the [`SessionStore`] contract; the variant is
/// decided once, at startup.
#[derive(Clone)]
pub enum SessionBackend {
  Upstash(UpstashStore),
  Redis(RedisStore),
  Memory(MemoryStore),
}

impl SessionBackend {
  /// Prefer Upstash REST when both its URL and token are set, then a direct
  /// Redis URL, and fall back to process memory otherwise.
  pub fn select(settings: &StoreSettings) -> Result<Self> {
    if let (Some(url), Some(token)) =
      (present(&settings.upstash_url), present(&settings.upstash_token))
    {
      return Ok(Self::Upstash(UpstashStore::new(url, token, settings.timeout)?));
    }
    if let Some(url) = present(&settings.redis_url) {
      return Ok(Self::Redis(RedisStore::open(url, settings.timeout)?));
    }
    Ok(Self::Memory(MemoryStore::new()))
  }

  /// Short name for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Upstash(_) => "upstash",
      Self::Redis(_) => "redis",
      Self::Memory(_) => "memory",
    }
  }

  /// Whether history survives a process restart.
  pub fn is_durable(&self) -> bool { !matches!(self, Self::Memory(_)) }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SessionBackend {
  type Error = crate::Error;

  async fn append(&self, session_id: &str, message: &Message) -> Result<()> {
    match self {
      Self::Upstash(s) => s.append(session_id, message).await,
      Self::Redis(s) => s.append(session_id, message).await,
      Self::Memory(s) => s.append(session_id, message).await,
    }
  }

  async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
    match self {
      Self::Upstash(s) => s.read_all(session_id).await,
      Self::Redis(s) => s.read_all(session_id).await,
      Self::Memory(s) => s.read_all(session_id).await,
    }
  }

  async fn reset(&self, session_id: &str) -> Result<()> {
    match self {
      Self::Upstash(s) => s.reset(session_id).await,
      Self::Redis(s) => s.reset(session_id).await,
      Self::Memory(s) => s.reset(session_id).await,
    }
  }

  async fn refresh_ttl(&self, session_id: &str, ttl: Duration) -> Result<()> {
    match self {
      Self::Upstash(s) => s.refresh_ttl(session_id, ttl).await,
      Self::Redis(s) => s.refresh_ttl(session_id, ttl).await,
      Self::Memory(s) => s.refresh_ttl(session_id, ttl).await,
    }
  }

  async fn last_ingest_at(&self) -> Result<Option<String>> {
    match self {
      Self::Upstash(s) => s.last_ingest_at().await,
      Self::Redis(s) => s.last_ingest_at().await,
      Self::Memory(s) => s.last_ingest_at().await,
    }
  }
}
