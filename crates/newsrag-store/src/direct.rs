//! Session logs in a directly connected Redis server.

use std::{future::Future, sync::Arc, time::Duration};

use newsrag_core::{
  message::Message,
  store::{LAST_INGEST_KEY, SESSION_TTL, SessionStore, session_key},
};
use redis::{AsyncCommands as _, RedisResult, aio::ConnectionManager};
use tokio::sync::OnceCell;

use crate::{Error, Result};

/// A session store backed by a Redis server over the native protocol.
///
/// The connection is established on first use and re-established
/// automatically by [`ConnectionManager`] after failures, so a Redis outage
/// at startup surfaces as per-request errors rather than a boot failure.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct RedisStore {
  client:  redis::Client,
  conn:    Arc<OnceCell<ConnectionManager>>,
  timeout: Duration,
}

impl RedisStore {
  /// Parse `url` (`redis://` or `rediss://`). Does not connect.
  pub fn open(url: &str, timeout: Duration) -> Result<Self> {
    Ok(Self {
      client: redis::Client::open(url)?,
      conn: Arc::new(OnceCell::new()),
      timeout,
    })
  }

  async fn connection(&self) -> Result<ConnectionManager> {
    let conn = tokio::time::timeout(
      self.timeout,
      self
        .conn
        .get_or_try_init(|| ConnectionManager::new(self.client.clone())),
    )
    .await
    .map_err(|_| Error::Timeout(self.timeout))??;
    Ok(conn.clone())
  }

  /// Await a Redis call, giving up after the configured timeout.
  async fn bounded<T>(
    &self,
    call: impl Future<Output = RedisResult<T>>,
  ) -> Result<T> {
    Ok(
      tokio::time::timeout(self.timeout, call)
        .await
        .map_err(|_| Error::Timeout(self.timeout))??,
    )
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for RedisStore {
  type Error = Error;

  async fn append(&self, session_id: &str, message: &Message) -> Result<()> {
    let key = session_key(session_id);
    let payload = message.encode()?;
    let ttl = i64::try_from(SESSION_TTL.as_secs()).unwrap_or(i64::MAX);
    let mut conn = self.connection().await?;

    // MULTI/EXEC keeps the push and its TTL refresh together.
    let mut pipe = redis::pipe();
    pipe
      .atomic()
      .rpush(&key, payload)
      .ignore()
      .expire(&key, ttl)
      .ignore();
    let () = self.bounded(pipe.query_async(&mut conn)).await?;
    Ok(())
  }

  async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
    let key = session_key(session_id);
    let mut conn = self.connection().await?;
    let raw: Vec<String> = self.bounded(conn.lrange(&key, 0, -1)).await?;
    raw
      .iter()
      .map(|item| Ok(Message::decode(item)?))
      .collect()
  }

  async fn reset(&self, session_id: &str) -> Result<()> {
    let key = session_key(session_id);
    let mut conn = self.connection().await?;
    let _removed: i64 = self.bounded(conn.del(&key)).await?;
    Ok(())
  }

  async fn refresh_ttl(&self, session_id: &str, ttl: Duration) -> Result<()> {
    let key = session_key(session_id);
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let mut conn = self.connection().await?;
    let _applied: bool = self.bounded(conn.expire(&key, secs)).await?;
    Ok(())
  }

  async fn last_ingest_at(&self) -> Result<Option<String>> {
    let mut conn = self.connection().await?;
    self.bounded(conn.get(LAST_INGEST_KEY)).await
  }
}
