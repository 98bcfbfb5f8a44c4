//! The in-process fallback implementation of
//! [`SessionStore`].

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use newsrag_core::{
  clock::{Clock, SystemClock},
  message::Message,
  store::{LAST_INGEST_KEY, SESSION_TTL, SessionStore, session_key},
};

use crate::Result;

// ─── State ───────────────────────────────────────────────────────────────────

struct Log {
  messages:   Vec<Message>,
  /// Epoch millis after which the log is treated as absent.
  expires_at: i64,
}

#[derive(Default)]
struct State {
  logs:    HashMap<String, Log>,
  scalars: HashMap<String, String>,
}

impl State {
  /// The live log under `key`, dropping it first if it has expired.
  fn live(&mut self, key: &str, now: i64) -> Option<&mut Log> {
    if self.logs.get(key).is_some_and(|log| log.expires_at <= now) {
      self.logs.remove(key);
    }
    self.logs.get_mut(key)
  }

  /// Drop every expired log, including those no client will touch again.
  fn purge_expired(&mut self, now: i64) {
    self.logs.retain(|_, log| log.expires_at > now);
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A session store held entirely in process memory.
///
/// Expiry is enforced against the injected [`Clock`]: lazily on access, and
/// in bulk on every append.
/// Appends to the same session are serialised by a lock, so concurrent
/// writers never lose a message. Nothing survives a restart.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct MemoryStore {
  state: Arc<Mutex<State>>,
  clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
  fn default() -> Self { Self::new() }
}

impl MemoryStore {
  pub fn new() -> Self { Self::with_clock(Arc::new(SystemClock)) }

  /// A store whose expiry decisions read time from `clock`.
  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self {
      state: Arc::new(Mutex::new(State::default())),
      clock,
    }
  }

  /// Record an ingestion timestamp, as the ingest tooling would.
  pub fn set_last_ingest_at(&self, value: impl Into<String>) {
    self.lock().scalars.insert(LAST_INGEST_KEY.to_owned(), value.into());
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    // A panic while holding the lock cannot leave a log half-written, so a
    // poisoned mutex is still safe to use.
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[cfg(test)]
  pub(crate) fn log_count(&self) -> usize { self.lock().logs.len() }

  fn expiry(&self, ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    self.clock.now_millis().saturating_add(ttl_ms)
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for MemoryStore {
  type Error = crate::Error;

  async fn append(&self, session_id: &str, message: &Message) -> Result<()> {
    let key = session_key(session_id);
    let now = self.clock.now_millis();
    let expires_at = self.expiry(SESSION_TTL);

    let mut state = self.lock();
    state.purge_expired(now);
    match state.live(&key, now) {
      Some(log) => {
        log.messages.push(message.clone());
        log.expires_at = expires_at;
      }
      None => {
        state.logs.insert(key, Log {
          messages: vec![message.clone()],
          expires_at,
        });
      }
    }
    Ok(())
  }

  async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
    let key = session_key(session_id);
    let now = self.clock.now_millis();
    Ok(
      self
        .lock()
        .live(&key, now)
        .map(|log| log.messages.clone())
        .unwrap_or_default(),
    )
  }

  async fn reset(&self, session_id: &str) -> Result<()> {
    self.lock().logs.remove(&session_key(session_id));
    Ok(())
  }

  async fn refresh_ttl(&self, session_id: &str, ttl: Duration) -> Result<()> {
    let key = session_key(session_id);
    let now = self.clock.now_millis();
    let expires_at = self.expiry(ttl);
    if let Some(log) = self.lock().live(&key, now) {
      log.expires_at = expires_at;
    }
    Ok(())
  }

  async fn last_ingest_at(&self) -> Result<Option<String>> {
    Ok(self.lock().scalars.get(LAST_INGEST_KEY).cloned())
  }
}
