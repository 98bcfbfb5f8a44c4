//! The `SessionStore` trait and key layout.
//!
//! The trait is implemented by storage backends (`newsrag-store`). Higher
//! layers (`newsrag-api`) depend on this abstraction, never on a concrete
//! backend.

use std::{future::Future, time::Duration};

use crate::message::Message;

/// Sessions expire this long after their most recent write.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Scalar key holding the timestamp of the last ingestion run.
pub const LAST_INGEST_KEY: &str = "ingest:lastAt";

/// The namespaced key holding a session's message log.
pub fn session_key(session_id: &str) -> String {
  format!("chat:session:{session_id}")
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// An expiring, append-only message log keyed by session id.
///
/// A session exists implicitly once its log has been written and disappears
/// when reset or when its TTL elapses without further writes.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append `message` to the end of the session's log and refresh its TTL.
  ///
  /// If the backend cannot make both steps atomic, a failed TTL refresh is
  /// logged and tolerated: the append still counts as successful.
  fn append<'a>(
    &'a self,
    session_id: &'a str,
    message: &'a Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The full log in insertion order; empty if absent or expired.
  fn read_all<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Delete the log. Resetting an absent session is not an error.
  fn reset<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Set the session to expire `ttl` from now.
  fn refresh_ttl<'a>(
    &'a self,
    session_id: &'a str,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The raw value under [`LAST_INGEST_KEY`], if any ingestion has run.
  fn last_ingest_at(
    &self,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;
}
