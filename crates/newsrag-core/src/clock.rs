//! Wall-clock abstraction.
//!
//! Session expiry and message timestamps read the time through [`Clock`] so
//! tests can move time forward without sleeping.

use std::sync::{
  Arc,
  atomic::{AtomicI64, Ordering},
};

use chrono::Utc;

/// A source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
  fn now_millis(&self) -> i64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_millis(&self) -> i64 { Utc::now().timestamp_millis() }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
  now: Arc<AtomicI64>,
}

impl ManualClock {
  pub fn new(start_millis: i64) -> Self {
    Self { now: Arc::new(AtomicI64::new(start_millis)) }
  }

  pub fn advance(&self, millis: i64) {
    self.now.fetch_add(millis, Ordering::SeqCst);
  }

  pub fn set(&self, millis: i64) { self.now.store(millis, Ordering::SeqCst); }
}

impl Clock for ManualClock {
  fn now_millis(&self) -> i64 { self.now.load(Ordering::SeqCst) }
}
