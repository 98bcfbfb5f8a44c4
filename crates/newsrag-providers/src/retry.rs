//! Bounded retry with exponential backoff and jitter.
//!
//! Not tied to any particular client: callers pass the operation and a
//! predicate deciding which failures are worth another attempt.

use std::{future::Future, time::Duration};

use rand_core::{OsRng, RngCore as _};

/// How often and how patiently to retry an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total calls, including the first. Zero is treated as one.
  pub max_attempts:   u32,
  /// Wait before the first retry.
  pub base_delay:     Duration,
  /// Multiplier applied to the wait for each subsequent retry.
  pub backoff_factor: u32,
  /// Upper bound (exclusive) of the random delay added to every wait, so
  /// concurrent callers don't retry in lockstep.
  pub jitter:         Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:   3,
      base_delay:     Duration::from_millis(800),
      backoff_factor: 2,
      jitter:         Duration::from_millis(250),
    }
  }
}

/// Why [`RetryPolicy::run`] gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
  /// Every attempt failed with a retryable error; `last` is the final one.
  Exhausted { attempts: u32, last: E },
  /// A non-retryable error ended the loop early.
  Aborted(E),
}

impl RetryPolicy {
  /// The wait before retry number `retry` (1-based), excluding jitter:
  /// `base_delay * backoff_factor^(retry - 1)`.
  pub fn backoff(&self, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1);
    let factor = self.backoff_factor.max(1).saturating_pow(exponent);
    self.base_delay.saturating_mul(factor)
  }

  fn jitter_sample(&self) -> Duration {
    let bound = u64::try_from(self.jitter.as_nanos()).unwrap_or(u64::MAX);
    if bound == 0 {
      return Duration::ZERO;
    }
    Duration::from_nanos(OsRng.next_u64() % bound)
  }

  /// Call `op` until it succeeds, fails with an error `is_retryable` rejects,
  /// or `max_attempts` calls have been made. `op` receives the 1-based
  /// attempt number.
  pub async fn run<T, E, F, Fut>(
    &self,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
  ) -> Result<T, RetryError<E>>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
  {
    let max_attempts = self.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      let err = match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(err) => err,
      };

      if !is_retryable(&err) {
        return Err(RetryError::Aborted(err));
      }
      if attempt >= max_attempts {
        return Err(RetryError::Exhausted { attempts: attempt, last: err });
      }

      let delay = self.backoff(attempt) + self.jitter_sample();
      tracing::warn!(
        attempt,
        max_attempts,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "retryable failure; backing off"
      );
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}
