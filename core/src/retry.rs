//! Bounded retry with optional multiplicative backoff.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::{Error, Result};

/// RetryPolicy bounds how often and how fast an operation is retried.
///
/// The delay before retry `n` (0-based) is
/// `initial_delay * backoff_multiplier ^ n`, capped at `max_delay` when set.
/// A multiplier of `1.0` gives a fixed period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    /// 3 attempts, starting at 1s and doubling, capped at 30s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a fixed delay between attempts.
    ///
    /// `max_attempts` counts every attempt including the first one; zero is
    /// treated as one.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: None,
        }
    }

    /// Grow the delay by `multiplier` after every attempt.
    ///
    /// Values below `1.0` (or not finite) are treated as `1.0`.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    /// Cap the delay between attempts.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Total number of attempts, at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Delay to wait after the given attempt (0-based) failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exp);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Run `op` until it succeeds, fails permanently or the budget runs out.
    ///
    /// - Retryable errors (`Transient`, `Timeout`) are retried after the
    ///   policy delay.
    /// - Any other error, authorization failures included, is returned
    ///   at once without consuming further attempts.
    /// - Running out of attempts yields `ErrorKind::Timeout` with the last
    ///   error as source.
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= max_attempts {
                warn!("{what} still failing after {max_attempts} attempts: {err}");
                return Err(Error::timeout(format!(
                    "{what} still failing after {max_attempts} attempts"
                ))
                .with_source(err));
            }

            let delay = self.delay_for_attempt(attempt - 1);
            debug!("{what} attempt {attempt}/{max_attempts} failed: {err}, retrying in {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }
}
