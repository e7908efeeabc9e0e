//! Bounded, cancellable authorization with exponential backoff.
//!
//! Only `Unreachable` is retried. A denial is final for the presentation, and
//! an attempt that outlives its timeout counts as `Unreachable`.

use std::time::Duration;

use portalbox_core::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_AUTH_ATTEMPTS,
    DEFAULT_MAX_BACKOFF_MS,
};
use portalbox_core::{AuthorizationClient, AuthorizationResult, Badge, Error, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How many times, and how patiently, an unreachable directory is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds).
    pub initial_backoff_ms: u64,

    /// Factor applied to the delay after every retry.
    pub multiplier: u32,

    /// Upper bound for any single delay (milliseconds).
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use portalbox_controller::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff_after(1), Duration::from_millis(250));
    /// assert_eq!(policy.backoff_after(2), Duration::from_millis(500));
    /// assert_eq!(policy.backoff_after(10), Duration::from_millis(2000));
    /// ```
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = u64::from(self.multiplier).saturating_pow(exponent);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.multiplier == 0 {
            return Err(Error::Config("retry.multiplier must be at least 1".into()));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(Error::Config(format!(
                "retry.max_backoff_ms ({}) is below retry.initial_backoff_ms ({})",
                self.max_backoff_ms, self.initial_backoff_ms
            )));
        }
        Ok(())
    }
}

/// What came of an authorization with retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The directory answered, or every attempt failed.
    Completed {
        result: AuthorizationResult,
        attempts: u32,
    },

    /// Shutdown was requested while waiting.
    Cancelled,
}

/// Ask `client` about `badge`, retrying `Unreachable` per `policy`.
///
/// Every attempt is bounded by `attempt_timeout`. Both the attempts and the
/// backoff sleeps race `cancel`.
pub async fn authorize_with_retry<A: AuthorizationClient>(
    client: &mut A,
    badge: &Badge,
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    cancel: &CancellationToken,
) -> AuthorizationOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return AuthorizationOutcome::Cancelled,
            answer = tokio::time::timeout(attempt_timeout, client.authorize(badge)) => {
                match answer {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(%badge, attempt = attempts, ?attempt_timeout, "Authorization attempt timed out");
                        AuthorizationResult::Unreachable
                    }
                }
            }
        };

        if !result.is_unreachable() || attempts >= policy.max_attempts {
            return AuthorizationOutcome::Completed { result, attempts };
        }

        let delay = policy.backoff_after(attempts);
        debug!(%badge, attempt = attempts, ?delay, "Directory unreachable, backing off");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return AuthorizationOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
