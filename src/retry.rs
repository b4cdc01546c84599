use std::{fmt, future::Future, num::NonZeroUsize, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::error::{DiscoveryError, RequestError};

/// Errors that can tell whether trying again might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// `408`, `429` and `5xx` statuses and transport failures are transient.
/// A request that could not be built or a body that could not be decoded will fail the same way again.
impl Transient for RequestError {
    fn is_transient(&self) -> bool {
        match self {
            RequestError::Api { code, .. } => matches!(code, 408 | 429 | 500..=599),
            RequestError::Transport(_) => true,
            RequestError::InvalidSegment { .. }
            | RequestError::Build { .. }
            | RequestError::Decode(_) => false,
        }
    }
}

impl Transient for DiscoveryError {
    fn is_transient(&self) -> bool {
        match self {
            DiscoveryError::Request { source, .. } => source.is_transient(),
            DiscoveryError::Malformed { .. } => false,
        }
    }
}

/// Exponential wait schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub cap: Duration,
    pub factor: f64,
}

impl Backoff {
    pub const fn new(initial: Duration, cap: Duration, factor: f64) -> Self {
        Self {
            initial,
            cap,
            factor,
        }
    }

    /// Retry immediately.
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1.0)
    }

    fn first(&self) -> Duration {
        self.initial.min(self.cap)
    }

    fn after(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor.max(1.0)).min(self.cap)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(5), 2.0)
    }
}

/// How often and how patiently to repeat a failed call.
///
/// Nothing in this crate retries on its own. Callers wrap a client call in
/// [`retry_with_policy`] when they want it.
pub struct RetryPolicy<E> {
    /// Attempts including the first call.
    pub max_attempts: NonZeroUsize,
    pub backoff: Backoff,
    pub should_retry: fn(&E) -> bool,
}

impl<E> RetryPolicy<E> {
    pub fn with_max_attempts(self, max_attempts: NonZeroUsize) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    pub fn with_backoff(self, backoff: Backoff) -> Self {
        Self { backoff, ..self }
    }

    pub fn with_classifier(self, should_retry: fn(&E) -> bool) -> Self {
        Self {
            should_retry,
            ..self
        }
    }
}

impl<E: Transient> RetryPolicy<E> {
    /// A policy that makes exactly one attempt.
    pub fn once() -> Self {
        Self::default().with_max_attempts(NonZeroUsize::MIN)
    }
}

impl<E: Transient> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN),
            backoff: Backoff::default(),
            should_retry: E::is_transient,
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Call `operation` until it succeeds, fails with an error the policy does not retry,
/// or the attempts run out. The last error is returned unchanged.
pub async fn retry_with_policy<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = policy.backoff.first();
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if attempt >= policy.max_attempts.get() || !(policy.should_retry)(&error) {
            return Err(error);
        }

        warn!(attempt, %error, ?delay, "request failed, retrying");
        sleep(delay).await;
        delay = policy.backoff.after(delay);
        attempt += 1;
    }
}
