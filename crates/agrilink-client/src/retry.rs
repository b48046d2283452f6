//! Retry with exponential back-off and jitter around any fallible async
//! operation.
//!
//! Errors are reduced to an [`ErrorClass`]; the class alone decides whether
//! a retry happens, how many retries are allowed, and the base delay. Each
//! [`run_with_retry`] call owns its attempt counter, so concurrent calls are
//! fully independent.
//!
//! Back-off with the default [`RetryPolicy`]:
//!
//! | Class | Base delay | Retries |
//! |-------|-----------:|--------:|
//! | network / status 0 | 1 000 ms | 3 |
//! | 408 | 3 000 ms | 3 |
//! | 429 | 5 000 ms | 2 |
//! | 5xx | 2 000 ms | 3 |
//! | anything else | n/a | 0 |
//!
//! The delay before retry `n` (counting from 0) is `base × 2ⁿ` plus up to 25 %
//! jitter, capped at 30 s.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;

use crate::error::{ApiError, NormalizedError};

/// What the retry loop needs to know about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No HTTP status at all: connection, DNS or TLS failures.
    Unstructured,
    /// A normalized server error; `0` means the status was unavailable.
    Status(u16),
    /// A local failure that another attempt cannot fix.
    Terminal,
}

impl ErrorClass {
    /// Unstructured errors, status 0, 408, 429 and 5xx are retryable.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorClass::Unstructured => true,
            ErrorClass::Status(status) => matches!(status, 0 | 408 | 429 | 500..=599),
            ErrorClass::Terminal => false,
        }
    }
}

/// Errors the retry loop can classify.
pub trait Retryable {
    fn error_class(&self) -> ErrorClass;
}

impl Retryable for ApiError {
    fn error_class(&self) -> ErrorClass {
        match self {
            ApiError::Transport(_) => ErrorClass::Unstructured,
            ApiError::Status(err) => ErrorClass::Status(err.status),
            ApiError::Validation(_)
            | ApiError::MalformedResponse { .. }
            | ApiError::Encode { .. }
            | ApiError::InvalidBaseUrl { .. }
            | ApiError::Cancelled => ErrorClass::Terminal,
        }
    }
}

impl Retryable for NormalizedError {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::Status(self.status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub rate_limit_base_delay: Duration,
    pub server_error_base_delay: Duration,
    pub timeout_base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the jitter, as a fraction of the
    /// exponential delay.
    pub max_jitter_fraction: f64,
    pub transient_max_attempts: u32,
    pub rate_limit_max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            rate_limit_base_delay: Duration::from_millis(5_000),
            server_error_base_delay: Duration::from_millis(2_000),
            timeout_base_delay: Duration::from_millis(3_000),
            max_delay: Duration::from_millis(30_000),
            max_jitter_fraction: 0.25,
            transient_max_attempts: 3,
            rate_limit_max_attempts: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            transient_max_attempts: 0,
            rate_limit_max_attempts: 0,
            ..Self::default()
        }
    }

    /// Number of retries allowed after the first call; `0` for errors that
    /// are not retryable.
    #[must_use]
    pub fn max_attempts(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::Status(429) => self.rate_limit_max_attempts,
            class if class.is_retryable() => self.transient_max_attempts,
            _ => 0,
        }
    }

    #[must_use]
    pub fn base_delay_for(&self, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::Status(429) => self.rate_limit_base_delay,
            ErrorClass::Status(408) => self.timeout_base_delay,
            ErrorClass::Status(500..=599) => self.server_error_base_delay,
            _ => self.base_delay,
        }
    }

    /// The delay before retry `attempt` with an explicit `jitter` fraction
    /// (clamped to `[0, max_jitter_fraction]`).
    #[must_use]
    pub fn delay_with_jitter(&self, attempt: u32, class: ErrorClass, jitter: f64) -> Duration {
        let exponential =
            self.base_delay_for(class).as_secs_f64() * f64::from(2u32.saturating_pow(attempt));
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, self.max_jitter_fraction.max(0.0))
        } else {
            0.0
        };
        let total = exponential * (1.0 + jitter);
        if total >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(total)
        }
    }

    /// The delay before retry `attempt`, with random jitter.
    #[must_use]
    pub fn delay(&self, attempt: u32, class: ErrorClass) -> Duration {
        let jitter = if self.max_jitter_fraction > 0.0 {
            rand::rng().random_range(0.0..self.max_jitter_fraction)
        } else {
            0.0
        };
        self.delay_with_jitter(attempt, class, jitter)
    }
}

/// State of one retry decision, handed to the observer of
/// [`run_with_retry_observed`].
#[derive(Debug)]
pub struct RetryContext<'a, E> {
    pub context: &'a str,
    /// Zero-based index of the retry about to be scheduled.
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: &'a E,
    pub delay: Duration,
}

impl<E> RetryContext<'_, E> {
    #[must_use]
    pub fn status_message(&self) -> String {
        retry_status_message(self.attempt, self.max_attempts, self.delay)
    }
}

/// Cooperative cancellation for an in-flight retry loop. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Runs `operation`, retrying per `policy` until it succeeds, fails with a
/// non-retryable error, or runs out of retries. The error returned is the
/// one the last call produced, unchanged.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run_with_retry_observed(policy, context, None, |_: &RetryContext<'_, E>| {}, operation).await
}

/// [`run_with_retry`] with cancellation and a hook called before each
/// back-off sleep.
///
/// A cancelled `cancel` token stops the loop before the next retry and cuts
/// short any back-off in progress; the last error is returned.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn run_with_retry_observed<T, E, F, Fut, H>(
    policy: &RetryPolicy,
    context: &str,
    cancel: Option<&CancellationToken>,
    mut on_retry: H,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut(&RetryContext<'_, E>),
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.error_class();
        let max_attempts = policy.max_attempts(class);
        if !class.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::info!(context, attempt, "retry loop cancelled");
            return Err(err);
        }

        let delay = policy.delay(attempt, class);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(
            context,
            attempt = attempt + 1,
            max_attempts,
            delay_ms,
            error = %err,
            "transient API error, retrying after back-off"
        );
        on_retry(&RetryContext {
            context,
            attempt,
            max_attempts,
            last_error: &err,
            delay,
        });

        match cancel {
            Some(token) => {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = token.cancelled() => {
                        tracing::info!(context, attempt, "retry back-off cancelled");
                        return Err(err);
                    }
                }
            }
            None => tokio::time::sleep(delay).await,
        }
        attempt += 1;
    }
}

/// `"Retrying in 3 seconds... (2 attempts remaining)"`, or
/// `"Maximum retry attempts reached"` once none remain.
#[must_use]
pub fn retry_status_message(attempt: u32, max_attempts: u32, delay: Duration) -> String {
    let remaining = max_attempts.saturating_sub(attempt);
    if remaining == 0 {
        return "Maximum retry attempts reached".to_owned();
    }
    let seconds = delay.as_millis().div_ceil(1000);
    format!(
        "Retrying in {seconds} second{}... ({remaining} attempt{} remaining)",
        if seconds == 1 { "" } else { "s" },
        if remaining == 1 { "" } else { "s" },
    )
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
