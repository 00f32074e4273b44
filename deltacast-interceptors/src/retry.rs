//! Automatic retry for the one-shot path.
//!
//! Retrying wraps only the one-shot path. A partially consumed stream has
//! already surfaced events to the caller and cannot be transparently
//! replayed, so the retry entry carries no streaming wrapper at all and the
//! chain skips it when opening streams.

use crate::chain::{Interceptor, UnaryInterceptor, UnaryNext};
use async_trait::async_trait;
use deltacast_core::{ChatRequest, ChatResponse, ClientError};
use deltacast_streaming::StreamContext;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether an error is worth retrying.
pub type RetryPredicate = Arc<dyn Fn(&ClientError) -> bool + Send + Sync>;

/// Retry budget and backoff schedule.
///
/// Delays grow exponentially from `initial_delay`, are capped at
/// `max_delay`, and carry additive jitter drawn uniformly from
/// `[0, delay * jitter_fraction)`.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay, before jitter.
    pub max_delay: Duration,
    /// Fraction of the capped delay used as the jitter range.
    pub jitter_fraction: f64,
    retry_on: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter_fraction: 0.1,
            retry_on: Arc::new(ClientError::is_retryable),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter_fraction", &self.jitter_fraction)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// The default policy: 3 retries, 500ms initial delay, 60s cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry budget.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter fraction. Zero makes the schedule deterministic.
    #[must_use]
    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Replace the retryability predicate.
    #[must_use]
    pub fn retry_on(
        mut self,
        predicate: impl Fn(&ClientError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_on = Arc::new(predicate);
        self
    }

    fn should_retry(&self, error: &ClientError) -> bool {
        (self.retry_on)(error)
    }

    /// Delay before the retry following attempt `attempt` (1-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let base = self.initial_delay.as_secs_f64() * f64::from(1u32 << exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter_fraction > 0.0 {
            capped * self.jitter_fraction * rand::thread_rng().gen::<f64>()
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + jitter)
    }
}

/// Retries transient one-shot failures with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    policy: RetryPolicy,
}

impl RetryInterceptor {
    /// A retry interceptor with the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Package as a chain entry.
    ///
    /// Only the one-shot slot is populated; streams pass through untouched.
    #[must_use]
    pub fn into_entry(self) -> Interceptor {
        Interceptor::new("retry").with_unary(Arc::new(self))
    }
}

#[async_trait]
impl UnaryInterceptor for RetryInterceptor {
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: UnaryNext<'_>,
    ) -> Result<ChatResponse, ClientError> {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match next.run(request.clone(), ctx.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if !self.policy.should_retry(&err) => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    tracing::warn!(attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(ClientError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let wait = self.policy.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = ctx.cancellation().cancelled() => {
                            return Err(ClientError::Cancelled);
                        }
                    }
                }
            }
        }
    }
}
