//! Per-call deadline and cancellation context.
//!
//! An explicit handle passed as an argument into every entry point that
//! needs it, never an ambient lookup. Cancellation is cooperative: it is
//! observed at the top of each read-or-wait loop via [`StreamContext::check`]
//! and causes deterministic termination with a cancellation-flavored error.

use deltacast_core::ClientError;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation handle for one call.
///
/// The default context never cancels and has no deadline.
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl StreamContext {
    /// A context with no deadline and a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancellation: CancellationToken::new(),
        }
    }

    /// The absolute deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation token for this call.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Derive a child context whose deadline is at most `timeout` from now.
    ///
    /// Standard nested-deadline semantics: the earliest deadline governs, so
    /// a shorter caller-supplied deadline takes precedence over `timeout`.
    /// The child token is cancelled whenever this context's token is.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) => Some(existing.min(candidate)),
            None => Some(candidate),
        };
        Self {
            deadline,
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Cooperative check, called at the top of each read-or-wait loop.
    ///
    /// Returns [`ClientError::Cancelled`] if the token has fired, or
    /// [`ClientError::DeadlineExceeded`] if the deadline has elapsed.
    pub fn check(&self) -> Result<(), ClientError> {
        if self.cancellation.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ClientError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
