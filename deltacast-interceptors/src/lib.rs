//! # deltacast-interceptors
//!
//! A composable interceptor chain wrapping the two call paths of a model
//! client, plus the three standard entries: deadline enforcement, retry with
//! exponential backoff, and structured logging.
//!
//! Entries run in configuration order with the first entry outermost, so the
//! conventional arrangement is logging, then timeout, then retry: logging
//! observes everything including retried attempts, the timeout caps the whole
//! retried sequence, and the retry entry re-invokes only the bare call.
//!
//! ```no_run
//! use deltacast_interceptors::{
//!     InterceptorChain, LoggingInterceptor, RetryInterceptor, RetryPolicy,
//!     TimeoutInterceptor, Verbosity,
//! };
//! use std::time::Duration;
//!
//! let chain = InterceptorChain::new()
//!     .with(LoggingInterceptor::new(Verbosity::Standard).into_entry())
//!     .with(TimeoutInterceptor::new(Duration::from_secs(120)).into_entry())
//!     .with(RetryInterceptor::new(RetryPolicy::default()).into_entry());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chain;
pub mod logging;
pub mod retry;
pub mod timeout;

pub use chain::{
    Interceptor, InterceptorChain, StreamHandler, StreamInterceptor, StreamNext, UnaryHandler,
    UnaryInterceptor, UnaryNext,
};
pub use logging::{LogRecord, LogSink, LoggingInterceptor, NoopSink, TracingSink, Verbosity};
pub use retry::{RetryInterceptor, RetryPolicy, RetryPredicate};
pub use timeout::TimeoutInterceptor;
