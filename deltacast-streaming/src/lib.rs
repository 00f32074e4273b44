//! # deltacast-streaming
//!
//! The provider-agnostic event model for streamed chat completions, the
//! accumulator that folds an event sequence into one finished
//! [`ChatResponse`](deltacast_core::ChatResponse), and the SSE transport
//! frame reader that provider translators consume.
//!
//! A stream here is an explicit lazy sequence: a pinned state object driven
//! one step at a time by the consumer via [`futures::Stream`]. It is finite,
//! single-pass, and non-restartable; reconstructing it requires opening a new
//! transport call. Each step yields either an event or an error, never both,
//! and at most one terminal condition occurs per stream.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod event;
pub mod sse;
pub mod stream;

pub use context::StreamContext;
pub use event::{StreamEvent, ToolCallDelta};
pub use sse::{SseFrame, SseParser, SseStream};
pub use stream::{collect_stream, stream_from_response, Collected, EventStream};
