//! # deltacast
//!
//! The streaming-response core of a multi-provider chat-completion client:
//! a provider-agnostic event model, translators that turn provider SSE wire
//! formats into that model, an accumulator that folds a finished stream into
//! one response, and a composable interceptor chain for timeout, retry, and
//! logging around both call paths.
//!
//! ## Quick Start
//!
//! ```ignore
//! use deltacast::prelude::*;
//! use futures::StreamExt;
//!
//! // `transport` is an open SSE byte stream from an Anthropic Messages call.
//! let mut events = AnthropicEventStream::new(transport, StreamContext::new());
//! while let Some(event) = events.next().await {
//!     if let StreamEvent::Content { text } = event? {
//!         print!("{text}");
//!     }
//! }
//! ```
//!
//! Or fold the whole stream into one finished response, keeping whatever
//! arrived before any mid-stream failure:
//!
//! ```ignore
//! use deltacast::{collect_stream, StreamContext};
//!
//! let collected = collect_stream(events).await;
//! let response = collected.into_result()?;
//! ```
//!
//! ## Architecture
//!
//! deltacast is organized as a workspace of focused crates:
//!
//! - [`deltacast_core`] - Request, response, usage, and error types
//! - [`deltacast_streaming`] - Event model, accumulator, SSE frame reader
//! - [`deltacast_models`] - Model trait and provider stream translators
//! - [`deltacast_interceptors`] - Interceptor chain, timeout, retry, logging
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `anthropic` | Anthropic Messages stream translator | ✅ |
//! | `google` | Google Gemini stream translator | ✅ |
//! | `gemini` | Alias for `google` | ❌ |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Request, response, usage, and error types.
pub use deltacast_core as core;

/// Event model, accumulator, and SSE frame reader.
pub use deltacast_streaming as streaming;

/// Model trait and provider stream translators.
pub use deltacast_models as models;

/// Interceptor chain with timeout, retry, and logging entries.
pub use deltacast_interceptors as interceptors;

// ============================================================================
// Core Type Re-exports (Flat)
// ============================================================================

// Errors
pub use deltacast_core::{ClientError, Result};

// Requests and responses
pub use deltacast_core::{
    ChatRequest, ChatResponse, FinishReason, Message, Role, TokenUsage, ToolCall,
};

// Streaming
pub use deltacast_streaming::{
    collect_stream, stream_from_response, Collected, EventStream, SseFrame, SseParser, SseStream,
    StreamContext, StreamEvent, ToolCallDelta,
};

// Models
pub use deltacast_models::{BoxedModel, ChatModel, StreamSupport};

#[cfg(feature = "anthropic")]
pub use deltacast_models::anthropic::AnthropicEventStream;

#[cfg(feature = "google")]
pub use deltacast_models::google::GoogleEventStream;

// Interceptors
pub use deltacast_interceptors::{
    Interceptor, InterceptorChain, LoggingInterceptor, RetryInterceptor, RetryPolicy,
    TimeoutInterceptor, Verbosity,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient prelude for common imports.
///
/// ```ignore
/// use deltacast::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::{
        ChatRequest, ChatResponse, ClientError, FinishReason, Message, Result, Role, TokenUsage,
        ToolCall,
    };

    // Streaming
    pub use crate::streaming::{
        collect_stream, Collected, EventStream, StreamContext, StreamEvent, ToolCallDelta,
    };

    // Models
    pub use crate::models::{BoxedModel, ChatModel, StreamSupport};

    #[cfg(feature = "anthropic")]
    pub use crate::models::anthropic::AnthropicEventStream;

    #[cfg(feature = "google")]
    pub use crate::models::google::GoogleEventStream;

    // Interceptors
    pub use crate::interceptors::{
        InterceptorChain, LoggingInterceptor, RetryInterceptor, RetryPolicy, TimeoutInterceptor,
        Verbosity,
    };
}

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of deltacast.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.2");
    }
}
