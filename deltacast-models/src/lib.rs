//! # deltacast-models
//!
//! Per-provider wire-to-event translators and the [`ChatModel`] trait.
//!
//! Each translator is a private-state machine over an already-open transport
//! byte stream: it slices SSE frames, parses the provider's JSON envelope,
//! and emits the uniform [`StreamEvent`](deltacast_streaming::StreamEvent)
//! model. Connection opening, authentication, and request conversion are
//! external collaborators; nothing in this crate issues an HTTP request.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod model;

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "google")]
pub mod google;

pub use model::{BoxedModel, ChatModel, StreamSupport};
