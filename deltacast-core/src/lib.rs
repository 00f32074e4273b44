//! # deltacast-core
//!
//! Core types for the deltacast streaming-response client: chat requests and
//! responses, token usage snapshots, finish reasons, and the error taxonomy
//! shared by every other crate in the workspace.
//!
//! This crate is intentionally small. Provider-specific wire formats live in
//! `deltacast-models`; the event model and accumulator live in
//! `deltacast-streaming`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod finish;
pub mod request;
pub mod response;
pub mod usage;

pub use error::{ClientError, Result};
pub use finish::FinishReason;
pub use request::{ChatRequest, Message, Role};
pub use response::{ChatResponse, ToolCall};
pub use usage::TokenUsage;
