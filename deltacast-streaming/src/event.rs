//! Stream event types.
//!
//! Every provider translator emits this uniform event model regardless of
//! how the upstream service shapes its wire deltas.

use deltacast_core::{FinishReason, TokenUsage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An incremental fragment of one logical tool invocation.
///
/// `index` is the only reliable correlation key: fragments for different
/// invocations may interleave arbitrarily, and consumers must never key on
/// arrival order across indices. `id` and `name` are guaranteed present only
/// on the first fragment for a given index. `arguments_fragment` values for
/// one index concatenate in arrival order to reconstruct the full JSON
/// argument payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Which logical tool invocation this fragment belongs to.
    pub index: usize,
    /// Provider-assigned call ID; first fragment only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name; first fragment only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Incremental slice of the JSON argument document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments_fragment: Option<String>,
}

impl ToolCallDelta {
    /// Header fragment: announces a new invocation with its ID and name and
    /// an empty arguments fragment.
    pub fn header(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments_fragment: Some(String::new()),
        }
    }

    /// Argument-only fragment for an already-announced invocation.
    pub fn arguments(index: usize, fragment: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments_fragment: Some(fragment.into()),
        }
    }
}

/// One event in a streamed chat completion.
///
/// Exactly one payload is active per tag. Errors are not a tagged value:
/// they travel through the sequence's error channel
/// (`Result<StreamEvent, ClientError>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A text fragment to append.
    Content {
        /// The fragment.
        text: String,
    },

    /// A chain-of-thought fragment to append; separate channel from content.
    Reasoning {
        /// The fragment.
        text: String,
    },

    /// A tool invocation fragment.
    ToolCall(ToolCallDelta),

    /// A token-usage snapshot. Later snapshots supersede earlier ones.
    Usage(TokenUsage),

    /// Terminal event carrying the normalized finish reason. No events
    /// follow it.
    Done {
        /// Why the model stopped.
        finish_reason: FinishReason,
    },
}

impl StreamEvent {
    /// Create a content event.
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    /// Create a reasoning event.
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    /// Create the terminal event.
    pub fn done(finish_reason: FinishReason) -> Self {
        Self::Done { finish_reason }
    }

    /// Whether this event ends the stream under normal completion.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// The text fragment, if this is a content event.
    pub fn as_content(&self) -> Option<&str> {
        match self {
            Self::Content { text } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content { text } => write!(f, "{}", text),
            Self::Reasoning { text } => write!(f, "[reasoning] {}", text),
            Self::ToolCall(delta) => match (&delta.name, &delta.arguments_fragment) {
                (Some(name), _) => write!(f, "[tool_call {}] {}", delta.index, name),
                (None, Some(args)) => write!(f, "[tool_args {}] {}", delta.index, args),
                (None, None) => write!(f, "[tool_call {}]", delta.index),
            },
            Self::Usage(usage) => write!(f, "[usage] {} tokens", usage.total_tokens),
            Self::Done { finish_reason } => write!(f, "[done] {}", finish_reason),
        }
    }
}
