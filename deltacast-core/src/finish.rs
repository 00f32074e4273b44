//! Normalized finish reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the model stopped producing output, normalized across providers.
///
/// Each provider translator maps its raw finish indicator through its own
/// normalization table into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of turn.
    Stop,
    /// Output token limit reached.
    Length,
    /// The model stopped to call one or more tools.
    ToolCalls,
    /// Output was cut by a safety/content filter.
    ContentFilter,
    /// A reason this client does not recognize, carried verbatim.
    Other(String),
}

impl FinishReason {
    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
