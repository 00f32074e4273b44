//! Wire envelope for Anthropic streaming frames.
//!
//! Only the streaming surface is modeled here; request construction and the
//! non-streaming response schema are external collaborators.

use serde::Deserialize;

/// One parsed streaming frame.
///
/// The JSON payload carries a redundant `type` field, so the SSE `event:`
/// line is not required to dispatch. Frame types this client does not
/// recognize deserialize to [`AnthropicFrame::Unknown`] and are skipped for
/// forward compatibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicFrame {
    /// Opening frame carrying prompt-side usage counters.
    MessageStart {
        /// Partial message metadata.
        message: StartMessage,
    },

    /// A new content block is opening.
    ContentBlockStart {
        /// Wire index of the block.
        index: usize,
        /// The block being opened.
        content_block: ContentBlock,
    },

    /// Incremental payload for the currently open block.
    ContentBlockDelta {
        /// Wire index of the block.
        index: usize,
        /// The increment.
        delta: BlockDelta,
    },

    /// The block at `index` is complete. Requires no emission.
    ContentBlockStop {
        /// Wire index of the block.
        index: usize,
    },

    /// Final frame carrying completion-side usage and the raw stop reason.
    MessageDelta {
        /// Stop information.
        delta: MessageDeltaBody,
        /// Completion-side usage counters.
        #[serde(default)]
        usage: Option<OutputUsage>,
    },

    /// Terminal frame.
    MessageStop,

    /// Keepalive.
    Ping,

    /// Provider-reported mid-stream error.
    Error {
        /// Error details.
        error: ErrorBody,
    },

    /// Any frame type this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// Message metadata from `message_start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartMessage {
    /// Prompt-side usage.
    #[serde(default)]
    pub usage: InputUsage,
}

/// Prompt-side usage counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub input_tokens: u64,
}

/// Completion-side usage counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputUsage {
    /// Tokens produced so far.
    #[serde(default)]
    pub output_tokens: u64,
}

/// A content block announced by `content_block_start`.
///
/// For tool-use blocks this is the only frame where the tool's identifier
/// and name appear.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text block, usually opened empty.
    Text {
        /// Initial text.
        #[serde(default)]
        text: String,
    },
    /// Thinking block, usually opened empty.
    Thinking {
        /// Initial thinking text.
        #[serde(default)]
        thinking: String,
    },
    /// Tool invocation block.
    ToolUse {
        /// Tool call ID.
        id: String,
        /// Tool name.
        name: String,
    },
    /// A block type this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// An increment for the currently open block.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Incremental content text.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// Incremental thinking text.
    ThinkingDelta {
        /// The fragment.
        thinking: String,
    },
    /// Incremental argument-JSON fragment for the open tool block.
    InputJsonDelta {
        /// The JSON substring.
        partial_json: String,
    },
    /// A delta type this client does not recognize.
    #[serde(other)]
    Unknown,
}

/// Stop information from `message_delta`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    /// Raw finish indicator, mapped through the normalization table.
    pub stop_reason: Option<String>,
}

/// Provider error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// The provider's message, verbatim.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_start() {
        let json = r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":25}}}"#;
        let frame: AnthropicFrame = serde_json::from_str(json).unwrap();
        match frame {
            AnthropicFrame::MessageStart { message } => {
                assert_eq!(message.usage.input_tokens, 25);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_use_block_start() {
        let json = r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"call_1","name":"get_weather","input":{}}}"#;
        let frame: AnthropicFrame = serde_json::from_str(json).unwrap();
        match frame {
            AnthropicFrame::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { id, name },
            } => {
                assert_eq!(index, 1);
                assert_eq!(id, "call_1");
                assert_eq!(name, "get_weather");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_frame_type_tolerated() {
        let json = r#"{"type":"content_block_signature","index":0}"#;
        let frame: AnthropicFrame = serde_json::from_str(json).unwrap();
        assert!(matches!(frame, AnthropicFrame::Unknown));
    }

    #[test]
    fn test_parse_message_delta() {
        let json = r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#;
        let frame: AnthropicFrame = serde_json::from_str(json).unwrap();
        match frame {
            AnthropicFrame::MessageDelta { delta, usage } => {
                assert_eq!(delta.stop_reason.as_deref(), Some("end_turn"));
                assert_eq!(usage.unwrap().output_tokens, 5);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
