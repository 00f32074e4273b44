//! Incremental-block stream translation for the Anthropic Messages API.
//!
//! Frames carry a `type` discriminator; content arrives as typed blocks that
//! open, receive deltas, and close. This module maps that lifecycle onto the
//! uniform event model.

mod stream;
mod types;

pub use stream::AnthropicEventStream;
pub use types::{
    AnthropicFrame, BlockDelta, ContentBlock, ErrorBody, InputUsage, MessageDeltaBody,
    OutputUsage, StartMessage,
};
