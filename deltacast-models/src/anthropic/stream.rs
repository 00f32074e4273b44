//! Anthropic incremental-block stream translator.

use super::types::{AnthropicFrame, BlockDelta, ContentBlock};
use bytes::Bytes;
use deltacast_core::{ClientError, FinishReason, TokenUsage};
use deltacast_streaming::{
    EventStream, SseStream, StreamContext, StreamEvent, ToolCallDelta,
};
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// State machine translating Anthropic SSE frames into uniform events.
    ///
    /// Owns the transport byte stream: dropping this value releases the
    /// connection, and it is the only owner. All translation state is
    /// private to this stream's single consumption.
    pub struct AnthropicEventStream<S> {
        #[pin]
        frames: SseStream<S>,
        ctx: StreamContext,
        pending: VecDeque<Result<StreamEvent, ClientError>>,
        input_tokens: u64,
        output_tokens: u64,
        stop_reason: Option<String>,
        // Zero-based counter, incremented once per tool-use block open.
        tool_blocks: usize,
        // Assigned index of the last-opened tool block; argument fragments
        // reference it until the next tool block opens.
        last_tool_index: Option<usize>,
        usage_emitted: bool,
        finished: bool,
    }
}

impl<S> AnthropicEventStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    /// Wrap an already-open transport byte stream.
    pub fn new(transport: S, ctx: StreamContext) -> Self {
        Self {
            frames: SseStream::new(transport),
            ctx,
            pending: VecDeque::new(),
            input_tokens: 0,
            output_tokens: 0,
            stop_reason: None,
            tool_blocks: 0,
            last_tool_index: None,
            usage_emitted: false,
            finished: false,
        }
    }
}

impl<S> AnthropicEventStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin + Send + 'static,
{
    /// Box into the uniform [`EventStream`] type.
    pub fn into_event_stream(self) -> EventStream {
        Box::pin(self)
    }
}

impl<S> Stream for AnthropicEventStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    type Item = Result<StreamEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            // Cancellation is observed before each frame read, never mid-read.
            if let Err(err) = this.ctx.check() {
                *this.finished = true;
                return Poll::Ready(Some(Err(err)));
            }

            match this.frames.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    process_frame(
                        &frame.data,
                        this.pending,
                        this.input_tokens,
                        this.output_tokens,
                        this.stop_reason,
                        this.tool_blocks,
                        this.last_tool_index,
                        this.usage_emitted,
                        this.finished,
                    );
                }
                Poll::Ready(Some(Err(err))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    // Implicit completion: end of transport with no terminal
                    // frame simply ends the sequence.
                    *this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_frame(
    data: &str,
    pending: &mut VecDeque<Result<StreamEvent, ClientError>>,
    input_tokens: &mut u64,
    output_tokens: &mut u64,
    stop_reason: &mut Option<String>,
    tool_blocks: &mut usize,
    last_tool_index: &mut Option<usize>,
    usage_emitted: &mut bool,
    finished: &mut bool,
) {
    let frame: AnthropicFrame = match serde_json::from_str(data) {
        Ok(frame) => frame,
        Err(err) => {
            pending.push_back(Err(ClientError::protocol(format!(
                "malformed stream frame: {err}"
            ))));
            *finished = true;
            return;
        }
    };

    match frame {
        AnthropicFrame::MessageStart { message } => {
            *input_tokens = message.usage.input_tokens;
        }

        AnthropicFrame::ContentBlockStart { content_block, .. } => match content_block {
            ContentBlock::Text { text } => {
                if !text.is_empty() {
                    pending.push_back(Ok(StreamEvent::content(text)));
                }
            }
            ContentBlock::Thinking { thinking } => {
                if !thinking.is_empty() {
                    pending.push_back(Ok(StreamEvent::reasoning(thinking)));
                }
            }
            ContentBlock::ToolUse { id, name } => {
                // The only frame carrying the tool's ID and name: capture and
                // emit immediately with an empty arguments fragment.
                let index = *tool_blocks;
                *tool_blocks += 1;
                *last_tool_index = Some(index);
                pending.push_back(Ok(StreamEvent::ToolCall(ToolCallDelta::header(
                    index, id, name,
                ))));
            }
            ContentBlock::Unknown => {
                tracing::debug!("skipping unrecognized content block type");
            }
        },

        AnthropicFrame::ContentBlockDelta { delta, .. } => match delta {
            BlockDelta::TextDelta { text } => {
                pending.push_back(Ok(StreamEvent::content(text)));
            }
            BlockDelta::ThinkingDelta { thinking } => {
                pending.push_back(Ok(StreamEvent::reasoning(thinking)));
            }
            BlockDelta::InputJsonDelta { partial_json } => match *last_tool_index {
                Some(index) => {
                    pending.push_back(Ok(StreamEvent::ToolCall(ToolCallDelta::arguments(
                        index,
                        partial_json,
                    ))));
                }
                None => {
                    tracing::warn!("input_json_delta with no open tool block, skipping");
                }
            },
            BlockDelta::Unknown => {
                tracing::debug!("skipping unrecognized delta type");
            }
        },

        AnthropicFrame::ContentBlockStop { .. } => {}

        AnthropicFrame::MessageDelta { delta, usage } => {
            if let Some(usage) = usage {
                *output_tokens = usage.output_tokens;
            }
            if delta.stop_reason.is_some() {
                *stop_reason = delta.stop_reason;
            }
            // One consolidated snapshot summing prompt-side and
            // completion-side counters, emitted before the terminal frame.
            pending.push_back(Ok(StreamEvent::Usage(TokenUsage::new(
                *input_tokens,
                *output_tokens,
            ))));
            *usage_emitted = true;
        }

        AnthropicFrame::MessageStop => {
            if !*usage_emitted && *input_tokens > 0 {
                pending.push_back(Ok(StreamEvent::Usage(TokenUsage::new(
                    *input_tokens,
                    *output_tokens,
                ))));
                *usage_emitted = true;
            }
            pending.push_back(Ok(StreamEvent::done(normalize_stop_reason(
                stop_reason.as_deref(),
            ))));
            *finished = true;
        }

        AnthropicFrame::Ping => {}

        AnthropicFrame::Error { error } => {
            pending.push_back(Err(ClientError::provider(error.message)));
            *finished = true;
        }

        AnthropicFrame::Unknown => {
            tracing::debug!("skipping unrecognized frame type");
        }
    }
}

/// Finish-reason normalization table.
fn normalize_stop_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("end_turn") | Some("stop_sequence") | None => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("tool_use") => FinishReason::ToolCalls,
        Some("refusal") => FinishReason::ContentFilter,
        Some(other) => FinishReason::Other(other.to_string()),
    }
}
