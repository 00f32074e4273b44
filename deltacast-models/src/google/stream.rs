//! Gemini cumulative-text stream translator.

use super::types::GenerateContentResponse;
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
    /// State machine translating Gemini SSE frames into uniform events.
    ///
    /// Owns the transport byte stream. Successive cumulative text values are
    /// diffed against the previously seen text so consumers only ever see
    /// newly-appended suffixes.
    pub struct GoogleEventStream<S> {
        #[pin]
        frames: SseStream<S>,
        ctx: StreamContext,
        pending: VecDeque<Result<StreamEvent, ClientError>>,
        seen_text: String,
        tool_count: usize,
        finished: bool,
    }
}

impl<S> GoogleEventStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    /// Wrap an already-open transport byte stream.
    pub fn new(transport: S, ctx: StreamContext) -> Self {
        Self {
            frames: SseStream::new(transport),
            ctx,
            pending: VecDeque::new(),
            seen_text: String::new(),
            tool_count: 0,
            finished: false,
        }
    }
}

impl<S> GoogleEventStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin + Send + 'static,
{
    /// Box into the uniform [`EventStream`] type.
    pub fn into_event_stream(self) -> EventStream {
        Box::pin(self)
    }
}

impl<S> Stream for GoogleEventStream<S>
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

            if let Err(err) = this.ctx.check() {
                *this.finished = true;
                return Poll::Ready(Some(Err(err)));
            }

            match this.frames.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    process_chunk(
                        &frame.data,
                        this.pending,
                        this.seen_text,
                        this.tool_count,
                        this.finished,
                    );
                }
                Poll::Ready(Some(Err(err))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    // Gemini signals completion implicitly when no explicit
                    // finishReason was observed.
                    *this.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn process_chunk(
    data: &str,
    pending: &mut VecDeque<Result<StreamEvent, ClientError>>,
    seen_text: &mut String,
    tool_count: &mut usize,
    finished: &mut bool,
) {
    let chunk: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            pending.push_back(Err(ClientError::protocol(format!(
                "malformed stream chunk: {err}"
            ))));
            *finished = true;
            return;
        }
    };

    let Some(candidate) = chunk.candidates.first() else {
        return;
    };

    if let Some(content) = &candidate.content {
        let mut cumulative = String::new();
        for part in &content.parts {
            if let Some(text) = &part.text {
                cumulative.push_str(text);
            }
        }

        if !cumulative.is_empty() {
            if let Some(suffix) = cumulative.strip_prefix(seen_text.as_str()) {
                if !suffix.is_empty() {
                    pending.push_back(Ok(StreamEvent::content(suffix)));
                }
            } else {
                // Upstream rewrote earlier text; no diff exists, so emit the
                // new cumulative value whole rather than guessing.
                tracing::warn!("cumulative text is not a prefix extension");
                pending.push_back(Ok(StreamEvent::content(cumulative.clone())));
            }
            *seen_text = cumulative;
        }

        // Function calls arrive as complete, non-incremental units.
        for part in &content.parts {
            if let Some(call) = &part.function_call {
                let index = *tool_count;
                *tool_count += 1;
                let arguments = call.args.to_string();
                pending.push_back(Ok(StreamEvent::ToolCall(ToolCallDelta {
                    index,
                    id: None,
                    name: Some(call.name.clone()),
                    arguments_fragment: Some(arguments),
                })));
            }
        }
    }

    // Usage and finish reason are taken from the final frame only.
    if let Some(reason) = &candidate.finish_reason {
        if let Some(usage) = &chunk.usage_metadata {
            pending.push_back(Ok(StreamEvent::Usage(TokenUsage::new(
                usage.prompt_token_count,
                usage.candidates_token_count,
            ))));
        }
        pending.push_back(Ok(StreamEvent::done(normalize_finish_reason(reason))));
        *finished = true;
    }
}

/// Finish-reason normalization table.
fn normalize_finish_reason(raw: &str) -> FinishReason {
    match raw {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}
