//! Lazy event sequences and the accumulator.
//!
//! [`EventStream`] is the uniform stream type every translator and
//! interceptor produces: a pinned, boxed, single-pass sequence driven by the
//! consumer. [`collect_stream`] is the convenience path that drains one to
//! completion; [`stream_from_response`] is the designated fallback for
//! sources that cannot deliver incrementally.

use crate::event::{StreamEvent, ToolCallDelta};
use deltacast_core::{ChatResponse, ClientError, FinishReason, ToolCall};
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

/// A lazy, single-consumption sequence of stream events.
///
/// Finite and non-restartable: once consumption completes, errors, or is
/// abandoned, the underlying transport resource has already been released
/// and the value is spent.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// The outcome of draining an event stream.
///
/// On a mid-stream error the response holds everything assembled from events
/// observed before the error; partial data is never discarded.
#[derive(Debug)]
pub struct Collected {
    /// The assembled (possibly partial) response.
    pub response: ChatResponse,
    /// The error that terminated consumption, if any.
    pub error: Option<ClientError>,
}

impl Collected {
    /// Convert into a plain result, discarding the partial response on error.
    pub fn into_result(self) -> Result<ChatResponse, ClientError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response),
        }
    }
}

/// In-progress state for one tool invocation, keyed by index.
#[derive(Debug, Clone, Default)]
struct ToolCallBuilder {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallBuilder {
    fn apply(&mut self, delta: &ToolCallDelta) {
        if let Some(id) = &delta.id {
            self.id.get_or_insert_with(|| id.clone());
        }
        if let Some(name) = &delta.name {
            self.name.get_or_insert_with(|| name.clone());
        }
        if let Some(fragment) = &delta.arguments_fragment {
            self.arguments.push_str(fragment);
        }
    }

    fn build(self) -> ToolCall {
        ToolCall {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            arguments: self.arguments,
        }
    }
}

/// Drain an event stream to completion and assemble one finished response.
///
/// A pure left-fold over the sequence: content and reasoning fragments
/// concatenate in arrival order; tool-call fragments concatenate per index
/// with no reordering or deduplication; usage and finish reason are
/// last-write-wins snapshots. Consumption stops at the first terminal
/// condition (a `Done` event or a propagated error) and nothing is read
/// afterwards.
pub async fn collect_stream(mut stream: EventStream) -> Collected {
    let mut content = String::new();
    let mut reasoning = String::new();
    // Grown on demand to the highest index seen, never shrunk. An index may
    // appear before lower indices exist yet.
    let mut builders: Vec<ToolCallBuilder> = Vec::new();
    let mut usage = None;
    let mut finish_reason = None;
    let mut error = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamEvent::Content { text }) => content.push_str(&text),
            Ok(StreamEvent::Reasoning { text }) => reasoning.push_str(&text),
            Ok(StreamEvent::ToolCall(delta)) => {
                if delta.index >= builders.len() {
                    builders.resize_with(delta.index + 1, ToolCallBuilder::default);
                }
                builders[delta.index].apply(&delta);
            }
            Ok(StreamEvent::Usage(snapshot)) => usage = Some(snapshot),
            Ok(StreamEvent::Done { finish_reason: reason }) => {
                finish_reason = Some(reason);
                break;
            }
            Err(err) => {
                error = Some(err);
                break;
            }
        }
    }

    Collected {
        response: ChatResponse {
            content,
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls: builders.into_iter().map(ToolCallBuilder::build).collect(),
            usage,
            finish_reason,
        },
        error,
    }
}

/// Wrap an already-complete response into an event stream.
///
/// The fallback path for sources that do not support incremental delivery.
/// Yields, in order: a content event (if non-empty), a reasoning event (if
/// non-empty), one header event per tool call with its full arguments in a
/// single fragment (index assigned by position), a usage event (if present),
/// and a terminal `Done` event. An absent finish reason normalizes to
/// [`FinishReason::Stop`].
pub fn stream_from_response(response: ChatResponse) -> EventStream {
    let mut events = Vec::new();

    if !response.content.is_empty() {
        events.push(StreamEvent::content(response.content));
    }
    if let Some(reasoning) = response.reasoning {
        if !reasoning.is_empty() {
            events.push(StreamEvent::reasoning(reasoning));
        }
    }
    for (index, call) in response.tool_calls.into_iter().enumerate() {
        events.push(StreamEvent::ToolCall(ToolCallDelta {
            index,
            id: Some(call.id),
            name: Some(call.name),
            arguments_fragment: Some(call.arguments),
        }));
    }
    if let Some(usage) = response.usage {
        events.push(StreamEvent::Usage(usage));
    }
    events.push(StreamEvent::done(
        response.finish_reason.unwrap_or(FinishReason::Stop),
    ));

    Box::pin(stream::iter(events.into_iter().map(Ok)))
}
