//! Structured observation of both call paths.
//!
//! The logging entry records a start marker before delegating and an end
//! marker when the call resolves. On the streaming path the end marker is
//! deferred until the stream actually finishes; a stream dropped before any
//! terminal condition is recorded as abandoned, exactly once.

use crate::chain::{
    Interceptor, StreamInterceptor, StreamNext, UnaryInterceptor, UnaryNext,
};
use async_trait::async_trait;
use deltacast_core::{ChatRequest, ChatResponse, ClientError, FinishReason, TokenUsage};
use deltacast_streaming::{EventStream, StreamContext, StreamEvent};
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

const PREVIEW_LIMIT: usize = 120;

/// How much detail each record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Timing and outcome only.
    Minimal,
    /// Plus request shape, finish reason, and usage.
    Standard,
    /// Plus a truncated content preview. Previews reproduce raw model
    /// output, so avoid this tier where logs must not carry user data.
    Verbose,
}

/// One structured observation.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// A one-shot call is starting.
    RequestStart {
        /// Target model.
        model: String,
        /// Message count, at Standard verbosity and above.
        message_count: Option<usize>,
    },
    /// A one-shot call resolved.
    RequestEnd {
        /// Wall time from start to resolution.
        elapsed: Duration,
        /// Whether the call succeeded.
        ok: bool,
        /// Finish reason, on success at Standard verbosity and above.
        finish_reason: Option<FinishReason>,
        /// Usage snapshot, on success at Standard verbosity and above.
        usage: Option<TokenUsage>,
        /// Error text, on failure.
        error: Option<String>,
    },
    /// A stream is being opened.
    StreamStart {
        /// Target model.
        model: String,
        /// Message count, at Standard verbosity and above.
        message_count: Option<usize>,
    },
    /// A stream finished with a terminal event or ran dry.
    StreamEnd {
        /// Wall time from opening to the terminal condition.
        elapsed: Duration,
        /// Finish reason from the terminal event, if one arrived.
        finish_reason: Option<FinishReason>,
        /// Last usage snapshot observed in the stream.
        usage: Option<TokenUsage>,
        /// Truncated content preview, at Verbose verbosity.
        preview: Option<String>,
    },
    /// A stream terminated with an error, or failed to open.
    StreamError {
        /// Wall time from opening to the error.
        elapsed: Duration,
        /// Error text.
        message: String,
    },
    /// A stream was dropped before reaching any terminal condition.
    StreamAbandoned {
        /// Wall time from opening to the drop.
        elapsed: Duration,
    },
}

/// Destination for log records.
///
/// The default sink forwards to `tracing`; tests substitute a capturing
/// sink.
pub trait LogSink: Send + Sync {
    /// Accept one record.
    fn record(&self, record: &LogRecord);
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, record: &LogRecord) {
        match record {
            LogRecord::RequestStart { model, .. } => {
                tracing::info!(model, "request start");
            }
            LogRecord::RequestEnd {
                elapsed,
                ok,
                error,
                ..
            } => {
                if *ok {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "request end");
                } else {
                    tracing::error!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = error.as_deref().unwrap_or("unknown"),
                        "request failed"
                    );
                }
            }
            LogRecord::StreamStart { model, .. } => {
                tracing::info!(model, "stream start");
            }
            LogRecord::StreamEnd { elapsed, .. } => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "stream end");
            }
            LogRecord::StreamError { elapsed, message } => {
                tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = message.as_str(),
                    "stream error"
                );
            }
            LogRecord::StreamAbandoned { elapsed } => {
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "stream dropped before completion"
                );
            }
        }
    }
}

/// Discards all records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn record(&self, _record: &LogRecord) {}
}

/// Records both call paths without altering results.
#[derive(Clone)]
pub struct LoggingInterceptor {
    verbosity: Verbosity,
    sink: Arc<dyn LogSink>,
}

impl LoggingInterceptor {
    /// A logging interceptor emitting to `tracing`.
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_sink(verbosity, Arc::new(TracingSink))
    }

    /// A logging interceptor with a custom sink.
    #[must_use]
    pub fn with_sink(verbosity: Verbosity, sink: Arc<dyn LogSink>) -> Self {
        Self { verbosity, sink }
    }

    /// Package as a chain entry wrapping both paths.
    #[must_use]
    pub fn into_entry(self) -> Interceptor {
        let shared = Arc::new(self);
        Interceptor::new("logging")
            .with_unary(shared.clone())
            .with_stream(shared)
    }

    fn message_count(&self, request: &ChatRequest) -> Option<usize> {
        (self.verbosity >= Verbosity::Standard).then(|| request.messages.len())
    }
}

impl std::fmt::Debug for LoggingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingInterceptor")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UnaryInterceptor for LoggingInterceptor {
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: UnaryNext<'_>,
    ) -> Result<ChatResponse, ClientError> {
        self.sink.record(&LogRecord::RequestStart {
            model: request.model.clone(),
            message_count: self.message_count(&request),
        });
        let started = Instant::now();
        let result = next.run(request, ctx).await;
        let detail = self.verbosity >= Verbosity::Standard;
        match &result {
            Ok(response) => self.sink.record(&LogRecord::RequestEnd {
                elapsed: started.elapsed(),
                ok: true,
                finish_reason: detail.then(|| response.finish_reason.clone()).flatten(),
                usage: detail.then_some(response.usage).flatten(),
                error: None,
            }),
            Err(err) => self.sink.record(&LogRecord::RequestEnd {
                elapsed: started.elapsed(),
                ok: false,
                finish_reason: None,
                usage: None,
                error: Some(err.to_string()),
            }),
        }
        result
    }
}

#[async_trait]
impl StreamInterceptor for LoggingInterceptor {
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: StreamNext<'_>,
    ) -> Result<EventStream, ClientError> {
        self.sink.record(&LogRecord::StreamStart {
            model: request.model.clone(),
            message_count: self.message_count(&request),
        });
        let started = Instant::now();
        match next.run(request, ctx).await {
            Ok(inner) => Ok(Box::pin(LoggedStream {
                inner,
                sink: Arc::clone(&self.sink),
                verbosity: self.verbosity,
                started,
                finish_reason: None,
                usage: None,
                preview: String::new(),
                completed: false,
            })),
            Err(err) => {
                self.sink.record(&LogRecord::StreamError {
                    elapsed: started.elapsed(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Stream adapter that records the stream's outcome exactly once.
///
/// Completion is observed at a terminal event, a terminal error, or the
/// stream running dry. Dropping before any of those records abandonment
/// instead; the `completed` flag guarantees the two never both fire.
struct LoggedStream {
    inner: EventStream,
    sink: Arc<dyn LogSink>,
    verbosity: Verbosity,
    started: Instant,
    finish_reason: Option<FinishReason>,
    usage: Option<TokenUsage>,
    preview: String,
    completed: bool,
}

impl LoggedStream {
    fn record_end(&mut self) {
        self.completed = true;
        // Same tiering as the unary path: detail starts at Standard.
        let detail = self.verbosity >= Verbosity::Standard;
        self.sink.record(&LogRecord::StreamEnd {
            elapsed: self.started.elapsed(),
            finish_reason: detail.then(|| self.finish_reason.take()).flatten(),
            usage: detail.then(|| self.usage.take()).flatten(),
            preview: (self.verbosity >= Verbosity::Verbose)
                .then(|| std::mem::take(&mut self.preview)),
        });
    }
}

impl Stream for LoggedStream {
    type Item = Result<StreamEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                match &event {
                    StreamEvent::Content { text } if this.verbosity >= Verbosity::Verbose => {
                        for ch in text.chars() {
                            if this.preview.len() + ch.len_utf8() > PREVIEW_LIMIT {
                                break;
                            }
                            this.preview.push(ch);
                        }
                    }
                    StreamEvent::Usage(usage) => this.usage = Some(*usage),
                    StreamEvent::Done { finish_reason } => {
                        this.finish_reason = Some(finish_reason.clone());
                    }
                    _ => {}
                }
                if event.is_terminal() && !this.completed {
                    this.record_end();
                }
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(err))) => {
                if !this.completed {
                    this.completed = true;
                    this.sink.record(&LogRecord::StreamError {
                        elapsed: this.started.elapsed(),
                        message: err.to_string(),
                    });
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                // Running dry without a terminal event still counts as
                // completion, not abandonment.
                if !this.completed {
                    this.record_end();
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for LoggedStream {
    fn drop(&mut self) {
        if !self.completed {
            self.completed = true;
            self.sink.record(&LogRecord::StreamAbandoned {
                elapsed: self.started.elapsed(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InterceptorChain, StreamHandler, UnaryHandler};
    use deltacast_streaming::stream_from_response;
    use futures::{stream, StreamExt};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        records: Mutex<Vec<LogRecord>>,
    }

    impl LogSink for CaptureSink {
        fn record(&self, record: &LogRecord) {
            self.records.lock().push(record.clone());
        }
    }

    struct OkHandler;

    #[async_trait]
    impl UnaryHandler for OkHandler {
        async fn call(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<ChatResponse, ClientError> {
            Ok(ChatResponse::text("fine")
                .with_finish_reason(FinishReason::Stop)
                .with_usage(TokenUsage::new(10, 2)))
        }
    }

    #[async_trait]
    impl StreamHandler for OkHandler {
        async fn open(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<EventStream, ClientError> {
            Ok(stream_from_response(
                ChatResponse::text("streamed text")
                    .with_finish_reason(FinishReason::Stop)
                    .with_usage(TokenUsage::new(5, 3)),
            ))
        }
    }

    struct FailingOpen;

    #[async_trait]
    impl StreamHandler for FailingOpen {
        async fn open(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<EventStream, ClientError> {
            Err(ClientError::provider("overloaded"))
        }
    }

    fn chain_with(sink: &Arc<CaptureSink>, verbosity: Verbosity) -> InterceptorChain {
        InterceptorChain::new().with(
            LoggingInterceptor::with_sink(verbosity, Arc::clone(sink) as Arc<dyn LogSink>)
                .into_entry(),
        )
    }

    #[tokio::test]
    async fn test_unary_records_start_and_end() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Standard);

        chain
            .execute_unary(
                ChatRequest::new("m").with_message(deltacast_core::Message::user("hi")),
                StreamContext::new(),
                &OkHandler,
            )
            .await
            .unwrap();

        let records = sink.records.lock();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            LogRecord::RequestStart {
                model: "m".into(),
                message_count: Some(1),
            }
        );
        match &records[1] {
            LogRecord::RequestEnd {
                ok,
                finish_reason,
                usage,
                ..
            } => {
                assert!(*ok);
                assert_eq!(*finish_reason, Some(FinishReason::Stop));
                assert_eq!(*usage, Some(TokenUsage::new(10, 2)));
            }
            other => panic!("expected RequestEnd, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_minimal_verbosity_omits_detail() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Minimal);

        chain
            .execute_unary(ChatRequest::new("m"), StreamContext::new(), &OkHandler)
            .await
            .unwrap();

        let records = sink.records.lock();
        assert_eq!(
            records[0],
            LogRecord::RequestStart {
                model: "m".into(),
                message_count: None,
            }
        );
        assert!(matches!(
            records[1],
            LogRecord::RequestEnd {
                finish_reason: None,
                usage: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stream_end_recorded_once_with_outcome() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Verbose);

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &OkHandler)
            .await
            .unwrap();
        let _events: Vec<_> = stream.collect().await;

        let records = sink.records.lock();
        assert_eq!(records.len(), 2);
        match &records[1] {
            LogRecord::StreamEnd {
                finish_reason,
                usage,
                preview,
                ..
            } => {
                assert_eq!(*finish_reason, Some(FinishReason::Stop));
                assert_eq!(*usage, Some(TokenUsage::new(5, 3)));
                assert_eq!(preview.as_deref(), Some("streamed text"));
            }
            other => panic!("expected StreamEnd, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_minimal_verbosity_stream_end_omits_detail() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Minimal);

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &OkHandler)
            .await
            .unwrap();
        let _events: Vec<_> = stream.collect().await;

        let records = sink.records.lock();
        assert!(matches!(
            records[1],
            LogRecord::StreamEnd {
                finish_reason: None,
                usage: None,
                preview: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_abandonment_recorded_exactly_once() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Standard);

        let mut stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &OkHandler)
            .await
            .unwrap();
        // Consume one event, then walk away.
        let _ = stream.next().await;
        drop(stream);

        let records = sink.records.lock();
        let abandoned: Vec<_> = records
            .iter()
            .filter(|r| matches!(r, LogRecord::StreamAbandoned { .. }))
            .collect();
        assert_eq!(abandoned.len(), 1);
        assert!(!records
            .iter()
            .any(|r| matches!(r, LogRecord::StreamEnd { .. })));
    }

    #[tokio::test]
    async fn test_completed_stream_is_not_abandoned() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Standard);

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &OkHandler)
            .await
            .unwrap();
        let _events: Vec<_> = stream.collect().await;
        // The adapter is dropped here, after completion.

        let records = sink.records.lock();
        assert!(!records
            .iter()
            .any(|r| matches!(r, LogRecord::StreamAbandoned { .. })));
    }

    #[tokio::test]
    async fn test_open_failure_records_stream_error() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Standard);

        let err = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &FailingOpen)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ClientError::Provider { .. }));

        let records = sink.records.lock();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1], LogRecord::StreamError { .. }));
    }

    #[tokio::test]
    async fn test_mid_stream_error_records_stream_error() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Standard);

        struct ErrorMidway;

        #[async_trait]
        impl StreamHandler for ErrorMidway {
            async fn open(
                &self,
                _request: ChatRequest,
                _ctx: StreamContext,
            ) -> Result<EventStream, ClientError> {
                let items: Vec<Result<StreamEvent, ClientError>> = vec![
                    Ok(StreamEvent::content("partial")),
                    Err(ClientError::transport("connection reset")),
                ];
                Ok(Box::pin(stream::iter(items)))
            }
        }

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &ErrorMidway)
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);

        let records = sink.records.lock();
        let errors: Vec<_> = records
            .iter()
            .filter(|r| matches!(r, LogRecord::StreamError { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(!records
            .iter()
            .any(|r| matches!(r, LogRecord::StreamAbandoned { .. })));
    }

    #[tokio::test]
    async fn test_preview_is_truncated() {
        let sink = Arc::new(CaptureSink::default());
        let chain = chain_with(&sink, Verbosity::Verbose);

        struct LongContent;

        #[async_trait]
        impl StreamHandler for LongContent {
            async fn open(
                &self,
                _request: ChatRequest,
                _ctx: StreamContext,
            ) -> Result<EventStream, ClientError> {
                Ok(stream_from_response(
                    ChatResponse::text("x".repeat(500)).with_finish_reason(FinishReason::Stop),
                ))
            }
        }

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &LongContent)
            .await
            .unwrap();
        let _events: Vec<_> = stream.collect().await;

        let records = sink.records.lock();
        match &records[1] {
            LogRecord::StreamEnd { preview, .. } => {
                assert_eq!(preview.as_ref().map(String::len), Some(PREVIEW_LIMIT));
            }
            other => panic!("expected StreamEnd, got {other:?}"),
        }
    }
}
