//! Deadline enforcement for both call paths.
//!
//! The one-shot path races the wrapped call against the deadline. The
//! streaming path arms a deadline that spans the entire stream lifetime, not
//! just the opening handshake: the returned stream keeps a timer and yields a
//! deadline error mid-stream if consumption outlives it.

use crate::chain::{
    Interceptor, StreamInterceptor, StreamNext, UnaryInterceptor, UnaryNext,
};
use async_trait::async_trait;
use deltacast_core::{ChatRequest, ChatResponse, ClientError};
use deltacast_streaming::{EventStream, StreamContext, StreamEvent};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::time::Sleep;

/// Enforces a per-call timeout on both paths.
#[derive(Debug, Clone)]
pub struct TimeoutInterceptor {
    timeout: Duration,
}

impl TimeoutInterceptor {
    /// A timeout interceptor with the given budget per call.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Package as a chain entry wrapping both paths.
    #[must_use]
    pub fn into_entry(self) -> Interceptor {
        let shared = Arc::new(self);
        Interceptor::new("timeout")
            .with_unary(shared.clone())
            .with_stream(shared)
    }

    fn arm(&self, ctx: &StreamContext) -> (StreamContext, Instant) {
        let child = ctx.child_with_timeout(self.timeout);
        let deadline = child
            .deadline()
            .unwrap_or_else(|| Instant::now() + self.timeout);
        (child, deadline)
    }
}

#[async_trait]
impl UnaryInterceptor for TimeoutInterceptor {
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: UnaryNext<'_>,
    ) -> Result<ChatResponse, ClientError> {
        let (child, deadline) = self.arm(&ctx);
        tokio::select! {
            result = next.run(request, child.clone()) => result,
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                // Signal cooperative shutdown to anything still holding the
                // child context before reporting expiry.
                child.cancellation().cancel();
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "call deadline exceeded");
                Err(ClientError::DeadlineExceeded)
            }
        }
    }
}

#[async_trait]
impl StreamInterceptor for TimeoutInterceptor {
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: StreamNext<'_>,
    ) -> Result<EventStream, ClientError> {
        let (child, deadline) = self.arm(&ctx);
        let opening = tokio::select! {
            result = next.run(request, child.clone()) => result,
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                child.cancellation().cancel();
                Err(ClientError::DeadlineExceeded)
            }
        };
        let inner = opening?;
        Ok(Box::pin(DeadlineStream {
            inner,
            sleep: Some(Box::pin(tokio::time::sleep_until(
                tokio::time::Instant::from_std(deadline),
            ))),
            ctx: child,
            finished: false,
        }))
    }
}

/// Stream adapter enforcing a whole-lifetime deadline.
///
/// The timer is released as soon as the inner stream reaches any terminal
/// condition so a finished stream holds no timer resources.
struct DeadlineStream {
    inner: EventStream,
    sleep: Option<Pin<Box<Sleep>>>,
    ctx: StreamContext,
    finished: bool,
}

impl Stream for DeadlineStream {
    type Item = Result<StreamEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if let Some(sleep) = this.sleep.as_mut() {
            if sleep.as_mut().poll(cx).is_ready() {
                this.finished = true;
                this.sleep = None;
                this.ctx.cancellation().cancel();
                tracing::warn!("stream deadline exceeded mid-consumption");
                return Poll::Ready(Some(Err(ClientError::DeadlineExceeded)));
            }
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                if event.is_terminal() {
                    this.finished = true;
                    this.sleep = None;
                }
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finished = true;
                this.sleep = None;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                this.sleep = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InterceptorChain, StreamHandler, UnaryHandler};
    use deltacast_core::FinishReason;
    use futures::{stream, StreamExt};

    struct SlowHandler {
        delay: Duration,
    }

    #[async_trait]
    impl UnaryHandler for SlowHandler {
        async fn call(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<ChatResponse, ClientError> {
            tokio::time::sleep(self.delay).await;
            Ok(ChatResponse::text("late"))
        }
    }

    /// Yields one content event immediately, then stalls forever.
    struct StallingStreamHandler;

    #[async_trait]
    impl StreamHandler for StallingStreamHandler {
        async fn open(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<EventStream, ClientError> {
            let head = stream::once(async { Ok::<_, ClientError>(StreamEvent::content("first")) });
            let stall = stream::once(async {
                futures::future::pending::<()>().await;
                Ok::<_, ClientError>(StreamEvent::done(FinishReason::Stop))
            });
            Ok(Box::pin(head.chain(stall)))
        }
    }

    struct FastStreamHandler;

    #[async_trait]
    impl StreamHandler for FastStreamHandler {
        async fn open(
            &self,
            _request: ChatRequest,
            _ctx: StreamContext,
        ) -> Result<EventStream, ClientError> {
            let events: Vec<Result<StreamEvent, ClientError>> = vec![
                Ok(StreamEvent::content("quick")),
                Ok(StreamEvent::done(FinishReason::Stop)),
            ];
            Ok(Box::pin(stream::iter(events)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_unary_call_times_out() {
        let chain = InterceptorChain::new()
            .with(TimeoutInterceptor::new(Duration::from_millis(20)).into_entry());
        let handler = SlowHandler {
            delay: Duration::from_millis(200),
        };

        let result = chain
            .execute_unary(ChatRequest::new("m"), StreamContext::new(), &handler)
            .await;
        assert!(matches!(result, Err(ClientError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_unary_call_passes() {
        let chain = InterceptorChain::new()
            .with(TimeoutInterceptor::new(Duration::from_millis(200)).into_entry());
        let handler = SlowHandler {
            delay: Duration::from_millis(20),
        };

        let response = chain
            .execute_unary(ChatRequest::new("m"), StreamContext::new(), &handler)
            .await
            .unwrap();
        assert_eq!(response.content, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_spans_stream_consumption() {
        let chain = InterceptorChain::new()
            .with(TimeoutInterceptor::new(Duration::from_millis(50)).into_entry());

        let mut stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &StallingStreamHandler)
            .await
            .unwrap();

        // Opening and the first event fit within the budget.
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, StreamEvent::content("first"));

        // The second never arrives; the lifetime deadline fires instead.
        let second = stream.next().await.unwrap();
        assert!(matches!(second.unwrap_err(), ClientError::DeadlineExceeded));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_stream_unaffected_by_deadline() {
        let chain = InterceptorChain::new()
            .with(TimeoutInterceptor::new(Duration::from_secs(5)).into_entry());

        let stream = chain
            .execute_stream(ChatRequest::new("m"), StreamContext::new(), &FastStreamHandler)
            .await
            .unwrap();
        let events: Vec<_> = stream.map(Result::unwrap).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::content("quick"),
                StreamEvent::done(FinishReason::Stop),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_caller_deadline_governs() {
        // The surrounding context carries a 10ms budget; the interceptor's
        // own 60s budget must not extend it.
        let chain = InterceptorChain::new()
            .with(TimeoutInterceptor::new(Duration::from_secs(60)).into_entry());
        let handler = SlowHandler {
            delay: Duration::from_secs(1),
        };

        let ctx = StreamContext::with_timeout(Duration::from_millis(10));
        let result = chain
            .execute_unary(ChatRequest::new("m"), ctx, &handler)
            .await;
        assert!(matches!(result, Err(ClientError::DeadlineExceeded)));
    }
}
