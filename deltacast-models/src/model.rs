//! The model trait and streaming capability tag.

use async_trait::async_trait;
use deltacast_core::{ChatRequest, ChatResponse, ClientError};
use deltacast_streaming::{stream_from_response, EventStream, StreamContext};
use std::sync::Arc;

/// Whether a model delivers events incrementally or only as one-shot results.
///
/// Resolved once at construction, never re-checked per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSupport {
    /// The provider streams incremental wire deltas.
    Native,
    /// One-shot only; streaming requests are simulated by wrapping the
    /// complete response with [`stream_from_response`].
    Simulated,
}

/// A chat-completion model.
///
/// Both call paths take the request plus an explicit [`StreamContext`]
/// carrying the caller's deadline and cancellation handle.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier.
    fn name(&self) -> &str;

    /// Streaming capability, fixed at construction.
    fn stream_support(&self) -> StreamSupport;

    /// One-shot request: wait for the full response.
    async fn request(
        &self,
        request: &ChatRequest,
        ctx: &StreamContext,
    ) -> Result<ChatResponse, ClientError>;

    /// Streaming request: open a lazy event stream.
    ///
    /// Models reporting [`StreamSupport::Native`] must override this. The
    /// default covers [`StreamSupport::Simulated`] models by draining the
    /// one-shot path and replaying the finished response as a stream.
    async fn request_stream(
        &self,
        request: &ChatRequest,
        ctx: &StreamContext,
    ) -> Result<EventStream, ClientError> {
        match self.stream_support() {
            StreamSupport::Simulated => {
                let response = self.request(request, ctx).await?;
                Ok(stream_from_response(response))
            }
            StreamSupport::Native => Err(ClientError::Configuration(format!(
                "model {} reports native streaming but does not implement request_stream",
                self.name()
            ))),
        }
    }
}

/// Boxed model for dynamic dispatch.
pub type BoxedModel = Arc<dyn ChatModel>;

#[cfg(test)]
mod tests {
    use super::*;
    use deltacast_core::FinishReason;
    use deltacast_streaming::collect_stream;

    struct OneShotOnly;

    #[async_trait]
    impl ChatModel for OneShotOnly {
        fn name(&self) -> &str {
            "one-shot-only"
        }

        fn stream_support(&self) -> StreamSupport {
            StreamSupport::Simulated
        }

        async fn request(
            &self,
            _request: &ChatRequest,
            _ctx: &StreamContext,
        ) -> Result<ChatResponse, ClientError> {
            Ok(ChatResponse::text("hello").with_finish_reason(FinishReason::Stop))
        }
    }

    #[tokio::test]
    async fn test_simulated_stream_replays_response() {
        let model = OneShotOnly;
        let request = ChatRequest::new("one-shot-only");
        let stream = model
            .request_stream(&request, &StreamContext::new())
            .await
            .unwrap();

        let collected = collect_stream(stream).await;
        assert!(collected.error.is_none());
        assert_eq!(collected.response.content, "hello");
        assert_eq!(collected.response.finish_reason, Some(FinishReason::Stop));
    }
}
