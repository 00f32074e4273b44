//! The interceptor chain.
//!
//! A chain is an ordered list of entries wrapping the two call paths of a
//! model client: the one-shot path producing a finished
//! [`ChatResponse`] and the streaming path producing an open
//! [`EventStream`]. Each entry may wrap either path, both, or neither;
//! invocation skips entries with no wrapper for the active path. The first
//! configured entry is the outermost wrapper.
//!
//! An entry receives a [`UnaryNext`] or [`StreamNext`] continuation and may
//! call it zero, one, or several times, which is what allows a retry entry
//! to re-invoke everything beneath it.

use async_trait::async_trait;
use deltacast_core::{ChatRequest, ChatResponse, ClientError};
use deltacast_streaming::{EventStream, StreamContext};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Innermost target of the one-shot path, typically the provider call itself.
#[async_trait]
pub trait UnaryHandler: Send + Sync {
    /// Execute the request and return the finished response.
    async fn call(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
    ) -> Result<ChatResponse, ClientError>;
}

/// Innermost target of the streaming path.
///
/// Opening succeeds or fails up front; errors after the stream is open
/// travel inside the stream itself.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Open the stream for the request.
    async fn open(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
    ) -> Result<EventStream, ClientError>;
}

/// A wrapper around the one-shot path.
#[async_trait]
pub trait UnaryInterceptor: Send + Sync {
    /// Wrap the call. Delegate downward by invoking `next`.
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: UnaryNext<'_>,
    ) -> Result<ChatResponse, ClientError>;
}

/// A wrapper around the streaming path.
#[async_trait]
pub trait StreamInterceptor: Send + Sync {
    /// Wrap the stream opening. Delegate downward by invoking `next`.
    async fn intercept(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        next: StreamNext<'_>,
    ) -> Result<EventStream, ClientError>;
}

/// One chain entry: a name plus optional wrappers for each path.
#[derive(Clone)]
pub struct Interceptor {
    name: String,
    unary: Option<Arc<dyn UnaryInterceptor>>,
    stream: Option<Arc<dyn StreamInterceptor>>,
}

impl Interceptor {
    /// An entry that wraps neither path until a wrapper is attached.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unary: None,
            stream: None,
        }
    }

    /// Attach a one-shot wrapper.
    #[must_use]
    pub fn with_unary(mut self, wrapper: Arc<dyn UnaryInterceptor>) -> Self {
        self.unary = Some(wrapper);
        self
    }

    /// Attach a streaming wrapper.
    #[must_use]
    pub fn with_stream(mut self, wrapper: Arc<dyn StreamInterceptor>) -> Self {
        self.stream = Some(wrapper);
        self
    }

    /// The entry's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .field("unary", &self.unary.is_some())
            .field("stream", &self.stream.is_some())
            .finish()
    }
}

/// Continuation handed to a [`UnaryInterceptor`].
///
/// `Copy` so an entry can invoke the remainder of the chain more than once.
#[derive(Clone, Copy)]
pub struct UnaryNext<'a> {
    entries: &'a [Interceptor],
    handler: &'a dyn UnaryHandler,
}

impl<'a> UnaryNext<'a> {
    /// Run the remaining entries and, at the end, the handler.
    pub fn run(
        self,
        request: ChatRequest,
        ctx: StreamContext,
    ) -> BoxFuture<'a, Result<ChatResponse, ClientError>> {
        Box::pin(async move {
            let mut rest = self.entries;
            while let Some((head, tail)) = rest.split_first() {
                rest = tail;
                if let Some(wrapper) = head.unary.as_deref() {
                    tracing::trace!(entry = head.name(), "entering unary interceptor");
                    let next = UnaryNext {
                        entries: rest,
                        handler: self.handler,
                    };
                    return wrapper.intercept(request, ctx, next).await;
                }
            }
            self.handler.call(request, ctx).await
        })
    }
}

/// Continuation handed to a [`StreamInterceptor`].
#[derive(Clone, Copy)]
pub struct StreamNext<'a> {
    entries: &'a [Interceptor],
    handler: &'a dyn StreamHandler,
}

impl<'a> StreamNext<'a> {
    /// Run the remaining entries and, at the end, the handler.
    pub fn run(
        self,
        request: ChatRequest,
        ctx: StreamContext,
    ) -> BoxFuture<'a, Result<EventStream, ClientError>> {
        Box::pin(async move {
            let mut rest = self.entries;
            while let Some((head, tail)) = rest.split_first() {
                rest = tail;
                if let Some(wrapper) = head.stream.as_deref() {
                    tracing::trace!(entry = head.name(), "entering stream interceptor");
                    let next = StreamNext {
                        entries: rest,
                        handler: self.handler,
                    };
                    return wrapper.intercept(request, ctx, next).await;
                }
            }
            self.handler.open(request, ctx).await
        })
    }
}

/// An ordered interceptor chain.
///
/// Entries run in configuration order, first entry outermost. The empty
/// chain is valid and invokes the handler directly.
#[derive(Debug, Clone, Default)]
pub struct InterceptorChain {
    entries: Vec<Interceptor>,
}

impl InterceptorChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, which becomes the innermost wrapper so far.
    #[must_use]
    pub fn with(mut self, entry: Interceptor) -> Self {
        self.entries.push(entry);
        self
    }

    /// Append an entry in place.
    pub fn push(&mut self, entry: Interceptor) {
        self.entries.push(entry);
    }

    /// The configured entries in order.
    #[must_use]
    pub fn entries(&self) -> &[Interceptor] {
        &self.entries
    }

    /// Execute the one-shot path through the chain.
    pub async fn execute_unary(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        handler: &dyn UnaryHandler,
    ) -> Result<ChatResponse, ClientError> {
        UnaryNext {
            entries: &self.entries,
            handler,
        }
        .run(request, ctx)
        .await
    }

    /// Execute the streaming path through the chain.
    pub async fn execute_stream(
        &self,
        request: ChatRequest,
        ctx: StreamContext,
        handler: &dyn StreamHandler,
    ) -> Result<EventStream, ClientError> {
        StreamNext {
            entries: &self.entries,
            handler,
        }
        .run(request, ctx)
        .await
    }
}
