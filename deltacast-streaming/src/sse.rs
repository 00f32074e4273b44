//! Server-Sent Events frame reader.
//!
//! Splits an open byte-oriented connection into discrete textual frames at
//! the wire framing boundary: blocks separated by a blank line, each block
//! carrying one or more `data:` lines and an optional `event:` discriminator
//! line. No interpretation of payload contents happens here.

use bytes::Bytes;
use deltacast_core::ClientError;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// One discrete frame from the transport framing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Optional type discriminator from an `event:` line.
    pub event: Option<String>,
    /// Payload from the `data:` line(s), joined with newlines.
    pub data: String,
}

impl SseFrame {
    /// Create a frame with just a data payload.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }
}

/// Incremental push parser for SSE framing.
///
/// Buffers raw bytes and decodes only at frame boundaries, so a multi-byte
/// UTF-8 character split across transport chunks survives reassembly.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    frames: VecDeque<SseFrame>,
}

impl SseParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of transport bytes into the parser.
    pub fn feed(&mut self, bytes: &Bytes) -> Result<(), ClientError> {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(ClientError::protocol("SSE buffer limit exceeded"));
        }
        self.split_frames();
        Ok(())
    }

    /// Feed a string chunk into the parser.
    pub fn feed_str(&mut self, chunk: &str) -> Result<(), ClientError> {
        self.feed(&Bytes::copy_from_slice(chunk.as_bytes()))
    }

    /// Flush any trailing unterminated frame at end of transport.
    pub fn finish(&mut self) {
        self.split_frames();
        let trailing = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&trailing);
        if !text.trim().is_empty() {
            if let Some(frame) = parse_frame(text.trim_end_matches(['\n', '\r'])) {
                self.frames.push_back(frame);
            }
        }
    }

    /// Pop the next complete frame, if one is available.
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        self.frames.pop_front()
    }

    fn split_frames(&mut self) {
        while let Some((pos, delim_len)) = self.find_boundary() {
            let block: Vec<u8> = self.buffer.drain(..pos + delim_len).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&block)) {
                self.frames.push_back(frame);
            }
        }
    }

    fn find_boundary(&self) -> Option<(usize, usize)> {
        let lf = find_subsequence(&self.buffer, b"\n\n").map(|pos| (pos, 2));
        let crlf = find_subsequence(&self.buffer, b"\r\n\r\n").map(|pos| (pos, 4));
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_frame(block: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim_start().to_string());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

pin_project! {
    /// Pull adapter: reads frames on demand from an open byte stream.
    ///
    /// Blocks the calling step (via `Poll::Pending`) until a full frame is
    /// available, the connection ends, or a read error occurs. The byte
    /// stream is the single transport resource; dropping this adapter drops
    /// it exactly once.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        parser: SseParser,
        finished: bool,
    }
}

impl<S> SseStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>>,
{
    /// Wrap an open transport byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            finished: false,
        }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
{
    type Item = Result<SseFrame, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(frame) = this.parser.next_frame() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(err) = this.parser.feed(&bytes) {
                        *this.finished = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.parser.finish();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_basic_frame() {
        let mut parser = SseParser::new();
        parser.feed_str("data: hello\n\n").unwrap();
        let frame = parser.next_frame().unwrap();
        assert_eq!(frame.data, "hello");
        assert!(frame.event.is_none());
    }

    #[test]
    fn test_event_discriminator() {
        let mut parser = SseParser::new();
        parser
            .feed_str("event: message_start\ndata: {}\n\n")
            .unwrap();
        let frame = parser.next_frame().unwrap();
        assert_eq!(frame.event.as_deref(), Some("message_start"));
        assert_eq!(frame.data, "{}");
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut parser = SseParser::new();
        parser.feed_str("data: line1\ndata: line2\n\n").unwrap();
        assert_eq!(parser.next_frame().unwrap().data, "line1\nline2");
    }

    #[test]
    fn test_partial_feed_across_chunks() {
        let mut parser = SseParser::new();
        parser.feed_str("data: hel").unwrap();
        assert!(parser.next_frame().is_none());
        parser.feed_str("lo\n\n").unwrap();
        assert_eq!(parser.next_frame().unwrap().data, "hello");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte é sequence.
        let split = 8;
        assert!(std::str::from_utf8(&bytes[..split]).is_err());

        let mut parser = SseParser::new();
        parser.feed(&Bytes::copy_from_slice(&bytes[..split])).unwrap();
        assert!(parser.next_frame().is_none());
        parser.feed(&Bytes::copy_from_slice(&bytes[split..])).unwrap();
        assert_eq!(parser.next_frame().unwrap().data, "héllo");
    }

    #[test]
    fn test_crlf_boundaries() {
        let mut parser = SseParser::new();
        parser.feed_str("data: a\r\n\r\ndata: b\r\n\r\n").unwrap();
        assert_eq!(parser.next_frame().unwrap().data, "a");
        assert_eq!(parser.next_frame().unwrap().data, "b");
    }

    #[test]
    fn test_comments_ignored() {
        let mut parser = SseParser::new();
        parser.feed_str(": keepalive\ndata: x\n\n").unwrap();
        assert_eq!(parser.next_frame().unwrap().data, "x");
    }

    #[test]
    fn test_finish_flushes_trailing_frame() {
        let mut parser = SseParser::new();
        parser.feed_str("data: tail").unwrap();
        assert!(parser.next_frame().is_none());
        parser.finish();
        assert_eq!(parser.next_frame().unwrap().data, "tail");
    }

    #[tokio::test]
    async fn test_stream_adapter_reads_on_demand() {
        let chunks = vec![
            Ok(Bytes::from("data: one\n\nda")),
            Ok(Bytes::from("ta: two\n\n")),
        ];
        let mut frames = SseStream::new(stream::iter(chunks));

        assert_eq!(frames.next().await.unwrap().unwrap().data, "one");
        assert_eq!(frames.next().await.unwrap().unwrap().data, "two");
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_adapter_propagates_read_error() {
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from("data: ok\n\n")),
            Err(ClientError::transport("connection reset")),
        ];
        let mut frames = SseStream::new(stream::iter(chunks));

        assert!(frames.next().await.unwrap().is_ok());
        let err = frames.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(frames.next().await.is_none());
    }
}
