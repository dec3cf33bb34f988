//! Line-buffered relay from the upstream event stream to plain text chunks
//!
//! Upstream reads may split a line anywhere (including inside a UTF-8
//! sequence) or carry several lines at once. [`CompletionStream`] appends every
//! read to one byte buffer, takes complete lines off the front and decodes
//! them one at a time. A trailing partial line waits for the next read.

use bytes::Bytes;
use futures::stream::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::event::{SseEvent, extract_fragment, parse_sse_line};

/// Stream of generated text fragments decoded from an upstream event stream
pub struct CompletionStream<S> {
    inner: S,
    buffer: Vec<u8>,
    upstream_ended: bool,
    finished: bool,
    fragments: usize,
}

/// What a single buffered line turned into
enum LineOutcome {
    Fragment(String),
    Done,
    Skip,
}

impl<S> CompletionStream<S> {
    /// Wrap an upstream byte stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            upstream_ended: false,
            finished: false,
            fragments: 0,
        }
    }

    /// Remove the next complete line from the buffer, without its terminator
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn decode_line(line: &[u8]) -> LineOutcome {
        let Ok(line) = std::str::from_utf8(line) else {
            tracing::warn!(line_len = line.len(), "Skipping event line with invalid UTF-8");
            return LineOutcome::Skip;
        };

        match parse_sse_line(line) {
            Some(SseEvent::Done) => LineOutcome::Done,
            Some(SseEvent::Data(payload)) => match extract_fragment(&payload) {
                Some(fragment) => LineOutcome::Fragment(fragment),
                None => LineOutcome::Skip,
            },
            None => LineOutcome::Skip,
        }
    }
}

impl<S, E> Stream for CompletionStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            while let Some(line) = this.next_line() {
                match Self::decode_line(&line) {
                    LineOutcome::Fragment(fragment) => {
                        this.fragments += 1;
                        return Poll::Ready(Some(Ok(Bytes::from(fragment))));
                    }
                    LineOutcome::Done => {
                        tracing::debug!(fragments = this.fragments, "Completion stream done");
                        this.finished = true;
                        return Poll::Ready(None);
                    }
                    LineOutcome::Skip => {}
                }
            }

            if this.upstream_ended {
                tracing::warn!(
                    fragments = this.fragments,
                    "Upstream closed the stream without [DONE]"
                );
                this.finished = true;
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!(error_message = %e, "Upstream stream failed");
                    this.finished = true;
                    return Poll::Ready(Some(Err(io::Error::other(e))));
                }
                Poll::Ready(None) => {
                    // Terminate a trailing partial line so it is decoded too.
                    if !this.buffer.is_empty() {
                        this.buffer.push(b'\n');
                    }
                    this.upstream_ended = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
