//! Completion stream relay
//!
//! Opens a streaming completion upstream and turns its event stream into a
//! plain byte stream of generated text.

mod client;
mod event;
mod stream;

pub use client::{CompletionClient, CompletionRequest, UpstreamBody};
pub use event::{CompletionChunk, DONE_SENTINEL, SseEvent, extract_fragment, parse_sse_line};
pub use stream::CompletionStream;
