//! Event-stream line decoding
//!
//! The completion service sends one event per line:
//!
//! ```text
//! data: {"id":"cmpl-1","choices":[{"text":"Hel","index":0}]}
//!
//! data: {"id":"cmpl-1","choices":[{"text":"lo","index":0}]}
//!
//! data: [DONE]
//! ```

use serde::Deserialize;

/// Sentinel payload that ends the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded event-stream line
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Data event containing the JSON payload
    Data(String),
    /// Terminal [DONE] marker
    Done,
}

/// Decode a single line of the event stream.
///
/// Only `data:` lines produce events. Blank lines, comments and the other
/// event-stream fields (`event:`, `id:`, `retry:`) yield `None`.
pub fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.trim() == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}

/// One streamed chunk of a text completion
#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A choice inside a streamed chunk
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub text: Option<String>,
}

impl CompletionChunk {
    /// Text of the first choice, if present and non-empty
    pub fn into_first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.text)
            .filter(|text| !text.is_empty())
    }
}

/// Pull the generated text out of a data payload.
///
/// Payloads that fail to decode or carry no text are skipped with a log
/// line; they never end the stream.
pub fn extract_fragment(payload: &str) -> Option<String> {
    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => {
            let fragment = chunk.into_first_text();
            if fragment.is_none() {
                tracing::debug!("Skipping event without completion text");
            }
            fragment
        }
        Err(e) => {
            tracing::warn!(
                error_message = %e,
                payload_len = payload.len(),
                "Skipping malformed completion event"
            );
            None
        }
    }
}
