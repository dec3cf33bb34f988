//! HTTP client for the streaming text-completion service

use bytes::Bytes;
use futures::stream::Stream;
use reqwest::Client;
use serde::Serialize;
use std::pin::Pin;

use crate::config::CompletionConfig;
use crate::error::{BriefError, Result};

use super::stream::CompletionStream;

/// Boxed upstream response body
pub type UpstreamBody = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Text-completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    pub stream: bool,
    pub n: u32,
}

impl CompletionRequest {
    /// Streaming request with the fixed summarization parameters
    pub fn summary(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.5,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: 200,
            stream: true,
            n: 1,
        }
    }
}

/// Client that opens streaming completions against an OpenAI-compatible API
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl CompletionClient {
    /// Create a client for the configured completions endpoint.
    ///
    /// `api_key` is the value already read from the environment at startup.
    pub fn new(client: Client, config: &CompletionConfig, api_key: String) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
        }
    }

    /// Open a streaming completion and return its decoded text fragments.
    ///
    /// A non-success status is returned as [`BriefError::Upstream`] carrying
    /// the status text; no stream is produced in that case.
    pub async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream<UpstreamBody>> {
        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Opening completion stream at {}",
            self.api_url
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BriefError::Network(format!("Request timed out: {e}"))
                } else if e.is_connect() {
                    BriefError::Network(format!("Failed to connect to completion service: {e}"))
                } else {
                    BriefError::Network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                "Completion service rejected request"
            );
            return Err(BriefError::Upstream { status, message });
        }

        let body: UpstreamBody = Box::pin(response.bytes_stream());
        Ok(CompletionStream::new(body))
    }
}
