//! Error types for Brief

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use thiserror::Error;

/// Main error type for Brief operations
#[derive(Error, Debug)]
pub enum BriefError {
    /// Configuration errors (missing API key, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The incoming request was missing or carried an invalid parameter
    #[error("Request error: {0}")]
    Request(String),

    /// Fetching the article page failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The article page has no content region
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The completion service answered with a non-success status
    #[error("Upstream error: {} {message}", .status.as_u16())]
    Upstream { status: StatusCode, message: String },

    /// Network-level error talking to the completion service
    #[error("Network error: {0}")]
    Network(String),

    /// Server lifecycle errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BriefError {
    /// Short label used as a structured log field
    pub fn category(&self) -> &'static str {
        match self {
            BriefError::Config(_) => "config",
            BriefError::Request(_) => "request",
            BriefError::Fetch(_) => "fetch",
            BriefError::Extraction(_) => "extraction",
            BriefError::Upstream { .. } => "upstream",
            BriefError::Network(_) => "network",
            BriefError::Server(_) => "server",
            BriefError::Io(_) => "io",
            BriefError::Serialization(_) => "serialization",
        }
    }
}

impl IntoResponse for BriefError {
    /// Every request-level failure is reported the same way: a 500 with the
    /// error description as a plain-text body.
    fn into_response(self) -> Response<Body> {
        tracing::error!(
            error_type = self.category(),
            error_message = %self,
            "Summarize request failed"
        );

        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Result type alias for Brief operations
pub type Result<T> = std::result::Result<T, BriefError>;
