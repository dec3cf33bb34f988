//! HTTP server exposing the summarize endpoint
//!
//! `GET /api/summarize?url=<article-url>` fetches the article, extracts its
//! text and streams the completion back as the response body. Every failure
//! before the stream starts becomes a plain-text 500.

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{BriefError, Result};
use crate::extract::extract_article_text;
use crate::fetch::{ArticleUrl, fetch_html};
use crate::prompt::build_summary_prompt;
use crate::relay::{CompletionClient, CompletionRequest};

/// Cache policy for successful summaries
pub const SUMMARY_CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=60";

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Config,
    /// HTTP client for article fetches
    pub client: reqwest::Client,
    /// Completion service client
    pub completion: CompletionClient,
}

impl AppState {
    /// Build the state. Article fetches get a total deadline; the completion
    /// client only bounds connecting and the gap between reads, so a long
    /// stream is never cut off mid-summary.
    pub fn new(config: Config, api_key: String) -> Result<Self> {
        let timeout = Duration::from_secs(config.server.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BriefError::Server(format!("Failed to create HTTP client: {e}")))?;

        let completion_http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| BriefError::Server(format!("Failed to create HTTP client: {e}")))?;

        let completion = CompletionClient::new(completion_http, &config.completion, api_key);

        Ok(Self {
            config,
            client,
            completion,
        })
    }
}

/// The summarizer HTTP server
pub struct BriefServer {
    state: Arc<AppState>,
}

impl BriefServer {
    /// Create a server from configuration and the API key read at startup
    pub fn new(config: Config, api_key: String) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config, api_key)?),
        })
    }

    /// Start the server and listen for requests until a shutdown signal
    pub async fn serve(&self) -> Result<()> {
        let config = &self.state.config;
        let addr: SocketAddr = config
            .server
            .listen_addr
            .parse()
            .map_err(|e| BriefError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Completion endpoint: {}", config.completion.api_url);
        tracing::info!("Completion model: {}", config.completion.model);
        if config.server.allowed_hosts.is_empty() {
            tracing::info!("Host allowlist: disabled (all hosts allowed)");
        } else {
            tracing::info!("Host allowlist: {}", config.server.allowed_hosts.join(", "));
        }

        let app = create_router(Arc::clone(&self.state));

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BriefError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!("Listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| BriefError::Server(format!("Server error: {e}")))?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/summarize", get(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters accepted by `/api/summarize`
#[derive(Debug, Deserialize)]
pub struct SummarizeParams {
    pub url: Option<String>,
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SummarizeParams>, QueryRejection>,
) -> Response {
    let url = match query {
        Ok(Query(params)) => params.url,
        Err(rejection) => {
            return BriefError::Request(format!("Invalid query string: {rejection}"))
                .into_response();
        }
    };

    match summarize(&state, url.as_deref()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Run the whole pipeline up to the point where the completion stream opens
async fn summarize(state: &AppState, url: Option<&str>) -> Result<Response> {
    let raw_url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| BriefError::Request("No url in the request".to_string()))?;

    let article = ArticleUrl::parse(raw_url)?;
    if !article.is_allowed(&state.config.server) {
        return Err(BriefError::Request(format!(
            "Host '{}' is not in the allowlist",
            article.host
        )));
    }

    tracing::info!("Summarizing {}", article.url);

    let html = fetch_html(&state.client, &article).await?;
    let text = extract_article_text(&html)?;
    let prompt = build_summary_prompt(&text);
    let request = CompletionRequest::summary(state.config.completion.model.as_str(), prompt);

    let stream = state.completion.open_stream(&request).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CACHE_CONTROL, SUMMARY_CACHE_CONTROL)
        .body(Body::from_stream(stream))
        .map_err(|e| BriefError::Server(format!("Failed to build response: {e}")))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
