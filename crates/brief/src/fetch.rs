//! Article URL validation and page fetching

use reqwest::Client;
use url::Url;

use crate::config::ServerConfig;
use crate::error::{BriefError, Result};

/// A validated article URL taken from the `url` query parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleUrl {
    /// The parsed URL
    pub url: Url,
    /// The host (domain or IP) from the URL
    pub host: String,
}

impl ArticleUrl {
    /// Parse an article URL, accepting only `http` and `https` with a host.
    ///
    /// Fragments are dropped since they are never sent to the origin.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut url = Url::parse(raw.trim())
            .map_err(|e| BriefError::Request(format!("Invalid URL '{raw}': {e}")))?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(BriefError::Request(format!(
                "Unsupported URL scheme '{scheme}': only http and https are allowed"
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| BriefError::Request(format!("URL '{raw}' has no host")))?
            .to_string();

        url.set_fragment(None);

        Ok(Self { url, host })
    }

    /// Check the host against the configured allowlist.
    ///
    /// An empty allowlist allows every host. Patterns are either exact hosts
    /// or `*.example.com`, which matches any subdomain of `example.com`.
    pub fn is_allowed(&self, config: &ServerConfig) -> bool {
        if config.allowed_hosts.is_empty() {
            return true;
        }

        config
            .allowed_hosts
            .iter()
            .any(|pattern| host_matches_pattern(&self.host, pattern))
    }
}

fn host_matches_pattern(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host
            .strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1);
    }

    host == pattern
}

/// Download a page and return its body as text.
///
/// A connection failure or a non-success status is reported as
/// [`BriefError::Fetch`].
pub async fn fetch_html(client: &Client, article: &ArticleUrl) -> Result<String> {
    tracing::debug!("Fetching article: {}", article.url);

    let response = client
        .get(article.url.clone())
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                BriefError::Fetch(format!("Request timed out: {e}"))
            } else if e.is_connect() {
                BriefError::Fetch(format!("Failed to connect to {}: {e}", article.host))
            } else {
                BriefError::Fetch(format!("Request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(BriefError::Fetch(format!(
            "{} returned {status}",
            article.url
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| BriefError::Fetch(format!("Failed to read article body: {e}")))?;

    tracing::debug!(bytes = body.len(), "Fetched article page");
    Ok(body)
}
