//! Article text extraction
//!
//! Pulls the readable text out of a TechCrunch article page by locating the
//! article body container.

use scraper::{Html, Selector};

use crate::error::{BriefError, Result};

/// CSS selector for the element that holds the article body
pub const ARTICLE_SELECTOR: &str = ".article-content";

/// Extract the article text from a raw HTML document.
///
/// Finds the first element matching [`ARTICLE_SELECTOR`], joins its text
/// nodes and strips line breaks and tabs. Fails when the page has no such
/// element; there is no fallback.
pub fn extract_article_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(ARTICLE_SELECTOR)
        .map_err(|e| BriefError::Extraction(format!("Invalid selector {ARTICLE_SELECTOR}: {e:?}")))?;

    let element = document.select(&selector).next().ok_or_else(|| {
        BriefError::Extraction(format!("No element matching {ARTICLE_SELECTOR} in page"))
    })?;

    let text: String = element.text().collect();
    let cleaned = strip_control_breaks(&text);

    tracing::debug!(
        raw_chars = text.len(),
        cleaned_chars = cleaned.len(),
        "Extracted article text"
    );

    Ok(cleaned)
}

/// Remove every line break (`\r\n`, `\n`, `\r`) and tab from `text`.
pub fn strip_control_breaks(text: &str) -> String {
    text.replace(['\r', '\n', '\t'], "")
}
