#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    /// Print fragments as they arrive
    #[default]
    Text,
    /// Print one JSON object once the summary is complete
    Json,
}

pub fn summary_json(url: &str, summary: &str) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "summary": summary,
    })
}
