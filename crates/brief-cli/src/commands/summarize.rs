use std::io::Write;

use brief::fetch::ArticleUrl;
use clap::Parser;
use futures::StreamExt;

use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, summary_json};

const TECHCRUNCH_HOST: &str = "techcrunch.com";
const TECHCRUNCH_BASE: &str = "https://techcrunch.com/";

#[derive(Parser)]
pub struct SummarizeCommand {
    #[clap(help = "TechCrunch article URL, or an article path such as 2023/01/05/some-story")]
    pub article: String,
}

impl SummarizeCommand {
    pub async fn execute<W: Write>(
        &self,
        server: &str,
        format: OutputFormat,
        out: &mut W,
    ) -> CliResult<()> {
        let article_url = resolve_article_url(&self.article)?;
        let endpoint = format!("{}/api/summarize", server.trim_end_matches('/'));

        let response = reqwest::Client::new()
            .get(&endpoint)
            .query(&[("url", article_url.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError(format!("Server returned {status}: {body}")));
        }

        let mut stream = response.bytes_stream();
        match format {
            OutputFormat::Text => {
                while let Some(chunk) = stream.next().await {
                    out.write_all(&chunk?)?;
                    out.flush()?;
                }
                writeln!(out)?;
            }
            OutputFormat::Json => {
                let mut summary = Vec::new();
                while let Some(chunk) = stream.next().await {
                    summary.extend_from_slice(&chunk?);
                }
                let summary = String::from_utf8_lossy(&summary);
                writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(&summary_json(&article_url, &summary))?
                )?;
            }
        }

        Ok(())
    }
}

/// Turn user input into a full TechCrunch article URL.
///
/// Bare paths are resolved against `https://techcrunch.com/`. Anything that
/// does not end up on a TechCrunch host is rejected.
pub fn resolve_article_url(input: &str) -> CliResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Please enter a TechCrunch article".into());
    }

    let lowered = input.to_ascii_lowercase();
    let candidate = if lowered.contains("://") {
        input.to_string()
    } else if lowered.starts_with(TECHCRUNCH_HOST) || lowered.starts_with("www.techcrunch.com") {
        format!("https://{input}")
    } else {
        format!("{TECHCRUNCH_BASE}{}", input.trim_start_matches('/'))
    };

    let article = ArticleUrl::parse(&candidate)?;
    if !is_techcrunch_host(&article.host) {
        return Err("Please enter a valid TechCrunch article".into());
    }

    Ok(article.url.to_string())
}

fn is_techcrunch_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == TECHCRUNCH_HOST
        || host
            .strip_suffix(TECHCRUNCH_HOST)
            .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
}
