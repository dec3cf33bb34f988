//! Summarization prompt
//!
//! The completion model receives a single instruction with the article text
//! quoted at the end.

/// Instruction sent to the completion model
///
/// Placeholder: {article} - the extracted article text
pub const SUMMARY_PROMPT: &str = r#"I want you to act like a news article summarizer. I will input text from a news article and your job is to convert it into a useful summary of a few sentences. Do not repeat sentences and make sure all sentences are clear and complete: "{article}""#;

/// Build the summarization prompt for an article's text
pub fn build_summary_prompt(article_text: &str) -> String {
    SUMMARY_PROMPT.replace("{article}", article_text)
}
