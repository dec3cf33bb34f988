pub mod summarize;

pub use summarize::{SummarizeCommand, resolve_article_url};
