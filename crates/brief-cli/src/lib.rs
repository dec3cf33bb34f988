pub mod commands;
pub mod error;
pub mod output;

pub use commands::{SummarizeCommand, resolve_article_url};
pub use error::{CliError, CliResult};
pub use output::OutputFormat;
