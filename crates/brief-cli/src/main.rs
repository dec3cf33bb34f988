use clap::{Parser, Subcommand};
use brief_cli::commands::SummarizeCommand;
use brief_cli::error::CliResult;
use brief_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "brief-cli")]
#[command(about = "Brief CLI - stream TechCrunch article summaries from a Brief server")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(
        long,
        short = 's',
        global = true,
        default_value = "http://127.0.0.1:3000",
        help = "Base URL of the Brief server"
    )]
    pub server: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Summarize an article, printing the summary as it streams in")]
    Summarize(SummarizeCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Command::Summarize(cmd) => cmd.execute(&cli.server, format, &mut stdout).await,
    }
}
