mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use saathi::config::SaathiConfig;

#[derive(Parser)]
#[command(name = "saathi", version, about = "Personal assistant for expenses, tasks and moods")]
struct Cli {
    /// Config file (default: ~/.saathi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat interactively; each line is classified and recorded
    Chat,
    /// Submit a single message
    Say {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the most recent activities
    Feed,
    /// Show spending and mood summaries
    Summary,
    /// Translate text to Hindi
    Translate {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check the activity database
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => SaathiConfig::load_from(path)?,
        None => SaathiConfig::load()?,
    };

    // Log to stderr so stdout stays clean for rendered output.
    let filter = EnvFilter::try_new(&config.app.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat => cli::chat::chat(&config).await?,
        Command::Say { text } => cli::say::say(&config, &text.join(" ")).await?,
        Command::Feed => cli::feed::feed(&config).await?,
        Command::Summary => cli::summary::summary(&config).await?,
        Command::Translate { text } => cli::translate::translate(&config, &text.join(" ")).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
