mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use knowdeck::config::AppConfig;

#[derive(Parser)]
#[command(name = "knowdeck", version, about = "AI tagging, summaries and similarity for Knowledge Deck")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Suggest tags for a piece of text
    Tags {
        text: String,
        /// Print JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Summarize a piece of text
    Summarize {
        text: String,
        #[arg(long)]
        json: bool,
    },
    /// Rank items by similarity to a query
    Similar {
        query: String,
        #[arg(required = true)]
        items: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// View or change the AI provider settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect or empty the AI response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Check the database and the AI backend
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the stored provider and API key
    Show,
    /// Set the provider ("none" or "remote") and optionally the API key
    Set {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Replace the stored API key
    SetKey { key: String },
    /// Forget the stored settings
    Reset,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts
    Stats,
    /// Remove all entries
    Clear,
    /// Remove expired entries
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = AppConfig::load()?;

    // Log to stderr so stdout stays clean for --json output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Tags { text, json } => cli::ai::tags(&config, &text, json).await?,
        Command::Summarize { text, json } => cli::ai::summarize(&config, &text, json).await?,
        Command::Similar { query, items, json } => {
            cli::ai::similar(&config, &query, &items, json).await?
        }
        Command::Config { action } => match action {
            ConfigAction::Show => cli::settings::show(&config)?,
            ConfigAction::Set { provider, api_key } => {
                cli::settings::set(&config, &provider, api_key).await?
            }
            ConfigAction::SetKey { key } => cli::settings::set_key(&config, &key).await?,
            ConfigAction::Reset => cli::settings::reset(&config)?,
        },
        Command::Cache { action } => match action {
            CacheAction::Stats => cli::cache::stats(&config)?,
            CacheAction::Clear => cli::cache::clear(&config)?,
            CacheAction::Purge => cli::cache::purge(&config)?,
        },
        Command::Doctor => cli::doctor::doctor(&config).await?,
    }

    Ok(())
}
