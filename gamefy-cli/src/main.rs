mod commands;
mod render;
mod utils;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use gamefy_core::{DateRange, GamefyConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gamefy")]
#[command(about = "View the GameFy calendar: feed events merged with stored events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List calendar items in a date window
    Events {
        /// Show events from this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Use this feed instead of the configured one
        #[arg(long)]
        feed: Option<String>,

        /// Print the merged items as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration paths and the active feed
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Events {
            from,
            to,
            feed,
            json,
        } => {
            let config = GamefyConfig::load()?;
            let defaults = config.default_range(Utc::now());
            let range = DateRange::from_args(from.as_deref(), to.as_deref(), &defaults)?;
            commands::events::run(&config, feed.as_deref(), range, json).await
        }
        Commands::Config => commands::config::run(),
    }
}

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` overrides the level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}
