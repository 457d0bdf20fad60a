mod config;
mod replay;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{OutputFormat, ReplayConfig};

#[derive(Debug, Parser)]
#[command(
    name = "aerolink",
    version,
    about = "Decode and inspect aviation-agent event streams"
)]
struct Cli {
    /// Optional TOML config file (defaults to config/aerolink.toml).
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode a captured SSE transcript and print each event.
    Replay {
        /// Transcript path, or `-` for stdin.
        transcript: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Print the assembled message and tool pairing after the events.
        #[arg(long)]
        summary: bool,
        /// Decode incrementally through the async adapter instead of
        /// reading the whole body first. Fails on abrupt disconnects.
        #[arg(long)]
        live: bool,
    },
    /// Decode a transcript and verify it closes with a terminal event.
    Check {
        /// Transcript path, or `-` for stdin.
        transcript: String,
        /// Fail when any frame decoded as unknown.
        #[arg(long)]
        strict_unknown: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ReplayConfig::load_from(path)?,
        None => ReplayConfig::load_from("config/aerolink.toml")?,
    };

    match cli.command {
        Commands::Replay {
            transcript,
            format,
            summary,
            live,
        } => {
            if let Some(format) = format {
                config.format = format;
            }
            if summary {
                config.summary = true;
            }
            if live {
                replay::run_replay_live(&transcript, &config).await
            } else {
                let body = replay::read_transcript(&transcript)?;
                replay::run_replay(&body, &config)
            }
        }
        Commands::Check {
            transcript,
            strict_unknown,
        } => {
            if strict_unknown {
                config.strict_unknown = true;
            }
            let body = replay::read_transcript(&transcript)?;
            replay::run_check(&body, &config)
        }
    }
}
