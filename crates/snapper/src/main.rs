//! `snapper <config.toml>`
//!
//! Runs one session per configured venue until every session has stopped.
//! Exits non-zero if any session ended fatally.

use anyhow::{Context, Result};
use clap::Parser;
use snapper::{Orchestrator, SnapperConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Multi-venue order book snapper
#[derive(Debug, Parser)]
#[command(name = "snapper", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = SnapperConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let sessions = config.session_configs().context("validating sessions")?;
    let codec = config.codec(&sessions).context("building pair codec")?;

    info!(
        "Starting {} session(s), writing to {}",
        sessions.len(),
        config.output_dir.display()
    );

    let exits = Orchestrator::new(sessions, codec, &config.output_dir).run().await;
    if !exits.is_empty() {
        let venues: Vec<String> = exits.iter().map(|e| e.venue.to_string()).collect();
        anyhow::bail!("session(s) ended fatally: {}", venues.join(", "));
    }
    Ok(())
}
