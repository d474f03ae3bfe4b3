//! Stash CLI
//!
//! Drives the saved-article sync core from a terminal:
//!
//! ```bash
//! stash login u-1 --name Ada --email ada@example.com
//! stash toggle a-42
//! stash list
//! stash remove a-42
//! ```
//!
//! Logging follows `RUST_LOG` when set, otherwise `logging.level` from the
//! configuration file.

mod args;
mod commands;
mod console;
mod router;

use anyhow::{Context, Result};
use clap::Parser;
use stash::LoggingConfig;
use stash::config::load_config;
use tracing_subscriber::EnvFilter;

use args::Cli;

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging);

    router::route(cli, config).await
}
