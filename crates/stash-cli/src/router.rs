//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::commands;
use crate::console::CliConsole;
use anyhow::{Context, Result};
use stash::{Stash, StashConfig};
use tracing::debug;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: StashConfig) -> Result<()> {
    let console = CliConsole::new(cli.verbose);

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => commands::config::show(&console, &config),
        };
    }

    debug!("Using remote {}", config.remote.base_url);
    let stash = Stash::open(config)
        .await
        .context("Failed to open the saved-articles store")?;

    match cli.command {
        Commands::Login {
            id,
            name,
            email,
            avatar,
        } => commands::session::login(&console, &stash, id, name, email, avatar).await,
        Commands::Logout => commands::session::logout(&console, &stash).await,
        Commands::Whoami => commands::session::whoami(&console, &stash),
        Commands::Status { article } => commands::saved::status(&console, &stash, article).await,
        Commands::Toggle { article } => commands::saved::toggle(&console, &stash, article).await,
        Commands::List => commands::saved::list(&console, &stash).await,
        Commands::Remove { article } => commands::saved::remove(&console, &stash, article).await,
        Commands::Config { .. } => Ok(()),
    }
}
