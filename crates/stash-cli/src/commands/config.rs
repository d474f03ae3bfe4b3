//! Configuration commands

use crate::console::CliConsole;
use anyhow::{Context, Result};
use stash::StashConfig;
use stash::config::default_config_path;

const REDACTED: &str = "********";

/// Show the effective configuration with secrets masked
pub fn show(console: &CliConsole, config: &StashConfig) -> Result<()> {
    console.print_header("Configuration");
    match default_config_path() {
        Some(path) if path.exists() => console.info(&format!("Default file: {}", path.display())),
        Some(path) => console.info(&format!("No file at {}, using defaults", path.display())),
        None => console.info("No home directory, using defaults"),
    }

    let mut shown = config.clone();
    if shown.remote.auth_token.is_some() {
        shown.remote.auth_token = Some(REDACTED.to_string());
    }

    let rendered = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
