//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(about = "Stash - keep saved articles in sync with your account")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (defaults to ~/.stash/config.toml)
    #[arg(long, global = true, env = "STASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print extra detail
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in as a user
    Login {
        /// User id
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Email address
        #[arg(long)]
        email: String,

        /// Avatar URL
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Sign out and forget the stored profile
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show whether an article is saved
    Status {
        /// Article id
        article: String,
    },

    /// Save an article, or remove it if already saved
    Toggle {
        /// Article id
        article: String,
    },

    /// List saved articles
    List,

    /// Remove an article from the saved list
    Remove {
        /// Article id
        article: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "stash", "login", "u-1", "--name", "Ada", "--email", "ada@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Login {
                id, name, avatar, ..
            } => {
                assert_eq!(id, "u-1");
                assert_eq!(name, "Ada");
                assert!(avatar.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["stash", "toggle", "a-1", "--config", "/tmp/stash.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/stash.toml")));
        assert!(matches!(cli.command, Commands::Toggle { ref article } if article == "a-1"));
    }

    #[test]
    fn test_remove_requires_article() {
        assert!(Cli::try_parse_from(["stash", "remove"]).is_err());
    }
}
