//! CLI module for Aria
//!
//! Provides command-line interface parsing for the aria-bot binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aria - personal Telegram assistant
///
/// Relays Telegram messages to a language model and remembers the recent
/// conversation with every user.
#[derive(Parser, Debug)]
#[command(
    name = "aria-bot",
    version,
    about = "Aria - personal Telegram assistant",
    long_about = "A Telegram assistant that answers text, photos, voice notes and text documents\n\
                  through a language model, with a bounded per-user conversation memory.\n\n\
                  Run without arguments to start the bot.",
    after_help = "EXAMPLES:\n    \
                  aria-bot                        # Start the bot (reads aria.toml and .env)\n    \
                  aria-bot --config my.toml run   # Use a custom config file\n    \
                  aria-bot config --validate      # Check the configuration\n    \
                  aria-bot history show 12345     # Inspect a user's stored conversation\n    \
                  aria-bot history clear 12345    # Forget a user's conversation"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./aria.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the bot (default)
    Run,

    /// Show the effective configuration (secrets are never printed)
    Config {
        /// Exit with an error if the configuration cannot run the bot
        #[arg(long)]
        validate: bool,
    },

    /// Inspect or clear stored conversations
    #[command(subcommand)]
    History(HistoryCommands),
}

/// Conversation memory subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HistoryCommands {
    /// Print a user's stored entries, oldest first
    Show {
        /// Telegram user id
        user_id: String,
    },

    /// Delete every stored entry for a user
    Clear {
        /// Telegram user id
        user_id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; no subcommand means `run`
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
