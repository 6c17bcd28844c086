//! Command-line interface for blockfour.

use std::path::PathBuf;

use blockfour::ConfigOverrides;
use clap::{Args, Parser, Subcommand};

/// Blockfour - two-player four-in-a-row server with blocks
#[derive(Parser, Debug)]
#[command(name = "blockfour")]
#[command(about = "Realtime four-in-a-row game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Database selection shared by every command.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the SQLite database (overrides config and environment)
    #[arg(long)]
    pub database: Option<String>,

    /// Optional TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket game server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Rebuild live games from the event log before serving
        #[arg(long)]
        restore: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print game summaries replayed from the event log
    History {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the top players by wins
    Scoreboard {
        /// Number of rows (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Recompute the scoreboard from the event log
    RebuildScoreboard {
        #[command(flatten)]
        store: StoreArgs,
    },
}

impl StoreArgs {
    /// Overrides carrying only the database path.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database: self.database.clone(),
            ..Default::default()
        }
    }
}
