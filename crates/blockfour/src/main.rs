//! Blockfour - unified CLI
//!
//! Serves games and inspects the durable event log.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use blockfour::{ConfigOverrides, ServerConfig, SqliteStore, reconstruct, serve, tally_wins};
use blockfour::{EventLog, Scoreboard};
use clap::Parser;
use cli::{Cli, Command, StoreArgs};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,blockfour=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            restore,
            store,
        } => {
            let overrides = ConfigOverrides {
                host,
                port,
                database: store.database.clone(),
                restore_sessions: restore,
            };
            let config = ServerConfig::load(store.config.as_deref(), overrides)?;
            info!(addr = %config.bind_addr(), database = %config.database(), "Starting blockfour server");
            serve(config).await
        }
        Command::History { store } => print_history(&store),
        Command::Scoreboard { limit, store } => print_scoreboard(&store, limit),
        Command::RebuildScoreboard { store } => rebuild_scoreboard(&store),
    }
}

fn open_store(args: &StoreArgs) -> Result<(ServerConfig, SqliteStore)> {
    let config = ServerConfig::load(args.config.as_deref(), args.overrides())?;
    let store = SqliteStore::open(config.database())?;
    Ok((config, store))
}

/// Print reconstructed game summaries
#[instrument(skip(args))]
fn print_history(args: &StoreArgs) -> Result<()> {
    let (_, store) = open_store(args)?;
    let summaries = reconstruct(&store.read_all()?);
    if summaries.is_empty() {
        println!("No games played yet.");
    }
    for summary in summaries {
        let outcome = match (&summary.winner, summary.is_draw) {
            (Some(winner), _) => format!("won by {} ({})", winner.name, winner.color),
            (None, true) => "draw".to_string(),
            (None, false) => "unfinished".to_string(),
        };
        println!(
            "{}  {}x{}  {}  {}",
            summary.timestamp.to_rfc3339(),
            summary.board_size,
            summary.board_size,
            summary.game_id,
            outcome
        );
    }
    Ok(())
}

/// Print the top players
#[instrument(skip(args))]
fn print_scoreboard(args: &StoreArgs, limit: Option<usize>) -> Result<()> {
    let (config, store) = open_store(args)?;
    let limit = limit.unwrap_or(*config.scoreboard_limit());
    for (rank, entry) in store.top_players(limit)?.iter().enumerate() {
        println!("{:>3}. {:<24} {}", rank + 1, entry.name, entry.wins);
    }
    Ok(())
}

/// Recompute win counts from the event log and overwrite the scoreboard
#[instrument(skip(args))]
fn rebuild_scoreboard(args: &StoreArgs) -> Result<()> {
    let (_, store) = open_store(args)?;
    let tally = tally_wins(&store.read_all()?);
    store.replace_all(&tally)?;
    info!(players = tally.len(), "Scoreboard rebuilt from event log");
    println!("Rebuilt scoreboard for {} players.", tally.len());
    Ok(())
}
