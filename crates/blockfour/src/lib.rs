//! Blockfour game server library.
//!
//! Two players share a square board over a realtime connection, racing to
//! place four in a row while each may spend one block on any empty cell.
//!
//! # Architecture
//!
//! - **Game**: the authoritative per-game state machine
//! - **Sessions**: live games, each mutated under its own lock
//! - **Journal**: the append-only event log and the win scoreboard
//! - **History**: summaries, chat and win tallies replayed from the log
//! - **Rooms**: per-game subscriber sets for realtime fan-out
//! - **Server**: HTTP and WebSocket endpoints
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blockfour::{Journal, SessionStore};
//!
//! # async fn example() -> Result<(), blockfour::GameError> {
//! let sessions = SessionStore::new(Arc::new(Journal::in_memory()));
//! let game = sessions.create("Alice", "red", 7).await?;
//! let game = sessions.join(game.id(), "Bob", "blue").await?;
//! assert_eq!(game.players().len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod error;
mod events;
mod game;
mod history;
mod http;
mod ids;
mod journal;
mod protocol;
mod realtime;
mod rooms;
mod server;
mod session;

// Crate-level exports - Rules
pub use blockfour_rules::{Board, BoardError, Cell, PlayerId, Position, WIN_LENGTH};

// Crate-level exports - Configuration
pub use config::{ConfigError, ConfigOverrides, ServerConfig};

// Crate-level exports - Storage
pub use db::SqliteStore;
pub use journal::{EventLog, Journal, MemoryEventLog, MemoryScoreboard, ScoreEntry, Scoreboard};

// Crate-level exports - Errors
pub use error::{GameError, StoreError};

// Crate-level exports - Domain
pub use events::{Event, EventKind};
pub use game::{Game, MAX_BOARD_SIZE, MAX_PLAYERS, Placement, Player};
pub use ids::{GameId, generate_player_id};

// Crate-level exports - Sessions
pub use session::{MAX_CHAT_LENGTH, SessionStore, replay_sessions};

// Crate-level exports - Read models
pub use history::{ChatMessage, GameSummary, WinnerInfo, chat_history, reconstruct, tally_wins};

// Crate-level exports - Realtime
pub use protocol::{ClientMessage, ServerMessage};
pub use realtime::{dispatch, handle_frame, serve_connection, ws_handler};
pub use rooms::{Connection, ConnectionId, Publisher, Rooms};

// Crate-level exports - Server
pub use http::{ApiError, ApiJson, ApiQuery, MAX_SCOREBOARD_LIMIT};
pub use server::{AppState, open_journal, router, serve};
