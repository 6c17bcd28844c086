//! Shared server state and startup.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use derive_getters::Getters;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::db::SqliteStore;
use crate::{
    ChatMessage, GameId, GameSummary, Journal, Rooms, ScoreEntry, ServerConfig, SessionStore,
    StoreError, chat_history, http, realtime, reconstruct, replay_sessions,
};

/// Everything a request handler needs.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    /// Live games.
    sessions: SessionStore,
    /// Realtime subscribers per game.
    rooms: Arc<Rooms>,
    /// Effective configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires a session store to a fresh room registry.
    #[instrument(skip_all)]
    pub fn new(journal: Arc<Journal>, config: ServerConfig) -> Self {
        let rooms = Arc::new(Rooms::new());
        let sessions = SessionStore::new(journal).with_publisher(rooms.clone());
        Self {
            sessions,
            rooms,
            config: Arc::new(config),
        }
    }

    /// The journal behind the session store.
    pub fn journal(&self) -> &Arc<Journal> {
        self.sessions.journal()
    }

    /// Game summaries replayed from the event log, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    pub fn history(&self) -> Result<Vec<GameSummary>, StoreError> {
        Ok(reconstruct(&self.journal().log().read_all()?))
    }

    /// Top `limit` players by wins.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the scoreboard cannot be read.
    pub fn scoreboard(&self, limit: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        self.journal().scoreboard().top_players(limit)
    }

    /// Chat lines of one game, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    pub fn chat_history(&self, game_id: &GameId) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(chat_history(&self.journal().log().read_game(game_id)?, game_id))
    }

    /// Rebuilds live sessions from the event log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    #[instrument(skip(self))]
    pub fn restore_sessions(&self) -> Result<usize, StoreError> {
        let games = replay_sessions(&self.journal().log().read_all()?);
        Ok(self.sessions.restore(games))
    }
}

/// Builds the HTTP and WebSocket routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/game/create", post(http::create_game))
        .route("/api/game/join", post(http::join_game))
        .route("/api/game/move", post(http::make_move))
        .route("/api/game/block", post(http::place_block))
        .route("/api/game/rematch", post(http::rematch))
        .route("/api/game/chat", post(http::send_chat).get(http::chat_messages))
        .route("/api/game/details", get(http::game_details))
        .route("/api/history", get(http::history))
        .route("/api/scoreboard", get(http::scoreboard))
        .route("/ws", get(realtime::ws_handler))
        .with_state(state)
}

/// Opens the database named in `config` and returns a journal over it.
///
/// # Errors
///
/// Returns [`StoreError`] if the database cannot be opened or migrated.
pub fn open_journal(config: &ServerConfig) -> Result<Arc<Journal>, StoreError> {
    let store = Arc::new(SqliteStore::open(config.database())?);
    Ok(Arc::new(Journal::new(store.clone(), store)))
}

/// Runs the server until the listener fails.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the address
/// cannot be bound.
#[instrument(skip(config), fields(addr = %config.bind_addr()))]
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let journal = open_journal(&config)?;
    let state = AppState::new(journal, config.clone());

    if *config.restore_sessions() {
        let restored = state.restore_sessions()?;
        info!(restored, "Live sessions rebuilt from event log");
    }

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server ready at http://{}/", config.bind_addr());
    axum::serve(listener, router(state)).await?;
    Ok(())
}
