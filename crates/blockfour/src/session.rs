//! Authoritative in-memory game sessions.
//!
//! Each game lives behind its own async mutex. Every mutation takes that
//! lock, validates and applies the change, appends the matching event and
//! publishes the new snapshot before releasing it, so per-game ordering of
//! state, log and broadcast always agree. Different games never share a
//! lock. Storage writes run on the blocking pool and are awaited while the
//! game's lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use blockfour_rules::PlayerId;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{Span, debug, error, info, instrument, warn};

use crate::{
    ChatMessage, Event, Game, GameError, GameId, Journal, Placement, Player, Publisher,
    ServerMessage, generate_player_id,
};

/// Longest accepted chat line, in characters.
pub const MAX_CHAT_LENGTH: usize = 500;

type GameCell = Arc<Mutex<Game>>;

/// Keyed collection of live games with per-game exclusion.
#[derive(Debug, Clone)]
pub struct SessionStore {
    games: Arc<DashMap<GameId, GameCell>>,
    journal: Arc<Journal>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl SessionStore {
    /// Creates an empty store writing to `journal`.
    #[instrument(skip_all)]
    pub fn new(journal: Arc<Journal>) -> Self {
        info!("Creating session store");
        Self {
            games: Arc::new(DashMap::new()),
            journal,
            publisher: None,
        }
    }

    /// Publishes committed snapshots through `publisher`.
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Journal this store writes to.
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// Number of live games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// True when no game is live.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn cell(&self, game_id: &GameId) -> Result<GameCell, GameError> {
        self.games
            .get(game_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                debug!(%game_id, "Game not found");
                GameError::NotFound
            })
    }

    fn publish(&self, game_id: &GameId, message: ServerMessage) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(game_id, message);
        }
    }

    /// Appends `event` from the blocking pool. Returns once the write is done.
    async fn persist(&self, event: Event) {
        let journal = Arc::clone(&self.journal);
        let span = Span::current();
        let write = tokio::task::spawn_blocking(move || span.in_scope(|| journal.record(&event)));
        if let Err(e) = write.await {
            error!(error = %e, "Journal write task failed");
        }
    }

    async fn persist_win(&self, name: String) {
        let journal = Arc::clone(&self.journal);
        let span = Span::current();
        let write = tokio::task::spawn_blocking(move || span.in_scope(|| journal.record_win(&name)));
        if let Err(e) = write.await {
            error!(error = %e, "Scoreboard write task failed");
        }
    }

    /// Creates a game with one player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a blank name or color, or a
    /// board size outside `1..=MAX_BOARD_SIZE`.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        player_name: &str,
        player_color: &str,
        board_size: i64,
    ) -> Result<Game, GameError> {
        let board_size = usize::try_from(board_size)
            .ok()
            .filter(|size| *size >= 1)
            .ok_or_else(|| GameError::invalid("boardSize must be at least 1"))?;
        let creator = Player::new(generate_player_id(), player_name, player_color)?;
        let now = Utc::now();
        let game = Game::new(GameId::generate(), creator.clone(), board_size, now)?;

        self.persist(Event::GameCreated {
            game_id: game.id().clone(),
            player_id: creator.id,
            player_name: creator.name,
            player_color: creator.color,
            board_size,
            rematch_of: None,
            timestamp: now,
        })
        .await;
        self.games
            .insert(game.id().clone(), Arc::new(Mutex::new(game.clone())));
        info!(game_id = %game.id(), board_size, "Game created");
        Ok(game)
    }

    /// Returns a snapshot of a game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub async fn get(&self, game_id: &GameId) -> Result<Game, GameError> {
        let cell = self.cell(game_id)?;
        let game = cell.lock().await;
        Ok(game.clone())
    }

    /// Runs `f` against a game while holding its lock.
    ///
    /// No mutation can commit or publish for that game while `f` runs.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown id.
    pub async fn inspect<R>(&self, game_id: &GameId, f: impl FnOnce(&Game) -> R) -> Result<R, GameError> {
        let cell = self.cell(game_id)?;
        let game = cell.lock().await;
        Ok(f(&game))
    }

    /// Adds the second player to a game.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`], [`GameError::InvalidInput`],
    /// [`GameError::GameFull`] or [`GameError::NameTaken`].
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        game_id: &GameId,
        player_name: &str,
        player_color: &str,
    ) -> Result<Game, GameError> {
        let cell = self.cell(game_id)?;
        let mut game = cell.lock().await;

        let player = Player::new(generate_player_id(), player_name, player_color)?;
        let now = Utc::now();
        game.add_player(player.clone(), now)?;

        self.persist(Event::PlayerJoined {
            game_id: game_id.clone(),
            player_id: player.id.clone(),
            player_name: player.name,
            player_color: player.color,
            timestamp: now,
        })
        .await;
        info!(player_id = %player.id, "Player joined");
        self.publish(game_id, ServerMessage::GameUpdated { game: game.clone() });
        Ok(game.clone())
    }

    /// Places a piece for `player_id`.
    ///
    /// A winning move is also recorded on the scoreboard under the
    /// winner's name.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`], [`GameError::GameFinished`],
    /// [`GameError::NotYourTurn`], [`GameError::OutOfBounds`] or
    /// [`GameError::CellOccupied`].
    #[instrument(skip(self))]
    pub async fn apply_move(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        row: i64,
        col: i64,
    ) -> Result<Game, GameError> {
        let cell = self.cell(game_id)?;
        let mut game = cell.lock().await;

        let now = Utc::now();
        let placement = game.place_piece(player_id, row, col, now).inspect_err(|e| {
            warn!(error = %e, "Move rejected");
        })?;

        // Coordinates were bounds-checked by the placement.
        self.persist(Event::Move {
            game_id: game_id.clone(),
            player_id: player_id.clone(),
            row: row as usize,
            col: col as usize,
            timestamp: now,
        })
        .await;
        match placement {
            Placement::Won => {
                if let Some(winner) = game.winning_player() {
                    info!(winner = %winner.name, "Game won");
                    self.persist_win(winner.name.clone()).await;
                }
            }
            Placement::Draw => info!("Game drawn"),
            Placement::Continue => debug!(next = %game.current_player(), "Turn advanced"),
        }
        self.publish(game_id, ServerMessage::GameUpdated { game: game.clone() });
        Ok(game.clone())
    }

    /// Spends `player_id`'s block on an empty cell.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`], [`GameError::GameFinished`],
    /// [`GameError::InvalidInput`], [`GameError::BlockAlreadyUsed`],
    /// [`GameError::OutOfBounds`] or [`GameError::CellOccupied`].
    #[instrument(skip(self))]
    pub async fn apply_block(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        row: i64,
        col: i64,
    ) -> Result<Game, GameError> {
        let cell = self.cell(game_id)?;
        let mut game = cell.lock().await;

        let now = Utc::now();
        let placement = game.place_block(player_id, row, col, now).inspect_err(|e| {
            warn!(error = %e, "Block rejected");
        })?;

        self.persist(Event::Block {
            game_id: game_id.clone(),
            player_id: player_id.clone(),
            row: row as usize,
            col: col as usize,
            timestamp: now,
        })
        .await;
        if placement == Placement::Draw {
            info!("Game drawn by block");
        }
        self.publish(game_id, ServerMessage::GameUpdated { game: game.clone() });
        Ok(game.clone())
    }

    /// Starts a new game with the same players and board size.
    ///
    /// The old game is left untouched; its room receives the new game in a
    /// `rematch` message.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub async fn rematch(&self, game_id: &GameId) -> Result<Game, GameError> {
        let cell = self.cell(game_id)?;
        let old = cell.lock().await;

        let now = Utc::now();
        let game = old.rematch(GameId::generate(), now)?;
        let mut players = game.players().iter();
        if let Some(creator) = players.next() {
            self.persist(Event::GameCreated {
                game_id: game.id().clone(),
                player_id: creator.id.clone(),
                player_name: creator.name.clone(),
                player_color: creator.color.clone(),
                board_size: *game.board_size(),
                rematch_of: Some(game_id.clone()),
                timestamp: now,
            })
            .await;
        }
        for player in players {
            self.persist(Event::PlayerJoined {
                game_id: game.id().clone(),
                player_id: player.id.clone(),
                player_name: player.name.clone(),
                player_color: player.color.clone(),
                timestamp: now,
            })
            .await;
        }
        self.games
            .insert(game.id().clone(), Arc::new(Mutex::new(game.clone())));
        info!(new_game_id = %game.id(), "Rematch created");
        self.publish(game_id, ServerMessage::Rematch { game: game.clone() });
        Ok(game)
    }

    /// Sends a chat line to the game's room.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`], or [`GameError::InvalidInput`] for a blank
    /// or overlong text or a sender outside the game.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn chat(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        text: &str,
    ) -> Result<ChatMessage, GameError> {
        let cell = self.cell(game_id)?;
        let game = cell.lock().await;

        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::invalid("text is required"));
        }
        if text.chars().count() > MAX_CHAT_LENGTH {
            return Err(GameError::invalid(format!(
                "text must be at most {MAX_CHAT_LENGTH} characters"
            )));
        }
        let sender = game
            .player(player_id)
            .ok_or_else(|| GameError::invalid("player is not part of this game"))?;

        let message = ChatMessage {
            game_id: game_id.clone(),
            sender_name: sender.name.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.persist(Event::Chat {
            game_id: game_id.clone(),
            player_id: player_id.clone(),
            player_name: message.sender_name.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
        })
        .await;
        debug!(sender = %message.sender_name, "Chat line sent");
        self.publish(game_id, ServerMessage::ChatMessage(message.clone()));
        Ok(message)
    }

    /// Installs replayed games, skipping ids that are already live.
    ///
    /// Nothing is journaled: the games came from the log.
    #[instrument(skip_all, fields(count = games.len()))]
    pub fn restore(&self, games: Vec<Game>) -> usize {
        let mut restored = 0;
        for game in games {
            let id = game.id().clone();
            if self.games.contains_key(&id) {
                continue;
            }
            self.games.insert(id, Arc::new(Mutex::new(game)));
            restored += 1;
        }
        info!(restored, "Sessions restored");
        restored
    }
}

/// Rebuilds live games from the log using the same rules as the store.
///
/// Events that the rules reject are skipped with a warning. Games come
/// back in creation order.
#[instrument(skip(events), fields(events = events.len()))]
pub fn replay_sessions(events: &[Event]) -> Vec<Game> {
    let mut order: Vec<GameId> = Vec::new();
    let mut games: HashMap<GameId, Game> = HashMap::new();

    for event in events {
        let result = match event {
            Event::GameCreated {
                game_id,
                player_id,
                player_name,
                player_color,
                board_size,
                timestamp,
                ..
            } if !games.contains_key(game_id) => {
                Player::new(player_id.clone(), player_name.as_str(), player_color.as_str())
                    .and_then(|creator| Game::new(game_id.clone(), creator, *board_size, *timestamp))
                    .map(|game| {
                        order.push(game_id.clone());
                        games.insert(game_id.clone(), game);
                    })
            }
            Event::GameCreated { .. } => Err(GameError::invalid("duplicate game-created event")),
            Event::PlayerJoined {
                game_id,
                player_id,
                player_name,
                player_color,
                timestamp,
            } => match games.get_mut(game_id) {
                Some(game) => Player::new(player_id.clone(), player_name.as_str(), player_color.as_str())
                    .and_then(|player| game.add_player(player, *timestamp)),
                None => Err(GameError::NotFound),
            },
            Event::Move {
                game_id,
                player_id,
                row,
                col,
                timestamp,
            } => match games.get_mut(game_id) {
                Some(game) => game
                    .place_piece(player_id, *row as i64, *col as i64, *timestamp)
                    .map(|_| ()),
                None => Err(GameError::NotFound),
            },
            Event::Block {
                game_id,
                player_id,
                row,
                col,
                timestamp,
            } => match games.get_mut(game_id) {
                Some(game) => game
                    .place_block(player_id, *row as i64, *col as i64, *timestamp)
                    .map(|_| ()),
                None => Err(GameError::NotFound),
            },
            Event::Chat { .. } => Ok(()),
        };
        if let Err(e) = result {
            warn!(game_id = %event.game_id(), kind = %event.kind(), error = %e, "Skipping event during replay");
        }
    }

    let restored: Vec<Game> = order.iter().filter_map(|id| games.remove(id)).collect();
    debug!(games = restored.len(), "Sessions replayed");
    restored
}
