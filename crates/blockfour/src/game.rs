//! The authoritative game aggregate.
//!
//! `Game` holds the board, the players and the turn, and enforces every
//! rule of a single session. It knows nothing about locking, storage or
//! transport; [`crate::SessionStore`] wraps each game in its own lock.

use std::collections::BTreeMap;

use blockfour_rules::{Board, Cell, PlayerId, detect_draw, detect_win};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{GameError, GameId};

/// Largest board a game may be created with.
pub const MAX_BOARD_SIZE: usize = 64;

/// Maximum number of players in a game.
pub const MAX_PLAYERS: usize = 2;

/// A participant in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player's unique ID within the game.
    pub id: PlayerId,
    /// Display name, unique within the game.
    pub name: String,
    /// Free-form color token chosen by the client.
    pub color: String,
}

impl Player {
    /// Creates a player after checking that name and color are present.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] if either field is blank.
    pub fn new(id: PlayerId, name: impl Into<String>, color: impl Into<String>) -> Result<Self, GameError> {
        let name = name.into();
        let color = color.into();
        if name.trim().is_empty() {
            return Err(GameError::invalid("playerName is required"));
        }
        if color.trim().is_empty() {
            return Err(GameError::invalid("playerColor is required"));
        }
        Ok(Self { id, name, color })
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Play continues.
    Continue,
    /// The placing player completed a run.
    Won,
    /// The board filled up without a winner.
    Draw,
}

/// A game session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Session id.
    id: GameId,
    /// Cells, always `board_size` by `board_size`.
    board: Board,
    /// Side length fixed at creation.
    board_size: usize,
    /// At most two players in join order.
    players: Vec<Player>,
    /// Player allowed to move next. Stays on the winner once won.
    current_player: PlayerId,
    /// Whether each joined player has spent their block.
    blocks_used: BTreeMap<PlayerId, bool>,
    /// Winning player, if any.
    winner: Option<PlayerId>,
    /// True once the board filled without a winner.
    is_draw: bool,
    /// When the game was created.
    created_at: DateTime<Utc>,
    /// When the game last changed.
    updated_at: DateTime<Utc>,
}

impl Game {
    /// Creates a game with `creator` in slot 0 and an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] if `board_size` is outside
    /// `1..=MAX_BOARD_SIZE`.
    #[instrument(skip(creator), fields(creator = %creator.id))]
    pub fn new(id: GameId, creator: Player, board_size: usize, at: DateTime<Utc>) -> Result<Self, GameError> {
        if board_size > MAX_BOARD_SIZE {
            return Err(GameError::invalid(format!(
                "boardSize must be at most {MAX_BOARD_SIZE}"
            )));
        }
        let board = Board::new(board_size)?;
        let blocks_used = BTreeMap::from([(creator.id.clone(), false)]);
        Ok(Self {
            id,
            board,
            board_size,
            current_player: creator.id.clone(),
            players: vec![creator],
            blocks_used,
            winner: None,
            is_draw: false,
            created_at: at,
            updated_at: at,
        })
    }

    /// True once a winner or a draw has been recorded.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.is_draw
    }

    /// Looks up a player of this game by id.
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// The player who won, if any.
    pub fn winning_player(&self) -> Option<&Player> {
        self.winner.as_ref().and_then(|id| self.player(id))
    }

    /// Adds the second player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameFull`] or [`GameError::NameTaken`].
    #[instrument(skip(self, player), fields(game_id = %self.id, player = %player.id))]
    pub fn add_player(&mut self, player: Player, at: DateTime<Utc>) -> Result<(), GameError> {
        if self.players.len() >= MAX_PLAYERS {
            warn!("Game already has two players");
            return Err(GameError::GameFull);
        }
        if self.players.iter().any(|p| p.name == player.name) {
            warn!(name = %player.name, "Name already used in this game");
            return Err(GameError::NameTaken);
        }
        self.blocks_used.insert(player.id.clone(), false);
        self.players.push(player);
        self.updated_at = at;
        Ok(())
    }

    /// Places a piece for `player_id` and advances the turn.
    ///
    /// On a win the winner stays current; the game is terminal from then on.
    ///
    /// # Errors
    ///
    /// [`GameError::GameFinished`], [`GameError::NotYourTurn`],
    /// [`GameError::OutOfBounds`] or [`GameError::CellOccupied`], checked
    /// in that order.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn place_piece(
        &mut self,
        player_id: &PlayerId,
        row: i64,
        col: i64,
        at: DateTime<Utc>,
    ) -> Result<Placement, GameError> {
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        if &self.current_player != player_id {
            debug!(current = %self.current_player, "Move out of turn");
            return Err(GameError::NotYourTurn);
        }
        let pos = self.board.position(row, col)?;
        if !self.board.get(pos).is_some_and(Cell::is_empty) {
            return Err(GameError::CellOccupied);
        }

        self.board.set(pos, Cell::Player(player_id.clone()));
        self.updated_at = at;

        if detect_win(&self.board, player_id, pos) {
            self.winner = Some(player_id.clone());
            return Ok(Placement::Won);
        }
        if detect_draw(&self.board) {
            self.is_draw = true;
            return Ok(Placement::Draw);
        }
        self.current_player = self.next_player(player_id);
        Ok(Placement::Continue)
    }

    /// Spends `player_id`'s block on an empty cell.
    ///
    /// Blocks are not turn-gated and never advance the turn. A block can
    /// complete a draw but never a win.
    ///
    /// # Errors
    ///
    /// [`GameError::GameFinished`], [`GameError::InvalidInput`] for a
    /// stranger, [`GameError::BlockAlreadyUsed`], [`GameError::OutOfBounds`]
    /// or [`GameError::CellOccupied`], checked in that order.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn place_block(
        &mut self,
        player_id: &PlayerId,
        row: i64,
        col: i64,
        at: DateTime<Utc>,
    ) -> Result<Placement, GameError> {
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        let used = self
            .blocks_used
            .get_mut(player_id)
            .ok_or_else(|| GameError::invalid("player is not part of this game"))?;
        if *used {
            return Err(GameError::BlockAlreadyUsed);
        }
        let pos = self.board.position(row, col)?;
        if !self.board.get(pos).is_some_and(Cell::is_empty) {
            return Err(GameError::CellOccupied);
        }

        *used = true;
        self.board.set(pos, Cell::Blocked);
        self.updated_at = at;

        if detect_draw(&self.board) {
            self.is_draw = true;
            return Ok(Placement::Draw);
        }
        Ok(Placement::Continue)
    }

    /// Builds a fresh game with the same players and board size.
    ///
    /// The first player to have joined moves first.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn rematch(&self, id: GameId, at: DateTime<Utc>) -> Result<Self, GameError> {
        let mut players = self.players.iter().cloned();
        let creator = players
            .next()
            .ok_or_else(|| GameError::invalid("game has no players"))?;
        let mut game = Self::new(id, creator, self.board_size, at)?;
        for player in players {
            game.add_player(player, at)?;
        }
        Ok(game)
    }

    fn next_player(&self, player_id: &PlayerId) -> PlayerId {
        self.players
            .iter()
            .map(|p| &p.id)
            .find(|id| *id != player_id)
            .unwrap_or(player_id)
            .clone()
    }
}
