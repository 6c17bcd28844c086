//! Error types for game actions and durable storage.

use axum::http::StatusCode;
use blockfour_rules::BoardError;
use derive_more::{Display, Error};
use tracing::instrument;

/// A rejected game action.
///
/// Every variant is recoverable by the caller: it is reported to the
/// requesting client only and never affects other games or connections.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum GameError {
    /// Missing or malformed request fields.
    #[display("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the request.
        reason: String,
    },
    /// No game with the requested id.
    #[display("Game not found")]
    NotFound,
    /// The game already has two players.
    #[display("Game is full")]
    GameFull,
    /// Another player in the game uses this name.
    #[display("Player name already taken")]
    NameTaken,
    /// A winner or draw has already been recorded.
    #[display("Game is already finished")]
    GameFinished,
    /// The player is not the current player.
    #[display("Not your turn")]
    NotYourTurn,
    /// The coordinate lies outside the board.
    #[display("Invalid position ({row}, {col})")]
    OutOfBounds {
        /// Requested row.
        row: i64,
        /// Requested column.
        col: i64,
    },
    /// The target cell holds a piece or a block.
    #[display("Position already occupied")]
    CellOccupied,
    /// The player has already spent their block.
    #[display("Block already used")]
    BlockAlreadyUsed,
}

impl GameError {
    /// Builds an [`GameError::InvalidInput`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Stable kebab-case code for clients and logs.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// HTTP status used when the error is returned over REST.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::OutOfBounds { row, col, .. } => Self::OutOfBounds { row, col },
            BoardError::InvalidSize { size } => Self::invalid(format!("board size {size}")),
        }
    }
}

/// Durable storage error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Storage error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new storage error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Event encoding error: {}", err))
    }
}
