//! Realtime wire protocol.
//!
//! Every frame is a JSON object tagged by `"type"`.

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Game, GameId};
use blockfour_rules::PlayerId;

/// Messages sent by clients over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Subscribe to a game's room.
    #[serde(rename_all = "camelCase")]
    JoinGame {
        /// Room to join.
        game_id: GameId,
    },
    /// Place a piece.
    #[serde(rename_all = "camelCase")]
    MakeMove {
        /// Target game.
        game_id: GameId,
        /// Moving player.
        player_id: PlayerId,
        /// Target row.
        row: i64,
        /// Target column.
        col: i64,
    },
    /// Spend the player's block.
    #[serde(rename_all = "camelCase")]
    PlaceBlock {
        /// Target game.
        game_id: GameId,
        /// Blocking player.
        player_id: PlayerId,
        /// Target row.
        row: i64,
        /// Target column.
        col: i64,
    },
    /// Send a chat line to the room.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        /// Target game.
        game_id: GameId,
        /// Sender.
        player_id: PlayerId,
        /// Message body.
        text: String,
    },
    /// Start a new game with the same players.
    #[serde(rename_all = "camelCase")]
    Rematch {
        /// Game to rematch.
        game_id: GameId,
    },
    /// Unsubscribe from a game's room.
    #[serde(rename_all = "camelCase")]
    LeaveGame {
        /// Room to leave.
        game_id: GameId,
    },
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Full snapshot for a connection that just joined the room.
    GameState {
        /// Current game.
        game: Game,
    },
    /// Full snapshot after a successful change.
    GameUpdated {
        /// Current game.
        game: Game,
    },
    /// The new game created by a rematch, sent to the old room.
    Rematch {
        /// The new game.
        game: Game,
    },
    /// A chat line.
    ChatMessage(ChatMessage),
    /// A rejected request. Sent only to the requester.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Builds an error frame from anything displayable.
    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}
