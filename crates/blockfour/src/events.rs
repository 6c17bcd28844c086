//! Domain events appended to the event log.
//!
//! Events are immutable facts. The log of events is the only durable
//! record of game history; everything else is derived from it.

use blockfour_rules::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::GameId;

/// Discriminant of an [`Event`], as stored alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    /// A game was created, directly or as a rematch.
    GameCreated,
    /// A second player joined.
    PlayerJoined,
    /// A piece was placed.
    Move,
    /// A block was placed.
    Block,
    /// A chat line was sent.
    Chat,
}

/// An immutable fact about a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// A game was created with its first player.
    #[serde(rename_all = "camelCase")]
    GameCreated {
        /// Game the event belongs to.
        game_id: GameId,
        /// Creator's id.
        player_id: PlayerId,
        /// Creator's name.
        player_name: String,
        /// Creator's color.
        player_color: String,
        /// Side length of the board.
        board_size: usize,
        /// Source game when this game is a rematch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rematch_of: Option<GameId>,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A player joined an existing game.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        /// Game the event belongs to.
        game_id: GameId,
        /// Joining player's id.
        player_id: PlayerId,
        /// Joining player's name.
        player_name: String,
        /// Joining player's color.
        player_color: String,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A player placed a piece.
    #[serde(rename_all = "camelCase")]
    Move {
        /// Game the event belongs to.
        game_id: GameId,
        /// Moving player's id.
        player_id: PlayerId,
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A player spent their block.
    #[serde(rename_all = "camelCase")]
    Block {
        /// Game the event belongs to.
        game_id: GameId,
        /// Blocking player's id.
        player_id: PlayerId,
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
    /// A player sent a chat line.
    #[serde(rename_all = "camelCase")]
    Chat {
        /// Game the event belongs to.
        game_id: GameId,
        /// Sender's id.
        player_id: PlayerId,
        /// Sender's name at the time of sending.
        player_name: String,
        /// Message body.
        text: String,
        /// When it happened.
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GameCreated { .. } => EventKind::GameCreated,
            Self::PlayerJoined { .. } => EventKind::PlayerJoined,
            Self::Move { .. } => EventKind::Move,
            Self::Block { .. } => EventKind::Block,
            Self::Chat { .. } => EventKind::Chat,
        }
    }

    /// Game this event belongs to.
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::GameCreated { game_id, .. }
            | Self::PlayerJoined { game_id, .. }
            | Self::Move { game_id, .. }
            | Self::Block { game_id, .. }
            | Self::Chat { game_id, .. } => game_id,
        }
    }

    /// When the event happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::GameCreated { timestamp, .. }
            | Self::PlayerJoined { timestamp, .. }
            | Self::Move { timestamp, .. }
            | Self::Block { timestamp, .. }
            | Self::Chat { timestamp, .. } => *timestamp,
        }
    }
}
