//! Read models derived by replaying the event log.
//!
//! Nothing here holds state between calls: every view is a fold over the
//! events in append order.

use std::collections::HashMap;

use blockfour_rules::{Board, Cell, PlayerId, detect_draw, detect_win};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{Event, GameId, ScoreEntry};

/// Name and color of a game's winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerInfo {
    /// Winner's display name.
    pub name: String,
    /// Winner's color.
    pub color: String,
}

/// A finished or in-progress game as reported by the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Game id.
    pub game_id: GameId,
    /// Cells as player colors; `""` for empty, `"#blocked"` for blocks.
    pub board: Vec<Vec<String>>,
    /// Side length of the board.
    pub board_size: usize,
    /// The winner, if any.
    pub winner: Option<WinnerInfo>,
    /// True if the board filled without a winner.
    pub is_draw: bool,
    /// Time of the latest move or block.
    pub timestamp: DateTime<Utc>,
}

/// A chat line as delivered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Game the line was sent in.
    pub game_id: GameId,
    /// Sender's name at the time of sending.
    pub sender_name: String,
    /// Message body.
    pub text: String,
    /// When it was sent.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct ReplayedGame {
    board: Board,
    board_size: usize,
    players: HashMap<PlayerId, WinnerInfo>,
    winner: Option<PlayerId>,
    is_draw: bool,
    last_change: Option<DateTime<Utc>>,
}

impl ReplayedGame {
    fn is_finished(&self) -> bool {
        self.winner.is_some() || self.is_draw
    }

    fn color_of(&self, id: &PlayerId) -> String {
        self.players
            .get(id)
            .map(|p| p.color.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn summary(&self, game_id: &GameId, timestamp: DateTime<Utc>) -> GameSummary {
        let board = self.board.map_cells(|cell| match cell {
            Cell::Player(id) => self.color_of(id),
            other => String::from(other.clone()),
        });
        GameSummary {
            game_id: game_id.clone(),
            board,
            board_size: self.board_size,
            winner: self.winner.as_ref().and_then(|id| self.players.get(id)).cloned(),
            is_draw: self.is_draw,
            timestamp,
        }
    }
}

/// Fold over the log that keeps every game in first-seen order.
#[derive(Debug, Default)]
struct Replay {
    order: Vec<GameId>,
    games: HashMap<GameId, ReplayedGame>,
}

impl Replay {
    /// Applies one event. Returns the winner's name when the event is the
    /// winning move of its game.
    fn apply(&mut self, event: &Event) -> Option<String> {
        match event {
            Event::GameCreated {
                game_id,
                player_id,
                player_name,
                player_color,
                board_size,
                ..
            } => {
                let board = match Board::new(*board_size) {
                    Ok(board) => board,
                    Err(e) => {
                        warn!(%game_id, error = %e, "Skipping game with unusable board");
                        return None;
                    }
                };
                let players = HashMap::from([(
                    player_id.clone(),
                    WinnerInfo {
                        name: player_name.clone(),
                        color: player_color.clone(),
                    },
                )]);
                if self.games.contains_key(game_id) {
                    warn!(%game_id, "Duplicate game-created event ignored");
                    return None;
                }
                self.order.push(game_id.clone());
                self.games.insert(
                    game_id.clone(),
                    ReplayedGame {
                        board,
                        board_size: *board_size,
                        players,
                        winner: None,
                        is_draw: false,
                        last_change: None,
                    },
                );
                None
            }
            Event::PlayerJoined {
                game_id,
                player_id,
                player_name,
                player_color,
                ..
            } => {
                let game = self.games.get_mut(game_id)?;
                game.players.insert(
                    player_id.clone(),
                    WinnerInfo {
                        name: player_name.clone(),
                        color: player_color.clone(),
                    },
                );
                None
            }
            Event::Move {
                game_id,
                player_id,
                row,
                col,
                timestamp,
            } => {
                let game = self.games.get_mut(game_id)?;
                let pos = place(game, game_id, *row, *col, Cell::Player(player_id.clone()))?;
                game.last_change = Some(*timestamp);
                if game.is_finished() {
                    return None;
                }
                if detect_win(&game.board, player_id, pos) {
                    game.winner = Some(player_id.clone());
                    return game.players.get(player_id).map(|p| p.name.clone());
                }
                game.is_draw = detect_draw(&game.board);
                None
            }
            Event::Block {
                game_id,
                row,
                col,
                timestamp,
                ..
            } => {
                let game = self.games.get_mut(game_id)?;
                place(game, game_id, *row, *col, Cell::Blocked)?;
                game.last_change = Some(*timestamp);
                if !game.is_finished() {
                    game.is_draw = detect_draw(&game.board);
                }
                None
            }
            Event::Chat { .. } => None,
        }
    }
}

fn place(
    game: &mut ReplayedGame,
    game_id: &GameId,
    row: usize,
    col: usize,
    cell: Cell,
) -> Option<blockfour_rules::Position> {
    let pos = i64::try_from(row)
        .ok()
        .zip(i64::try_from(col).ok())
        .and_then(|(r, c)| game.board.position(r, c).ok());
    match pos {
        Some(pos) => {
            game.board.set(pos, cell);
            Some(pos)
        }
        None => {
            warn!(%game_id, row, col, "Skipping placement outside the board");
            None
        }
    }
}

/// Replays `events` into one summary per game that has at least one move
/// or block, most recent first.
///
/// Games that were created or joined but never played are left out. Their
/// only timestamp would be the creation time, which would rank a fresh
/// rematch ahead of the finished game it replaced.
#[instrument(skip(events), fields(events = events.len()))]
pub fn reconstruct(events: &[Event]) -> Vec<GameSummary> {
    let mut replay = Replay::default();
    for event in events {
        replay.apply(event);
    }

    let mut summaries: Vec<GameSummary> = replay
        .order
        .iter()
        .filter_map(|id| {
            let game = replay.games.get(id)?;
            game.last_change.map(|at| game.summary(id, at))
        })
        .collect();
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    debug!(games = summaries.len(), "History reconstructed");
    summaries
}

/// Counts wins per player name, in the order each name first won.
#[instrument(skip(events), fields(events = events.len()))]
pub fn tally_wins(events: &[Event]) -> Vec<ScoreEntry> {
    let mut replay = Replay::default();
    let mut tally: Vec<ScoreEntry> = Vec::new();
    for event in events {
        let Some(name) = replay.apply(event) else {
            continue;
        };
        match tally.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.wins += 1,
            None => tally.push(ScoreEntry { name, wins: 1 }),
        }
    }
    debug!(players = tally.len(), "Wins tallied");
    tally
}

/// Chat lines of one game, in the order they were sent.
pub fn chat_history(events: &[Event], game_id: &GameId) -> Vec<ChatMessage> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Chat {
                game_id: id,
                player_name,
                text,
                timestamp,
                ..
            } if id == game_id => Some(ChatMessage {
                game_id: id.clone(),
                sender_name: player_name.clone(),
                text: text.clone(),
                timestamp: *timestamp,
            }),
            _ => None,
        })
        .collect()
}
