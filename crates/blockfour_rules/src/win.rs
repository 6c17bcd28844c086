//! Win detection through the most recently placed piece.

use crate::{Board, PlayerId, Position};
use tracing::instrument;

/// Number of contiguous pieces needed to win.
pub const WIN_LENGTH: usize = 4;

/// Horizontal, vertical, and both diagonals.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Checks whether the piece `player` just placed at `at` completes a run.
///
/// Counts contiguous cells owned by `player` in both directions along each
/// axis, including `at` itself. Boards smaller than [`WIN_LENGTH`] can
/// never produce a win.
#[instrument(skip(board), fields(size = board.size()))]
pub fn detect_win(board: &Board, player: &PlayerId, at: Position) -> bool {
    AXES.iter()
        .any(|&(d_row, d_col)| run_length(board, player, at, d_row, d_col) >= WIN_LENGTH)
}

fn run_length(board: &Board, player: &PlayerId, at: Position, d_row: isize, d_col: isize) -> usize {
    1 + count_from(board, player, at, d_row, d_col) + count_from(board, player, at, -d_row, -d_col)
}

fn count_from(board: &Board, player: &PlayerId, at: Position, d_row: isize, d_col: isize) -> usize {
    let mut count = 0;
    let mut cursor = at;
    while let Some(next) = board.step(cursor, d_row, d_col) {
        if !board.get(next).is_some_and(|cell| cell.is_owned_by(player)) {
            break;
        }
        count += 1;
        cursor = next;
    }
    count
}
