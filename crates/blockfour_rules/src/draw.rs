//! Draw detection.

use crate::Board;
use tracing::instrument;

/// Returns true when every cell is occupied or blocked.
///
/// Callers run [`crate::detect_win`] first; a full board only counts as a
/// draw when the last placement did not win.
#[instrument(skip(board), fields(size = board.size()))]
pub fn detect_draw(board: &Board) -> bool {
    board.is_full()
}
