//! Board, cell and position types.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Wire form of the blocked sentinel. `#` never appears in generated ids.
const BLOCKED_TOKEN: &str = "#blocked";

/// Identifier of a player within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single square of the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Cell {
    /// Nothing placed here yet.
    #[default]
    Empty,
    /// Placed by a block action. Occupied for moves, matches no player's run.
    Blocked,
    /// Holds a piece of the given player.
    Player(PlayerId),
}

impl Cell {
    /// True only for [`Cell::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// True if the cell holds a piece of `player`.
    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        matches!(self, Cell::Player(id) if id == player)
    }
}

impl From<String> for Cell {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "" => Cell::Empty,
            BLOCKED_TOKEN => Cell::Blocked,
            _ => Cell::Player(PlayerId(raw)),
        }
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => String::new(),
            Cell::Blocked => BLOCKED_TOKEN.to_string(),
            Cell::Player(id) => id.0,
        }
    }
}

/// A validated coordinate on a particular board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("({row}, {col})")]
pub struct Position {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

/// Errors produced by board construction and addressing.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    /// The coordinate lies outside the board.
    #[display("Position ({row}, {col}) is outside a {size}x{size} board")]
    OutOfBounds {
        /// Requested row.
        row: i64,
        /// Requested column.
        col: i64,
        /// Board size.
        size: usize,
    },
    /// Board sizes must be at least 1.
    #[display("Invalid board size {size}")]
    InvalidSize {
        /// Requested size.
        size: usize,
    },
}

/// Returns true if `(row, col)` addresses a cell of a `size`×`size` board.
pub fn is_in_bounds(size: usize, row: i64, col: i64) -> bool {
    let Ok(size) = i64::try_from(size) else {
        return false;
    };
    (0..size).contains(&row) && (0..size).contains(&col)
}

/// True only if the addressed cell exists and is empty.
pub fn is_empty(board: &Board, row: i64, col: i64) -> bool {
    board
        .position(row, col)
        .ok()
        .and_then(|pos| board.get(pos))
        .is_some_and(Cell::is_empty)
}

/// Square N×N board stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an empty board of `size`×`size` cells.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidSize`] when `size` is zero.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        if size == 0 {
            return Err(BoardError::InvalidSize { size });
        }
        Ok(Self {
            size,
            cells: vec![Cell::Empty; size * size],
        })
    }

    /// Side length of the board.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Validates a signed coordinate against this board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfBounds`] for negative or too-large values.
    pub fn position(&self, row: i64, col: i64) -> Result<Position, BoardError> {
        if !is_in_bounds(self.size, row, col) {
            return Err(BoardError::OutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        // Both values are in 0..size, so the casts are lossless.
        Ok(Position {
            row: row as usize,
            col: col as usize,
        })
    }

    /// Returns the cell at `pos`, or `None` if it belongs to a larger board.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        if pos.row >= self.size || pos.col >= self.size {
            return None;
        }
        self.cells.get(pos.row * self.size + pos.col)
    }

    /// Overwrites the cell at `pos`. Positions from another board are ignored.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if pos.row < self.size && pos.col < self.size {
            self.cells[pos.row * self.size + pos.col] = cell;
        }
    }

    /// Steps one cell from `pos` along `(d_row, d_col)`, staying on the board.
    pub fn step(&self, pos: Position, d_row: isize, d_col: isize) -> Option<Position> {
        let row = pos.row.checked_add_signed(d_row)?;
        let col = pos.col.checked_add_signed(d_col)?;
        (row < self.size && col < self.size).then_some(Position { row, col })
    }

    /// True when no empty cell remains. Blocked cells count as filled.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// Iterates over the rows of the board.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }

    /// Maps every cell through `f`, preserving the grid shape.
    pub fn map_cells<T>(&self, mut f: impl FnMut(&Cell) -> T) -> Vec<Vec<T>> {
        self.rows()
            .map(|row| row.iter().map(&mut f).collect())
            .collect()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        let size = rows.len();
        if size == 0 || rows.iter().any(|row| row.len() != size) {
            return Err(BoardError::InvalidSize { size });
        }
        Ok(Self {
            size,
            cells: rows.into_iter().flatten().collect(),
        })
    }
}

impl From<Board> for Vec<Vec<Cell>> {
    fn from(board: Board) -> Self {
        board.map_cells(Cell::clone)
    }
}
