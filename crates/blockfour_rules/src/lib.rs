//! Block Four rules - pure board logic for four-in-a-row on an N×N grid.
//!
//! Nothing in this crate performs I/O or holds shared state. The server
//! crate consults these functions while it holds a game's lock.
//!
//! # Example
//!
//! ```
//! use blockfour_rules::{Board, Cell, PlayerId, detect_win};
//!
//! let alice = PlayerId::new("alice");
//! let mut board = Board::new(5).unwrap();
//! for col in 0..4 {
//!     let pos = board.position(2, col).unwrap();
//!     board.set(pos, Cell::Player(alice.clone()));
//! }
//! let last = board.position(2, 3).unwrap();
//! assert!(detect_win(&board, &alice, last));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod draw;
mod win;

pub use board::{Board, BoardError, Cell, PlayerId, Position, is_empty, is_in_bounds};
pub use draw::detect_draw;
pub use win::{WIN_LENGTH, detect_win};
