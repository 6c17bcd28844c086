//! SQLite persistence for the event log and the scoreboard.

mod models;
mod schema; // Diesel generated schema - internal use only
mod store;

pub use store::SqliteStore;
