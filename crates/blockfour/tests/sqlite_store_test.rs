//! Tests for the SQLite event log and scoreboard.

use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;

use blockfour::{Event, EventLog, GameId, PlayerId, ScoreEntry, Scoreboard, SqliteStore};

/// Creates a temporary database file and opens a store on it. The file
/// handle must stay in scope to keep the file alive.
fn setup_test_db() -> (NamedTempFile, SqliteStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let store = SqliteStore::open(db_path(&db_file)).expect("Failed to open store");
    (db_file, store)
}

fn db_path(file: &NamedTempFile) -> &str {
    file.path().to_str().expect("Invalid path")
}

fn chat(game: &str, text: &str) -> Event {
    Event::Chat {
        game_id: GameId::new(game),
        player_id: PlayerId::new("p1"),
        player_name: "Alice".into(),
        text: text.into(),
        timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap(),
    }
}

fn entry(name: &str, wins: u32) -> ScoreEntry {
    ScoreEntry {
        name: name.into(),
        wins,
    }
}

#[test]
fn test_empty_log() {
    let (_db, store) = setup_test_db();
    assert!(store.read_all().expect("Read failed").is_empty());
}

#[test]
fn test_append_preserves_order_and_payload() {
    let (_db, store) = setup_test_db();
    let created = Event::GameCreated {
        game_id: GameId::new("g1"),
        player_id: PlayerId::new("p1"),
        player_name: "Alice".into(),
        player_color: "red".into(),
        board_size: 7,
        rematch_of: Some(GameId::new("g0")),
        timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
    };
    store.append(&created).expect("Append failed");
    store.append(&chat("g2", "other game")).expect("Append failed");
    store.append(&chat("g1", "hello")).expect("Append failed");

    let all = store.read_all().expect("Read failed");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0], created);

    let g1 = store.read_game(&GameId::new("g1")).expect("Read failed");
    assert_eq!(g1, vec![created, chat("g1", "hello")]);
}

#[test]
fn test_log_survives_reopen() {
    let (db, store) = setup_test_db();
    store.append(&chat("g1", "before restart")).expect("Append failed");
    store.record_win("Alice").expect("Win failed");
    drop(store);

    let reopened = SqliteStore::open(db_path(&db)).expect("Reopen failed");
    assert_eq!(
        reopened.read_all().expect("Read failed"),
        vec![chat("g1", "before restart")]
    );
    assert_eq!(
        reopened.top_players(5).expect("Scoreboard failed"),
        vec![entry("Alice", 1)]
    );
}

#[test]
fn test_scoreboard_orders_by_wins_then_first_seen() {
    let (_db, store) = setup_test_db();
    for name in ["Bob", "Alice", "Cara", "Alice", "Cara"] {
        store.record_win(name).expect("Win failed");
    }

    assert_eq!(
        store.top_players(10).expect("Scoreboard failed"),
        vec![entry("Alice", 2), entry("Cara", 2), entry("Bob", 1)]
    );
    assert_eq!(
        store.top_players(1).expect("Scoreboard failed"),
        vec![entry("Alice", 2)]
    );
    assert!(store.top_players(0).expect("Scoreboard failed").is_empty());
}

#[test]
fn test_replace_all_overwrites_counts() {
    let (_db, store) = setup_test_db();
    store.record_win("Stale").expect("Win failed");

    store
        .replace_all(&[entry("Dana", 3), entry("Eve", 3), entry("Finn", 1)])
        .expect("Replace failed");

    assert_eq!(
        store.top_players(10).expect("Scoreboard failed"),
        vec![entry("Dana", 3), entry("Eve", 3), entry("Finn", 1)]
    );
    store.record_win("Eve").expect("Win failed");
    assert_eq!(store.top_players(1).expect("Scoreboard failed"), vec![entry("Eve", 4)]);
}

#[test]
fn test_in_memory_database() {
    let store = SqliteStore::open(":memory:").expect("Open failed");
    store.append(&chat("g1", "hi")).expect("Append failed");
    assert_eq!(store.read_all().expect("Read failed").len(), 1);
    assert_eq!(store.path(), ":memory:");
}
