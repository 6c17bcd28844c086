//! Tests that replaying the event log reproduces history, scoreboard and
//! live sessions.

use std::sync::Arc;

use blockfour::{
    EventLog, Journal, ScoreEntry, SessionStore, SqliteStore, WinnerInfo, reconstruct,
    replay_sessions, tally_wins,
};

#[tokio::test]
async fn test_create_join_win_rematch_replays_to_history() {
    let journal = Arc::new(Journal::in_memory());
    let store = SessionStore::new(journal.clone());

    let game = store.create("Alice", "crimson", 5).await.expect("Create failed");
    let game = store.join(game.id(), "Bob", "teal").await.expect("Join failed");
    let alice = game.players()[0].id.clone();
    let bob = game.players()[1].id.clone();
    for row in 0..3 {
        store.apply_move(game.id(), &alice, row, 0).await.expect("Move failed");
        store.apply_move(game.id(), &bob, row, 1).await.expect("Move failed");
    }
    store.apply_move(game.id(), &alice, 3, 0).await.expect("Winning move failed");
    let rematch = store.rematch(game.id()).await.expect("Rematch failed");

    let events = journal.log().read_all().expect("Read failed");
    let summaries = reconstruct(&events);

    let latest = &summaries[0];
    assert_eq!(&latest.game_id, game.id());
    assert_eq!(
        latest.winner,
        Some(WinnerInfo {
            name: "Alice".into(),
            color: "crimson".into()
        })
    );
    assert!(!latest.is_draw);
    assert_eq!(latest.board[3][0], "crimson");
    assert_eq!(latest.board[2][1], "teal");
    // The rematch has no moves yet.
    assert!(summaries.iter().all(|s| &s.game_id != rematch.id()));

    assert_eq!(
        tally_wins(&events),
        vec![ScoreEntry {
            name: "Alice".into(),
            wins: 1
        }]
    );
    assert_eq!(
        journal.scoreboard().top_players(5).expect("Scoreboard failed"),
        tally_wins(&events)
    );
}

#[tokio::test]
async fn test_replay_rebuilds_live_sessions() {
    let journal = Arc::new(Journal::in_memory());
    let store = SessionStore::new(journal.clone());

    let game = store.create("Alice", "red", 6).await.expect("Create failed");
    let game = store.join(game.id(), "Bob", "blue").await.expect("Join failed");
    let alice = game.players()[0].id.clone();
    let bob = game.players()[1].id.clone();
    store.apply_move(game.id(), &alice, 1, 1).await.expect("Move failed");
    store.apply_block(game.id(), &alice, 4, 4).await.expect("Block failed");
    store.chat(game.id(), &bob, "nice").await.expect("Chat failed");
    let live = store.apply_move(game.id(), &bob, 2, 2).await.expect("Move failed");
    let rematch = store.rematch(game.id()).await.expect("Rematch failed");

    let replayed = replay_sessions(&journal.log().read_all().expect("Read failed"));
    assert_eq!(replayed.len(), 2);

    let restored = &replayed[0];
    assert_eq!(restored.id(), live.id());
    assert_eq!(restored.board(), live.board());
    assert_eq!(restored.players(), live.players());
    assert_eq!(restored.current_player(), live.current_player());
    assert_eq!(restored.blocks_used(), live.blocks_used());
    assert_eq!(replayed[1].players(), rematch.players());

    let fresh = SessionStore::new(Arc::new(Journal::in_memory()));
    assert_eq!(fresh.restore(replayed), 2);
    let resumed = fresh.get(game.id()).await.expect("Restored game missing");
    assert_eq!(resumed.current_player(), &alice);
    fresh.apply_move(game.id(), &alice, 0, 0).await.expect("Move after restore failed");
}

#[tokio::test]
async fn test_history_survives_restart() {
    let db_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let path = db_file.path().to_str().expect("Invalid path").to_string();

    {
        let sqlite = Arc::new(SqliteStore::open(&path).expect("Open failed"));
        let journal = Arc::new(Journal::new(sqlite.clone(), sqlite));
        let store = SessionStore::new(journal);
        let game = store.create("Alice", "red", 4).await.expect("Create failed");
        let game = store.join(game.id(), "Bob", "blue").await.expect("Join failed");
        let alice = game.players()[0].id.clone();
        let bob = game.players()[1].id.clone();
        for col in 0..3 {
            store.apply_move(game.id(), &alice, 0, col).await.expect("Move failed");
            store.apply_move(game.id(), &bob, 1, col).await.expect("Move failed");
        }
        store.apply_move(game.id(), &alice, 0, 3).await.expect("Winning move failed");
    }

    let sqlite = SqliteStore::open(&path).expect("Reopen failed");
    let summaries = reconstruct(&sqlite.read_all().expect("Read failed"));
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].winner.as_ref().map(|w| w.name.as_str()), Some("Alice"));
    assert_eq!(
        blockfour::Scoreboard::top_players(&sqlite, 5).expect("Scoreboard failed"),
        vec![ScoreEntry {
            name: "Alice".into(),
            wins: 1
        }]
    );
}
