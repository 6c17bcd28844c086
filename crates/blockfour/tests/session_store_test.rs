//! Tests for the session store: validation, turn order, blocks and
//! per-game serialization.

use std::sync::Arc;

use blockfour::{
    Cell, Event, EventKind, EventLog, Game, GameError, GameId, Journal, MemoryScoreboard,
    PlayerId, ScoreEntry, SessionStore, StoreError,
};

fn setup() -> (Arc<Journal>, SessionStore) {
    let journal = Arc::new(Journal::in_memory());
    let store = SessionStore::new(journal.clone());
    (journal, store)
}

/// Creates a game for Alice and joins Bob. Returns the game and both ids.
async fn two_player_game(store: &SessionStore, size: i64) -> (Game, PlayerId, PlayerId) {
    let game = store.create("Alice", "red", size).await.expect("Create failed");
    let game = store.join(game.id(), "Bob", "blue").await.expect("Join failed");
    let alice = game.players()[0].id.clone();
    let bob = game.players()[1].id.clone();
    (game, alice, bob)
}

fn count_kind(journal: &Journal, game_id: &GameId, kind: EventKind) -> usize {
    journal
        .log()
        .read_game(game_id)
        .expect("Read failed")
        .iter()
        .filter(|e| e.kind() == kind)
        .count()
}

#[tokio::test]
async fn test_create_validates_input() {
    let (_journal, store) = setup();
    assert!(matches!(store.create("", "red", 5).await, Err(GameError::InvalidInput { .. })));
    assert!(matches!(store.create("Alice", " ", 5).await, Err(GameError::InvalidInput { .. })));
    assert!(matches!(store.create("Alice", "red", 0).await, Err(GameError::InvalidInput { .. })));
    assert!(matches!(store.create("Alice", "red", -3).await, Err(GameError::InvalidInput { .. })));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_create_seeds_single_player_game() {
    let (journal, store) = setup();
    let game = store.create("Alice", "red", 6).await.expect("Create failed");

    assert_eq!(game.players().len(), 1);
    assert_eq!(game.current_player(), &game.players()[0].id);
    assert_eq!(game.blocks_used().get(&game.players()[0].id), Some(&false));
    assert_eq!(*game.board_size(), 6);
    assert!(game.board().rows().all(|row| row.iter().all(Cell::is_empty)));
    assert_eq!(count_kind(&journal, game.id(), EventKind::GameCreated), 1);
}

#[tokio::test]
async fn test_join_then_get_round_trip() {
    let (_journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 5).await;

    let fetched = store.get(game.id()).await.expect("Get failed");
    assert_eq!(fetched.players().len(), 2);
    assert_eq!(fetched.blocks_used().len(), 2);
    assert!(fetched.blocks_used().values().all(|used| !used));
    assert_eq!(fetched.current_player(), &alice);
    assert_ne!(alice, bob);
}

#[tokio::test]
async fn test_join_errors() {
    let (_journal, store) = setup();
    assert_eq!(
        store.join(&GameId::new("missing"), "Bob", "blue").await.unwrap_err(),
        GameError::NotFound
    );

    let game = store.create("Alice", "red", 5).await.expect("Create failed");
    assert_eq!(
        store.join(game.id(), "Alice", "blue").await.unwrap_err(),
        GameError::NameTaken
    );
    // Names compare exactly.
    store.join(game.id(), "alice", "red").await.expect("Join failed");
    assert_eq!(
        store.join(game.id(), "Cara", "green").await.unwrap_err(),
        GameError::GameFull
    );
}

#[tokio::test]
async fn test_move_rejections() {
    let (_journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 5).await;
    let id = game.id();

    assert_eq!(store.apply_move(id, &bob, 0, 0).await.unwrap_err(), GameError::NotYourTurn);
    assert_eq!(
        store.apply_move(id, &alice, 5, 0).await.unwrap_err(),
        GameError::OutOfBounds { row: 5, col: 0 }
    );
    assert_eq!(
        store.apply_move(id, &alice, 0, -1).await.unwrap_err(),
        GameError::OutOfBounds { row: 0, col: -1 }
    );
    assert_eq!(
        store.apply_move(&GameId::new("nope"), &alice, 0, 0).await.unwrap_err(),
        GameError::NotFound
    );

    let game = store.apply_move(id, &alice, 0, 0).await.expect("Move failed");
    assert_eq!(game.current_player(), &bob);
    assert_eq!(store.apply_move(id, &bob, 0, 0).await.unwrap_err(), GameError::CellOccupied);
}

#[tokio::test]
async fn test_block_is_once_per_player_and_not_turn_gated() {
    let (journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 5).await;
    let id = game.id();

    // Bob blocks on Alice's turn; the turn does not move.
    let game = store.apply_block(id, &bob, 2, 2).await.expect("Block failed");
    assert_eq!(game.current_player(), &alice);
    assert_eq!(game.blocks_used().get(&bob), Some(&true));
    assert_eq!(game.blocks_used().get(&alice), Some(&false));

    assert_eq!(
        store.apply_block(id, &bob, 3, 3).await.unwrap_err(),
        GameError::BlockAlreadyUsed
    );
    assert_eq!(store.apply_move(id, &alice, 2, 2).await.unwrap_err(), GameError::CellOccupied);
    assert_eq!(store.apply_block(id, &alice, 2, 2).await.unwrap_err(), GameError::CellOccupied);
    assert!(matches!(
        store.apply_block(id, &PlayerId::new("stranger"), 0, 0).await,
        Err(GameError::InvalidInput { .. })
    ));

    store.apply_block(id, &alice, 4, 4).await.expect("Block failed");
    assert_eq!(count_kind(&journal, id, EventKind::Block), 2);
}

#[tokio::test]
async fn test_five_by_five_horizontal_win() {
    let (journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 5).await;
    let id = game.id();

    for col in 0..3 {
        store.apply_move(id, &alice, 2, col).await.expect("Alice move failed");
        store.apply_move(id, &bob, 3, col).await.expect("Bob move failed");
    }
    let game = store.apply_move(id, &alice, 2, 3).await.expect("Winning move failed");

    assert_eq!(game.winner(), &Some(alice.clone()));
    assert!(!*game.is_draw());
    assert_eq!(game.current_player(), &alice);
    assert_eq!(
        journal.scoreboard().top_players(5).expect("Scoreboard failed"),
        vec![ScoreEntry {
            name: "Alice".into(),
            wins: 1
        }]
    );
}

#[tokio::test]
async fn test_finished_game_rejects_and_logs_nothing_more() {
    let (journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 4).await;
    let id = game.id();

    for col in 0..3 {
        store.apply_move(id, &alice, 0, col).await.expect("Alice move failed");
        store.apply_move(id, &bob, 1, col).await.expect("Bob move failed");
    }
    store.apply_move(id, &alice, 0, 3).await.expect("Winning move failed");
    let moves = count_kind(&journal, id, EventKind::Move);

    assert_eq!(store.apply_move(id, &alice, 3, 3).await.unwrap_err(), GameError::GameFinished);
    assert_eq!(store.apply_move(id, &bob, 3, 3).await.unwrap_err(), GameError::GameFinished);
    assert_eq!(store.apply_block(id, &bob, 3, 3).await.unwrap_err(), GameError::GameFinished);

    assert_eq!(count_kind(&journal, id, EventKind::Move), moves);
    assert_eq!(count_kind(&journal, id, EventKind::Block), 0);
}

#[tokio::test]
async fn test_block_can_complete_a_draw() {
    let (journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 2).await;
    let id = game.id();

    store.apply_move(id, &alice, 0, 0).await.expect("Move failed");
    store.apply_move(id, &bob, 0, 1).await.expect("Move failed");
    store.apply_move(id, &alice, 1, 0).await.expect("Move failed");
    let game = store.apply_block(id, &alice, 1, 1).await.expect("Block failed");

    assert!(*game.is_draw());
    assert_eq!(game.winner(), &None);
    assert!(journal.scoreboard().top_players(5).expect("Scoreboard failed").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_moves_serialize() {
    let (journal, store) = setup();
    let (game, alice, _bob) = two_player_game(&store, 8).await;

    let handles: Vec<_> = (0..8)
        .map(|col| {
            let store = store.clone();
            let id = game.id().clone();
            let alice = alice.clone();
            tokio::spawn(async move { store.apply_move(&id, &alice, 0, col).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("Task panicked") {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e, GameError::NotYourTurn),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(count_kind(&journal, game.id(), EventKind::Move), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_by_both_players_stay_consistent() {
    for _ in 0..20 {
        let (journal, store) = setup();
        let (game, alice, bob) = two_player_game(&store, 5).await;
        let id = game.id().clone();

        let (a, b) = tokio::join!(
            {
                let store = store.clone();
                let id = id.clone();
                let alice = alice.clone();
                async move { store.apply_move(&id, &alice, 0, 0).await }
            },
            {
                let store = store.clone();
                let id = id.clone();
                let bob = bob.clone();
                async move { store.apply_move(&id, &bob, 1, 1).await }
            }
        );

        // Alice is current, so her move always lands. Bob's either ran first
        // and was refused, or ran second and took his turn.
        assert!(a.is_ok());
        let final_game = store.get(&id).await.expect("Get failed");
        let pieces = final_game
            .board()
            .rows()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count();
        match b {
            Ok(_) => {
                assert_eq!(pieces, 2);
                assert_eq!(final_game.current_player(), &alice);
            }
            Err(e) => {
                assert_eq!(e, GameError::NotYourTurn);
                assert_eq!(pieces, 1);
                assert_eq!(final_game.current_player(), &bob);
            }
        }
        assert_eq!(count_kind(&journal, &id, EventKind::Move), pieces);
    }
}

#[tokio::test]
async fn test_games_are_independent() {
    let (_journal, store) = setup();
    let (first, alice, _) = two_player_game(&store, 5).await;
    let (second, carol, _) = two_player_game(&store, 5).await;

    store.apply_move(first.id(), &alice, 0, 0).await.expect("Move failed");
    let untouched = store.get(second.id()).await.expect("Get failed");
    assert!(untouched.board().rows().flatten().all(Cell::is_empty));
    assert_eq!(
        store.apply_move(second.id(), &alice, 0, 0).await.unwrap_err(),
        GameError::NotYourTurn
    );
    store.apply_move(second.id(), &carol, 0, 0).await.expect("Move failed");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_rematch_creates_fresh_game_with_same_players() {
    let (journal, store) = setup();
    let (game, alice, bob) = two_player_game(&store, 6).await;
    store.apply_move(game.id(), &alice, 0, 0).await.expect("Move failed");
    store.apply_block(game.id(), &bob, 3, 3).await.expect("Block failed");

    let next = store.rematch(game.id()).await.expect("Rematch failed");
    assert_ne!(next.id(), game.id());
    assert_eq!(next.players(), game.players());
    assert_eq!(*next.board_size(), 6);
    assert_eq!(next.current_player(), &alice);
    assert!(next.blocks_used().values().all(|used| !used));
    assert!(next.board().rows().flatten().all(Cell::is_empty));

    // The source game is untouched.
    let old = store.get(game.id()).await.expect("Get failed");
    assert_eq!(old.blocks_used().get(&bob), Some(&true));

    let events = journal.log().read_game(next.id()).expect("Read failed");
    assert!(matches!(
        &events[0],
        Event::GameCreated { rematch_of: Some(source), .. } if source == game.id()
    ));
    assert!(matches!(&events[1], Event::PlayerJoined { player_name, .. } if player_name == "Bob"));

    assert_eq!(
        store.rematch(&GameId::new("missing")).await.unwrap_err(),
        GameError::NotFound
    );
}

#[tokio::test]
async fn test_chat_validation() {
    let (journal, store) = setup();
    let (game, alice, _bob) = two_player_game(&store, 5).await;
    let id = game.id();

    let message = store.chat(id, &alice, "  good luck  ").await.expect("Chat failed");
    assert_eq!(message.sender_name, "Alice");
    assert_eq!(message.text, "good luck");

    assert!(matches!(store.chat(id, &alice, "   ").await, Err(GameError::InvalidInput { .. })));
    assert!(matches!(
        store.chat(id, &alice, &"x".repeat(501)).await,
        Err(GameError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.chat(id, &PlayerId::new("stranger"), "hi").await,
        Err(GameError::InvalidInput { .. })
    ));
    assert_eq!(
        store.chat(&GameId::new("missing"), &alice, "hi").await.unwrap_err(),
        GameError::NotFound
    );
    store.chat(id, &alice, &"x".repeat(500)).await.expect("Chat failed");
    assert_eq!(count_kind(&journal, id, EventKind::Chat), 2);
}

#[derive(Debug)]
struct FailingLog;

impl EventLog for FailingLog {
    fn append(&self, _event: &Event) -> Result<(), StoreError> {
        Err(StoreError::new("disk full"))
    }

    fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_storage_failures_do_not_block_play() {
    let journal = Arc::new(Journal::new(Arc::new(FailingLog), Arc::new(MemoryScoreboard::new())));
    let store = SessionStore::new(journal.clone());

    let (game, alice, _bob) = two_player_game(&store, 5).await;
    let game = store.apply_move(game.id(), &alice, 0, 0).await.expect("Move failed");

    assert!(!game.board().rows().flatten().all(Cell::is_empty));
    // create, join and move each failed to append
    assert_eq!(journal.failures(), 3);
}

/// Records which thread each append ran on.
#[derive(Debug, Default)]
struct ThreadRecordingLog {
    threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
}

impl EventLog for ThreadRecordingLog {
    fn append(&self, _event: &Event) -> Result<(), StoreError> {
        self.threads
            .lock()
            .expect("Lock poisoned")
            .push(std::thread::current().id());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_writes_leave_the_runtime_thread_and_finish_before_returning() {
    let log = Arc::new(ThreadRecordingLog::default());
    let journal = Arc::new(Journal::new(log.clone(), Arc::new(MemoryScoreboard::new())));
    let store = SessionStore::new(journal);

    let (game, alice, _bob) = two_player_game(&store, 5).await;
    store.apply_move(game.id(), &alice, 0, 0).await.expect("Move failed");

    let threads = log.threads.lock().expect("Lock poisoned").clone();
    assert_eq!(threads.len(), 3);
    let runtime_thread = std::thread::current().id();
    assert!(threads.iter().all(|id| *id != runtime_thread));
}
