//! Durable record keeping: the event log and the win-count scoreboard.
//!
//! Both stores sit behind traits so the session store can be wired to
//! SQLite in production and to in-memory implementations in tests.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{Event, GameId, StoreError};

/// Append-only, ordered sequence of events.
pub trait EventLog: Send + Sync + Debug {
    /// Appends one event. Either the whole event is stored or nothing is.
    fn append(&self, event: &Event) -> Result<(), StoreError>;

    /// Returns every event in append order.
    fn read_all(&self) -> Result<Vec<Event>, StoreError>;

    /// Returns the events of one game in append order.
    fn read_game(&self, game_id: &GameId) -> Result<Vec<Event>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|event| event.game_id() == game_id)
            .collect())
    }
}

/// A player's win count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Player name.
    pub name: String,
    /// Number of games won.
    pub wins: u32,
}

/// Durable name → wins aggregate.
pub trait Scoreboard: Send + Sync + Debug {
    /// Adds one win for `name`, registering the name on first sight.
    fn record_win(&self, name: &str) -> Result<(), StoreError>;

    /// Highest win counts first; ties keep first-seen order.
    fn top_players(&self, limit: usize) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Replaces every entry, keeping the given order as first-seen order.
    fn replace_all(&self, entries: &[ScoreEntry]) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::new("in-memory store mutex poisoned"))
}

/// Event log kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, event: &Event) -> Result<(), StoreError> {
        lock(&self.events)?.push(event.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        Ok(lock(&self.events)?.clone())
    }
}

/// Scoreboard kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryScoreboard {
    // Insertion order doubles as first-seen order.
    entries: Mutex<Vec<ScoreEntry>>,
}

impl MemoryScoreboard {
    /// Creates an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scoreboard for MemoryScoreboard {
    fn record_win(&self, name: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries)?;
        match entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.wins += 1,
            None => entries.push(ScoreEntry {
                name: name.to_string(),
                wins: 1,
            }),
        }
        Ok(())
    }

    fn top_players(&self, limit: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        let mut ranked = lock(&self.entries)?.clone();
        // Stable sort keeps first-seen order among equal counts.
        ranked.sort_by(|a, b| b.wins.cmp(&a.wins));
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn replace_all(&self, entries: &[ScoreEntry]) -> Result<(), StoreError> {
        *lock(&self.entries)? = entries.to_vec();
        Ok(())
    }
}

/// Write side of the durable stores, shared by every game.
///
/// Failures are logged at `error` level and counted; they never block
/// gameplay, since the in-memory session stays authoritative.
#[derive(Debug)]
pub struct Journal {
    log: Arc<dyn EventLog>,
    scoreboard: Arc<dyn Scoreboard>,
    failures: AtomicU64,
}

impl Journal {
    /// Creates a journal over the given stores.
    #[instrument(skip_all)]
    pub fn new(log: Arc<dyn EventLog>, scoreboard: Arc<dyn Scoreboard>) -> Self {
        info!(?log, ?scoreboard, "Creating journal");
        Self {
            log,
            scoreboard,
            failures: AtomicU64::new(0),
        }
    }

    /// Journal backed by fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEventLog::new()), Arc::new(MemoryScoreboard::new()))
    }

    /// Appends `event`, reporting rather than propagating failures.
    #[instrument(skip(self, event), fields(game_id = %event.game_id(), kind = %event.kind()))]
    pub fn record(&self, event: &Event) {
        match self.log.append(event) {
            Ok(()) => debug!("Event appended"),
            Err(e) => {
                let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                error!(error = %e, failures = total, "Failed to append event");
            }
        }
    }

    /// Adds a win for `name`, reporting rather than propagating failures.
    #[instrument(skip(self))]
    pub fn record_win(&self, name: &str) {
        match self.scoreboard.record_win(name) {
            Ok(()) => info!("Win recorded"),
            Err(e) => {
                let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                error!(error = %e, failures = total, "Failed to record win");
            }
        }
    }

    /// Number of storage writes that failed since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// The underlying event log.
    pub fn log(&self) -> &dyn EventLog {
        self.log.as_ref()
    }

    /// The underlying scoreboard.
    pub fn scoreboard(&self) -> &dyn Scoreboard {
        self.scoreboard.as_ref()
    }
}
