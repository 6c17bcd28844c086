//! SQLite-backed event log and scoreboard.

use std::sync::{Mutex, MutexGuard};

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::models::{EventRow, NewEventRow, NewScore, ScoreRow};
use crate::db::schema;
use crate::{Event, EventLog, GameId, ScoreEntry, Scoreboard, StoreError};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// One SQLite connection serving both the event log and the scoreboard.
///
/// The connection sits behind a mutex, so every write is exclusive and
/// every read sees a committed prefix of the log.
pub struct SqliteStore {
    path: String,
    conn: Mutex<SqliteConnection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies migrations.
    ///
    /// Use `":memory:"` for a throwaway database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or migrated.
    #[instrument(fields(path = %path))]
    pub fn open(path: &str) -> Result<Self, StoreError> {
        info!("Opening event store");
        let mut conn = SqliteConnection::establish(path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", path, e)))?;
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL; PRAGMA busy_timeout = 5000;")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migration failed: {}", e)))?;
        debug!(applied = applied.len(), "Migrations applied");
        Ok(Self {
            path: path.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Path the store was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn connection(&self) -> Result<MutexGuard<'_, SqliteConnection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new("SQLite connection mutex poisoned"))
    }

    fn decode_rows(rows: Vec<EventRow>) -> Result<Vec<Event>, StoreError> {
        rows.iter().map(EventRow::decode).collect()
    }
}

impl EventLog for SqliteStore {
    #[instrument(skip(self, event), fields(game_id = %event.game_id(), kind = %event.kind()))]
    fn append(&self, event: &Event) -> Result<(), StoreError> {
        let row = NewEventRow::encode(event)?;
        let mut conn = self.connection()?;
        diesel::insert_into(schema::events::table)
            .values(&row)
            .execute(&mut *conn)?;
        debug!("Event row inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        let rows = {
            let mut conn = self.connection()?;
            schema::events::table
                .order(schema::events::id.asc())
                .select(EventRow::as_select())
                .load(&mut *conn)?
        };
        debug!(count = rows.len(), "Event rows loaded");
        Self::decode_rows(rows)
    }

    #[instrument(skip(self))]
    fn read_game(&self, game_id: &GameId) -> Result<Vec<Event>, StoreError> {
        let rows = {
            let mut conn = self.connection()?;
            schema::events::table
                .filter(schema::events::game_id.eq(game_id.as_str()))
                .order(schema::events::id.asc())
                .select(EventRow::as_select())
                .load(&mut *conn)?
        };
        debug!(count = rows.len(), "Game event rows loaded");
        Self::decode_rows(rows)
    }
}

impl Scoreboard for SqliteStore {
    #[instrument(skip(self))]
    fn record_win(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::scores::table)
            .values(&NewScore::new(name.to_string(), 1))
            .on_conflict(schema::scores::name)
            .do_update()
            .set(schema::scores::wins.eq(schema::scores::wins + 1))
            .execute(&mut *conn)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn top_players(&self, limit: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut conn = self.connection()?;
        let rows = schema::scores::table
            .order((schema::scores::wins.desc(), schema::scores::id.asc()))
            .limit(limit)
            .select(ScoreRow::as_select())
            .load(&mut *conn)?;
        Ok(rows.into_iter().map(ScoreEntry::from).collect())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    fn replace_all(&self, entries: &[ScoreEntry]) -> Result<(), StoreError> {
        let rows: Vec<NewScore> = entries
            .iter()
            .map(|e| NewScore::new(e.name.clone(), i32::try_from(e.wins).unwrap_or(i32::MAX)))
            .collect();
        let mut conn = self.connection()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(schema::scores::table).execute(conn)?;
            for row in &rows {
                diesel::insert_into(schema::scores::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok(())
        })?;
        info!("Scoreboard replaced");
        Ok(())
    }
}
