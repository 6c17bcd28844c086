//! Database row models.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::schema;
use crate::{Event, ScoreEntry, StoreError};

/// A stored event row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventRow {
    id: i32,
    game_id: String,
    kind: String,
    payload: String,
    recorded_at: NaiveDateTime,
}

impl EventRow {
    /// Decodes the stored JSON payload.
    #[instrument(skip(self), fields(id = self.id, kind = %self.kind))]
    pub fn decode(&self) -> Result<Event, StoreError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Insertable event row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::events)]
pub struct NewEventRow {
    game_id: String,
    kind: String,
    payload: String,
    recorded_at: NaiveDateTime,
}

impl NewEventRow {
    /// Encodes an event for storage.
    #[instrument(skip(event), fields(game_id = %event.game_id(), kind = %event.kind()))]
    pub fn encode(event: &Event) -> Result<Self, StoreError> {
        Ok(Self::new(
            event.game_id().to_string(),
            event.kind().to_string(),
            serde_json::to_string(event)?,
            event.timestamp().naive_utc(),
        ))
    }
}

/// A stored scoreboard row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::scores)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScoreRow {
    id: i32,
    name: String,
    wins: i32,
}

impl From<ScoreRow> for ScoreEntry {
    fn from(row: ScoreRow) -> Self {
        Self {
            name: row.name,
            wins: u32::try_from(row.wins).unwrap_or(0),
        }
    }
}

/// Insertable scoreboard row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::scores)]
pub struct NewScore {
    name: String,
    wins: i32,
}
