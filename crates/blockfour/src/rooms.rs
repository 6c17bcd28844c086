//! Room membership and fan-out for realtime connections.
//!
//! A room is the set of connections watching one game. Members are
//! subscriber handles wrapping an outbound channel, so nothing here
//! depends on the WebSocket transport.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use derive_more::Display;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::{Game, GameId, ServerMessage};

/// Sink for messages addressed to everyone watching a game.
///
/// The session store publishes through this trait while it still holds
/// the game's lock, so subscribers observe snapshots in commit order.
pub trait Publisher: Send + Sync + Debug {
    /// Delivers `message` to every subscriber of `game_id`.
    fn publish(&self, game_id: &GameId, message: ServerMessage);
}

/// Identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct ConnectionId(u64);

/// Subscriber handle for one connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    /// The connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for this connection only.
    ///
    /// Returns false once the connection's writer has gone away.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbox.send(message).is_ok()
    }
}

/// All rooms, keyed by game id.
#[derive(Debug, Default)]
pub struct Rooms {
    rooms: DashMap<GameId, HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl Rooms {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its handle and inbox.
    #[instrument(skip(self))]
    pub fn connect(&self) -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, inbox) = mpsc::unbounded_channel();
        debug!(connection = %id, "Connection registered");
        (Connection { id, outbox }, inbox)
    }

    /// Adds `connection` to the room of `game_id`.
    ///
    /// With a snapshot, the joiner receives `game-state` and every other
    /// member receives `game-updated` so they learn about the newcomer.
    #[instrument(skip(self, connection, snapshot), fields(connection = %connection.id))]
    pub fn join(&self, connection: &Connection, game_id: &GameId, snapshot: Option<&Game>) {
        let mut room = self.rooms.entry(game_id.clone()).or_default();
        room.insert(connection.id, connection.clone());
        info!(members = room.len(), "Connection joined room");

        let Some(game) = snapshot else {
            return;
        };
        connection.send(ServerMessage::GameState { game: game.clone() });
        for (id, peer) in room.iter() {
            if *id != connection.id {
                peer.send(ServerMessage::GameUpdated { game: game.clone() });
            }
        }
    }

    /// Removes `connection` from one room.
    #[instrument(skip(self))]
    pub fn leave(&self, connection: ConnectionId, game_id: &GameId) {
        if let Some(mut room) = self.rooms.get_mut(game_id) {
            room.remove(&connection);
        }
        self.rooms.remove_if(game_id, |_, room| room.is_empty());
        debug!("Connection left room");
    }

    /// Removes `connection` from every room.
    #[instrument(skip(self))]
    pub fn disconnect(&self, connection: ConnectionId) {
        self.rooms.retain(|_, room| {
            room.remove(&connection);
            !room.is_empty()
        });
        debug!("Connection removed from all rooms");
    }

    /// Sends `message` to every member of the room, including the sender.
    ///
    /// Returns the number of members the message was queued for.
    #[instrument(skip(self, message))]
    pub fn broadcast(&self, game_id: &GameId, message: &ServerMessage) -> usize {
        let Some(room) = self.rooms.get(game_id) else {
            debug!("No room to broadcast to");
            return 0;
        };
        let delivered = room
            .values()
            .filter(|member| member.send(message.clone()))
            .count();
        debug!(delivered, "Broadcast sent");
        delivered
    }

    /// Number of connections watching `game_id`.
    pub fn members(&self, game_id: &GameId) -> usize {
        self.rooms.get(game_id).map_or(0, |room| room.len())
    }
}

impl Publisher for Rooms {
    fn publish(&self, game_id: &GameId, message: ServerMessage) {
        self.broadcast(game_id, &message);
    }
}
