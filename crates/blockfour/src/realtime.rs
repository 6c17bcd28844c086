//! WebSocket transport for rooms.
//!
//! Each socket gets a [`Connection`] from the room registry. A writer task
//! drains the connection's inbox into the socket while the reader loop
//! dispatches client frames. Successful changes reach the room through the
//! session store's publisher; failures go back to the sender only.

use std::ops::ControlFlow;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::{AppState, ClientMessage, Connection, GameError, ServerMessage};

/// `GET /ws`
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_connection(socket, state))
}

/// Runs one socket until the client disconnects.
#[instrument(skip_all)]
pub async fn serve_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (connection, mut inbox) = state.rooms().connect();
    info!(connection = %connection.id(), "WebSocket connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to encode server message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = ws_rx.next().await {
        if handle_frame(&state, &connection, frame).await.is_break() {
            break;
        }
    }

    state.rooms().disconnect(connection.id());
    writer.abort();
    info!(connection = %connection.id(), "WebSocket disconnected");
}

/// Reacts to one inbound socket frame. Breaks once the client closes.
pub async fn handle_frame(state: &AppState, connection: &Connection, frame: Message) -> ControlFlow<()> {
    match frame {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => dispatch(state, connection, message).await,
            Err(e) => {
                warn!(error = %e, "Malformed client frame");
                connection.send(ServerMessage::error(format!("Bad message: {}", e)));
            }
        },
        Message::Close(_) => return ControlFlow::Break(()),
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
    }
    ControlFlow::Continue(())
}

/// Handles one client message on behalf of `connection`.
#[instrument(skip(state, connection), fields(connection = %connection.id()))]
pub async fn dispatch(state: &AppState, connection: &Connection, message: ClientMessage) {
    let sessions = state.sessions();
    let result = match message {
        ClientMessage::JoinGame { game_id } => {
            let joined = sessions
                .inspect(&game_id, |game| state.rooms().join(connection, &game_id, Some(game)))
                .await;
            if joined.is_err() {
                // Still subscribe so the client hears about the game later.
                state.rooms().join(connection, &game_id, None);
            }
            joined
        }
        ClientMessage::MakeMove {
            game_id,
            player_id,
            row,
            col,
        } => sessions.apply_move(&game_id, &player_id, row, col).await.map(drop),
        ClientMessage::PlaceBlock {
            game_id,
            player_id,
            row,
            col,
        } => sessions.apply_block(&game_id, &player_id, row, col).await.map(drop),
        ClientMessage::ChatMessage {
            game_id,
            player_id,
            text,
        } => sessions.chat(&game_id, &player_id, &text).await.map(drop),
        ClientMessage::Rematch { game_id } => sessions.rematch(&game_id).await.map(drop),
        ClientMessage::LeaveGame { game_id } => {
            state.rooms().leave(connection.id(), &game_id);
            Ok(())
        }
    };

    match result {
        Ok(()) => debug!("Client message handled"),
        Err(e) => reject(connection, e),
    }
}

fn reject(connection: &Connection, err: GameError) {
    debug!(kind = err.kind(), "Sending error to requester");
    connection.send(ServerMessage::error(err));
}
