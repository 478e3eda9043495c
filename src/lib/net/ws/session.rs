use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tokio_mpmc::Sender;

use crate::{
    AppState, SessionRegistry,
    api::messages::{ClientMessage, GameEvent, LobbyCommand},
    error::GameError,
    game::{RoomResponse, clock::ensure_driver},
    net::{
        connection::{ConnectionId, RoomCode},
        ws::handler::{deliver, send_or_hang_up},
    },
};

/// Applies one inbound message and delivers whatever the room produced.
///
/// A refused command is answered with `rejected` on the sender's own channel;
/// the room is left untouched.
#[tracing::instrument(skip(state, tx, msg), fields(connection_id = %conn))]
pub async fn handle_message(
    state: &Arc<AppState>,
    conn: ConnectionId,
    tx: &Sender<GameEvent>,
    msg: ClientMessage,
) {
    let mut registry = state.registry.lock().await;

    let routed = catch_unwind(AssertUnwindSafe(|| route(&mut registry, conn, tx, &msg)))
        .unwrap_or_else(|_| {
            tracing::error!(?msg, "Command handling panicked");
            Err(GameError::Internal)
        });

    match routed {
        Ok(Some((code, response))) => {
            if let Some(room) = registry.get_mut(&code) {
                deliver(state, room, response).await;
                ensure_driver(state, room);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::info!(reason = %e, "Command rejected");
            let rejected = GameEvent::Rejected {
                reason: e.to_string(),
            };
            send_or_hang_up(state, conn, tx, rejected).await;
        }
    }
}

/// Runs the command against the registry or the sender's room.
fn route(
    registry: &mut SessionRegistry,
    conn: ConnectionId,
    tx: &Sender<GameEvent>,
    msg: &ClientMessage,
) -> Result<Option<(RoomCode, RoomResponse)>, GameError> {
    match msg {
        ClientMessage::Lobby(LobbyCommand::CreateSession { player_name }) => {
            registry.create(conn, player_name, tx.clone()).map(Some)
        }
        ClientMessage::Lobby(LobbyCommand::JoinSession {
            session_id,
            player_name,
        }) => {
            let code = RoomCode::from(session_id.as_str());
            let response = registry.join(&code, conn, player_name, tx.clone())?;
            Ok(Some((code, response)))
        }
        ClientMessage::Lobby(LobbyCommand::Leave) => {
            if registry.room_code_of(conn).is_none() {
                return Err(GameError::NotAuthorized);
            }
            Ok(registry.remove_connection(conn))
        }
        ClientMessage::Game(cmd) => {
            let room = registry.room_of_mut(conn)?;
            tracing::debug!(room_code = %room.code, action = cmd.action(), "Game command");
            let response = room.handle_command(cmd, conn)?;
            Ok(Some((room.code.clone(), response)))
        }
    }
}

/// Unseats a closed connection and tells whoever is left.
pub async fn teardown(state: &Arc<AppState>, conn: ConnectionId) {
    let mut registry = state.registry.lock().await;
    let Some((code, response)) = registry.remove_connection(conn) else {
        return;
    };
    if let Some(room) = registry.get_mut(&code) {
        deliver(state, room, response).await;
    }
}
