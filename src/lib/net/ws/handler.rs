use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, Utf8Bytes, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio_mpmc::Sender;

use crate::{
    AppState,
    api::messages::{ClientMessage, GameEvent},
    game::{RoomResponse, room::Room},
    net::{
        connection::{ConnectionId, OUTBOX_CAPACITY},
        ws::session::{handle_message, teardown},
    },
    results::persist_results,
};

pub async fn ws_upgrade_handler(
    State(state): State<Arc<AppState>>,
    ws_upgrade: WebSocketUpgrade,
) -> Response {
    let conn = ConnectionId::generate();
    tracing::info!(connection_id = %conn, "upgrading ws");
    ws_upgrade.on_upgrade(async move |ws| {
        if let Err(e) = ws_socket_handler(ws, conn, state).await {
            tracing::error!(connection_id = %conn, error = %e, "WebSocket handler failed");
        }
    })
}

/// Main WebSocket connection handler.
///
/// Outbound events are drained by a writer task so a connection's own
/// channel never fills up while it waits on the registry. The read loop also
/// ends when the server hangs the connection up.
#[tracing::instrument(name = "ws_handler", skip(ws, state), fields(connection_id = %conn))]
pub async fn ws_socket_handler(
    ws: WebSocket,
    conn: ConnectionId,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let (tx, rx) = tokio_mpmc::channel::<GameEvent>(OUTBOX_CAPACITY);
    let (mut ws_tx, mut ws_rx) = ws.split();
    let hangup = state.hangups.register(conn).await;

    let writer = tokio::spawn(async move {
        while let Ok(Some(event)) = rx.recv().await {
            let text = serde_json::to_string(&event)?;
            ws_tx.send(Message::Text(Utf8Bytes::from(text))).await?;
        }
        anyhow::Ok(())
    });

    let result = async {
        loop {
            let msg = tokio::select! {
                msg = ws_rx.next() => msg,
                _ = hangup.notified() => {
                    tracing::info!("Server hung up");
                    break;
                }
            };
            let Some(msg) = msg else { break };
            let msg = match msg? {
                Message::Close(_) => break,
                other => other,
            };
            if let Some(msg) = parse_message(msg) {
                handle_message(&state, conn, &tx, msg).await;
            }
        }
        anyhow::Ok(())
    }
    .await;

    teardown(&state, conn).await;
    state.hangups.unregister(conn).await;
    writer.abort();
    tracing::info!("WebSocket handler ending for connection {}", conn);
    result
}

/// Parse a WebSocket frame into a [`ClientMessage`]. Malformed frames are logged and skipped.
fn parse_message(msg: Message) -> Option<ClientMessage> {
    match msg {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, frame = text.as_str(), "Failed to parse ClientMessage");
                None
            }
        },
        Message::Binary(_) => {
            tracing::warn!("Unexpected binary message");
            None
        }
        _ => None,
    }
}

/// Hands result records to the sink, then sends every event to its recipients.
///
/// Called with the registry lock held, so events from one room reach each
/// player in the order the room produced them.
pub async fn deliver(state: &Arc<AppState>, room: &Room, mut response: RoomResponse) {
    let results = std::mem::take(&mut response.results);
    if !results.is_empty() {
        persist_results(&state.sink, results);
    }
    dispatch_responses(state, room, response).await;
}

/// Dispatches response messages to appropriate recipients.
async fn dispatch_responses(state: &AppState, room: &Room, response: RoomResponse) {
    tracing::debug!(
        room_code = %room.code,
        "Dispatching responses: {} broadcast, {} specific",
        response.messages_to_players.len(),
        response.messages_to_specific.len()
    );

    for msg in response.messages_to_players {
        for player in &room.players {
            send_or_hang_up(state, player.player.id, &player.sender, msg.clone()).await;
        }
    }

    for (pid, msg) in response.messages_to_specific {
        if let Some(player) = room.players.iter().find(|p| p.player.id == pid) {
            send_or_hang_up(state, pid, &player.sender, msg).await;
        }
    }
}

/// Queues `event` unless the connection's outbox is full.
///
/// Every send happens under the registry lock, so a free slot seen here is
/// still free when the send runs and the await never blocks. A full outbox
/// means the client stopped reading; the event is dropped and the
/// connection is closed instead of stalling every other session.
pub(crate) async fn send_or_hang_up(
    state: &AppState,
    conn: ConnectionId,
    sender: &Sender<GameEvent>,
    event: GameEvent,
) {
    if sender.len() >= OUTBOX_CAPACITY {
        tracing::warn!(connection_id = %conn, "Outbox full, hanging up");
        state.hangups.hang_up(conn).await;
        return;
    }
    let _ = sender.send(event).await;
}
