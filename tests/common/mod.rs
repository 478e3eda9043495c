#![allow(dead_code)]

use std::{path::Path, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, task::JoinHandle, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use describo::{
    AppState,
    api::messages::{ClientMessage, GameCommand, GameEvent, LobbyCommand},
    build_app,
    net::connection::{ConnectionId, RoomCode},
};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `recv_msgs` waits for the next frame before deciding the burst is over.
const QUIET_PERIOD: Duration = Duration::from_millis(150);

pub async fn start_test_server() -> (JoinHandle<()>, u16, Arc<AppState>) {
    let state = Arc::new(AppState::new());
    let app = build_app(state.clone(), Path::new("public"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let port = listener.local_addr().expect("No local address").port();

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (server, port, state)
}

pub async fn connect_ws_client(port: u16) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/api/v1/ws", port);
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

pub async fn send_msg(ws: &mut WsClient, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).expect("Failed to serialize message");
    ws.send(Message::Text(text.into()))
        .await
        .expect("Failed to send message");
}

pub async fn send_raw(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Collects every event that arrives until the connection goes quiet.
pub async fn recv_msgs(ws: &mut WsClient) -> Vec<GameEvent> {
    let mut msgs = Vec::new();
    while let Ok(Some(Ok(frame))) = timeout(QUIET_PERIOD, ws.next()).await {
        if let Message::Text(text) = frame {
            msgs.push(serde_json::from_str(text.as_str()).expect("Failed to parse GameEvent"));
        }
    }
    msgs
}

pub async fn send_msg_and_recv_all(ws: &mut WsClient, msg: &ClientMessage) -> Vec<GameEvent> {
    send_msg(ws, msg).await;
    recv_msgs(ws).await
}

pub fn create_session(name: &str) -> ClientMessage {
    ClientMessage::Lobby(LobbyCommand::CreateSession {
        player_name: name.to_string(),
    })
}

pub fn join_session(code: &RoomCode, name: &str) -> ClientMessage {
    ClientMessage::Lobby(LobbyCommand::JoinSession {
        session_id: code.to_string(),
        player_name: name.to_string(),
    })
}

pub fn game(cmd: GameCommand) -> ClientMessage {
    ClientMessage::Game(cmd)
}

/// Opens a connection and creates a session on it.
pub async fn host_session(port: u16, name: &str) -> (WsClient, RoomCode, ConnectionId) {
    let mut ws = connect_ws_client(port).await;
    let msgs = send_msg_and_recv_all(&mut ws, &create_session(name)).await;
    let (code, pid) = msgs
        .iter()
        .find_map(|m| match m {
            GameEvent::SessionCreated {
                session_id,
                player_id,
            } => Some((session_id.clone(), *player_id)),
            _ => None,
        })
        .expect("Host should receive SessionCreated");
    (ws, code, pid)
}

/// Opens a second connection and joins `code` with it.
pub async fn join_player(port: u16, code: &RoomCode, name: &str) -> (WsClient, ConnectionId) {
    let mut ws = connect_ws_client(port).await;
    let msgs = send_msg_and_recv_all(&mut ws, &join_session(code, name)).await;
    let pid = msgs
        .iter()
        .find_map(|m| match m {
            GameEvent::SessionJoined { player_id, .. } => Some(*player_id),
            _ => None,
        })
        .expect("Player should receive SessionJoined");
    (ws, pid)
}

pub fn last_view(msgs: &[GameEvent]) -> Option<&describo::game::view::PlayerView> {
    msgs.iter().rev().find_map(|m| match m {
        GameEvent::StateUpdate(view) => Some(view),
        _ => None,
    })
}

pub fn rejection(msgs: &[GameEvent]) -> Option<&str> {
    msgs.iter().find_map(|m| match m {
        GameEvent::Rejected { reason } => Some(reason.as_str()),
        _ => None,
    })
}
